//! Streak read models - window queries over the append-only logs.
//!
//! These use cases only read: they fetch the logs for a date window, bucket
//! timestamps to UTC days, and hand the plain records to the domain
//! aggregation functions.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use habitquest_domain::{
    bad_habit_history, bad_habit_streak, general_streak, good_habit_history, good_habit_streak,
    BadDayStatus, BadHabitId, BadOccurrence, DomainError, GeneralStreak, GoodCompletion,
    GoodDayStatus, GoodHabitId, HabitKind, HistoryDay, StreakCounts, UserId,
};

use crate::infrastructure::ports::{HabitRepo, LogRepo, RepoError, UserRepo};
use crate::use_cases::views::{day_bounds, utc_day};

#[derive(Debug, thiserror::Error)]
pub enum StreakError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),
    #[error("Habit not found")]
    HabitNotFound,
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

/// Fetch the window's logs as day-bucketed domain records.
async fn window_logs(
    logs: &dyn LogRepo,
    user_id: UserId,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(Vec<GoodCompletion>, Vec<BadOccurrence>), RepoError> {
    let to = to.max(from);
    let (start, _) = day_bounds(from);
    let (_, end) = day_bounds(to);

    let completions = logs
        .good_completions_in(user_id, start, end)
        .await?
        .into_iter()
        .map(|log| GoodCompletion {
            habit_id: log.habit_id,
            date: utc_day(log.timestamp),
        })
        .collect();

    let occurrences = logs
        .bad_occurrences_in(user_id, start, end)
        .await?
        .into_iter()
        .map(|log| BadOccurrence {
            bad_habit_id: log.bad_habit_id,
            date: utc_day(log.timestamp),
            avoided_penalty: log.avoided_penalty,
        })
        .collect();

    Ok((completions, occurrences))
}

/// General streak over a date window.
pub struct GetGeneralStreak {
    users: Arc<dyn UserRepo>,
    habits: Arc<dyn HabitRepo>,
    logs: Arc<dyn LogRepo>,
}

impl GetGeneralStreak {
    pub fn new(
        users: Arc<dyn UserRepo>,
        habits: Arc<dyn HabitRepo>,
        logs: Arc<dyn LogRepo>,
    ) -> Self {
        Self {
            users,
            habits,
            logs,
        }
    }

    pub async fn execute(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<GeneralStreak, StreakError> {
        self.users
            .get(user_id)
            .await?
            .ok_or(StreakError::UserNotFound(user_id))?;

        let (completions, occurrences) =
            window_logs(self.logs.as_ref(), user_id, from, to).await?;
        let total_active_good = self.habits.count_active_good().await?;

        Ok(general_streak(
            from,
            to,
            &completions,
            &occurrences,
            total_active_good,
        ))
    }
}

/// Per-habit entry in the streak listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStreakView {
    pub habit_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: HabitKind,
    #[serde(flatten)]
    pub counts: StreakCounts,
}

/// Streak counters for every active habit, good and bad.
pub struct ListHabitStreaks {
    users: Arc<dyn UserRepo>,
    habits: Arc<dyn HabitRepo>,
    logs: Arc<dyn LogRepo>,
}

impl ListHabitStreaks {
    pub fn new(
        users: Arc<dyn UserRepo>,
        habits: Arc<dyn HabitRepo>,
        logs: Arc<dyn LogRepo>,
    ) -> Self {
        Self {
            users,
            habits,
            logs,
        }
    }

    pub async fn execute(
        &self,
        user_id: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HabitStreakView>, StreakError> {
        self.users
            .get(user_id)
            .await?
            .ok_or(StreakError::UserNotFound(user_id))?;

        let (completions, occurrences) =
            window_logs(self.logs.as_ref(), user_id, from, to).await?;

        let mut views = Vec::new();

        // Listings exclude archived rows but still carry deactivated ones;
        // streaks cover only habits that can currently be acted on.
        for habit in self.habits.list_good(false).await? {
            if !habit.is_actionable() {
                continue;
            }
            let done_dates: BTreeSet<NaiveDate> = completions
                .iter()
                .filter(|c| c.habit_id == habit.id)
                .map(|c| c.date)
                .collect();

            views.push(HabitStreakView {
                habit_id: habit.id.to_string(),
                name: habit.name,
                kind: HabitKind::Good,
                counts: good_habit_streak(from, to, &done_dates),
            });
        }

        for habit in self.habits.list_bad(false).await? {
            if !habit.is_actionable() {
                continue;
            }
            let unforgiven_dates: BTreeSet<NaiveDate> = occurrences
                .iter()
                .filter(|o| o.bad_habit_id == habit.id && !o.avoided_penalty)
                .map(|o| o.date)
                .collect();

            views.push(HabitStreakView {
                habit_id: habit.id.to_string(),
                name: habit.name,
                kind: HabitKind::Bad,
                counts: bad_habit_streak(from, to, &unforgiven_dates),
            });
        }

        Ok(views)
    }
}

/// Day-by-day history for one habit.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum HabitHistory {
    Good(Vec<HistoryDay<GoodDayStatus>>),
    Bad(Vec<HistoryDay<BadDayStatus>>),
}

pub struct GetHabitHistory {
    users: Arc<dyn UserRepo>,
    habits: Arc<dyn HabitRepo>,
    logs: Arc<dyn LogRepo>,
}

impl GetHabitHistory {
    pub fn new(
        users: Arc<dyn UserRepo>,
        habits: Arc<dyn HabitRepo>,
        logs: Arc<dyn LogRepo>,
    ) -> Self {
        Self {
            users,
            habits,
            logs,
        }
    }

    pub async fn execute(
        &self,
        user_id: UserId,
        habit_id: uuid::Uuid,
        kind: HabitKind,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HabitHistory, StreakError> {
        self.users
            .get(user_id)
            .await?
            .ok_or(StreakError::UserNotFound(user_id))?;

        let (completions, occurrences) =
            window_logs(self.logs.as_ref(), user_id, from, to).await?;

        match kind {
            HabitKind::Good => {
                let habit_id = GoodHabitId::from_uuid(habit_id);
                let habit = self
                    .habits
                    .get_good(habit_id)
                    .await?
                    .ok_or(StreakError::HabitNotFound)?;

                let done_dates: BTreeSet<NaiveDate> = completions
                    .iter()
                    .filter(|c| c.habit_id == habit_id)
                    .map(|c| c.date)
                    .collect();

                Ok(HabitHistory::Good(good_habit_history(
                    from,
                    to,
                    &done_dates,
                    habit.is_actionable(),
                )))
            }
            HabitKind::Bad => {
                let habit_id = BadHabitId::from_uuid(habit_id);
                self.habits
                    .get_bad(habit_id)
                    .await?
                    .ok_or(StreakError::HabitNotFound)?;

                let mut unforgiven_dates = BTreeSet::new();
                let mut forgiven_dates = BTreeSet::new();
                for occurrence in occurrences
                    .iter()
                    .filter(|o| o.bad_habit_id == habit_id)
                {
                    if occurrence.avoided_penalty {
                        forgiven_dates.insert(occurrence.date);
                    } else {
                        unforgiven_dates.insert(occurrence.date);
                    }
                }

                Ok(HabitHistory::Bad(bad_habit_history(
                    from,
                    to,
                    &unforgiven_dates,
                    &forgiven_dates,
                )))
            }
        }
    }
}
