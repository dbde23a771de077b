//! Read-side view types shared across use cases.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::Serialize;

use habitquest_domain::{
    day_success, level_from_total_xp, xp_required, BadOccurrence, DayOutcome, GameState,
    GoodCompletion, LevelProgress, User, UserId, XpComputationMode,
};

use crate::infrastructure::ports::{HabitRepo, LogRepo, RepoError};

/// API shape of a user's progression state.
///
/// In `Logs` xp mode the level/xp pair is recomputed from the lifetime
/// habit-log reward sum instead of the stored counters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub life: i64,
    pub max_life: i64,
    pub coins: u64,
    pub level: u32,
    pub xp: u64,
    pub xp_per_level: u32,
    pub xp_required: u64,
    pub game_state: GameState,
}

pub(crate) async fn user_view(user: &User, logs: &dyn LogRepo) -> Result<UserView, RepoError> {
    let progress = effective_progress(user, logs).await?;

    Ok(UserView {
        id: user.id,
        name: user.name.clone(),
        life: user.life,
        max_life: user.max_life,
        coins: user.coins,
        level: progress.level,
        xp: progress.xp,
        xp_per_level: user.xp_per_level,
        xp_required: xp_required(
            progress.level,
            user.xp_per_level,
            user.level_curve,
            user.level_multiplier,
        ),
        game_state: user.game_state,
    })
}

async fn effective_progress(user: &User, logs: &dyn LogRepo) -> Result<LevelProgress, RepoError> {
    match user.xp_mode {
        XpComputationMode::Stored => Ok(user.progress),
        XpComputationMode::Logs => {
            let total = logs.total_reward_xp(user.id).await?;
            Ok(level_from_total_xp(
                total,
                user.xp_per_level,
                user.level_curve,
                user.level_multiplier,
            ))
        }
    }
}

/// UTC half-open bounds `[00:00 of date, 00:00 of the next day)`.
pub(crate) fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    (start, start + TimeDelta::days(1))
}

/// Bucket a timestamp to its UTC calendar day.
pub(crate) fn utc_day(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.date_naive()
}

/// Today's outcome under the general-streak day rule, recomputed after every
/// action so the response reflects the write that just landed.
pub(crate) async fn today_outcome(
    user_id: UserId,
    today: NaiveDate,
    habits: &dyn HabitRepo,
    logs: &dyn LogRepo,
) -> Result<DayOutcome, RepoError> {
    let (start, end) = day_bounds(today);

    let completions: Vec<GoodCompletion> = logs
        .good_completions_in(user_id, start, end)
        .await?
        .into_iter()
        .map(|log| GoodCompletion {
            habit_id: log.habit_id,
            date: utc_day(log.timestamp),
        })
        .collect();

    let occurrences: Vec<BadOccurrence> = logs
        .bad_occurrences_in(user_id, start, end)
        .await?
        .into_iter()
        .map(|log| BadOccurrence {
            bad_habit_id: log.bad_habit_id,
            date: utc_day(log.timestamp),
            avoided_penalty: log.avoided_penalty,
        })
        .collect();

    let total_active_good = habits.count_active_good().await?;

    let distinct_completed = completions
        .iter()
        .map(|c| c.habit_id)
        .collect::<std::collections::HashSet<_>>()
        .len() as u32;
    let has_unforgiven_bad = occurrences.iter().any(|o| !o.avoided_penalty);

    Ok(DayOutcome {
        date: today,
        completed_good: distinct_completed,
        total_active_good,
        has_unforgiven_bad,
        success: day_success(distinct_completed, total_active_good, has_unforgiven_bad),
    })
}
