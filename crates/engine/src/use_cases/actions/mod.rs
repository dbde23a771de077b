//! Action use cases - the two state-mutating habit operations.
//!
//! Both follow the same shape: read the rows an action touches, apply the
//! domain rules in memory, then hand the whole write set to the
//! [`ActionStore`] for an atomic commit. A commit that loses an
//! optimistic-concurrency race surfaces as `Stale`; the use case re-reads
//! and retries within a small budget.

use std::sync::Arc;

use serde::Serialize;

use habitquest_domain::{
    apply_completion, AreaLevel, BadHabitId, BadHabitLog, DayOutcome, DomainError, GoodHabitId,
    HabitLog, Transaction, UserId, XpComputationMode,
};

use crate::infrastructure::ports::{
    ActionStore, AreaRepo, BadHabitWrite, ClockPort, CompletionWrite, CreditRepo, HabitRepo,
    LogRepo, RepoError, UserRepo,
};
use crate::use_cases::views::{today_outcome, user_view, utc_day, UserView};
use crate::use_cases::MAX_ACTION_RETRIES;

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),
    #[error("Habit not found")]
    HabitNotFound,
    #[error("Area not found")]
    AreaNotFound,
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

/// Response payload for a good-habit completion.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub area_level: AreaLevel,
    pub user: UserView,
    pub today: DayOutcome,
}

/// Complete a good habit: area + user progression, coins, log, ledger.
pub struct CompleteGoodHabit {
    users: Arc<dyn UserRepo>,
    areas: Arc<dyn AreaRepo>,
    habits: Arc<dyn HabitRepo>,
    logs: Arc<dyn LogRepo>,
    actions: Arc<dyn ActionStore>,
    clock: Arc<dyn ClockPort>,
}

impl CompleteGoodHabit {
    pub fn new(
        users: Arc<dyn UserRepo>,
        areas: Arc<dyn AreaRepo>,
        habits: Arc<dyn HabitRepo>,
        logs: Arc<dyn LogRepo>,
        actions: Arc<dyn ActionStore>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            users,
            areas,
            habits,
            logs,
            actions,
            clock,
        }
    }

    pub async fn execute(
        &self,
        user_id: UserId,
        habit_id: GoodHabitId,
    ) -> Result<CompletionResult, ActionError> {
        let mut attempts = 0;

        loop {
            let mut user = self
                .users
                .get(user_id)
                .await?
                .ok_or(ActionError::UserNotFound(user_id))?;
            user.value.ensure_active()?;

            let habit = self
                .habits
                .get_good(habit_id)
                .await?
                .ok_or(ActionError::HabitNotFound)?;
            // Archived and deactivated habits are invisible to actions.
            if !habit.is_actionable() {
                return Err(ActionError::HabitNotFound);
            }

            let area = self
                .areas
                .get(habit.area_id)
                .await?
                .ok_or(ActionError::AreaNotFound)?;
            if area.is_archived() {
                return Err(ActionError::AreaNotFound);
            }

            let now = self.clock.now();

            // Area track always advances; the row is created lazily on the
            // first completion in the area.
            let (mut area_level, area_level_version) =
                match self.areas.get_level(user_id, area.id).await? {
                    Some(versioned) => (versioned.value, Some(versioned.version)),
                    None => (AreaLevel::new(user_id, area.id), None),
                };
            area_level.progress = apply_completion(
                area_level.progress,
                u64::from(habit.xp_reward),
                area.xp_per_level,
                area.level_curve,
                area.level_multiplier,
            );

            // The stored user counters only move in `Stored` mode; in `Logs`
            // mode reads derive them from the log history instead.
            if user.value.xp_mode == XpComputationMode::Stored {
                user.value.progress = apply_completion(
                    user.value.progress,
                    u64::from(habit.xp_reward),
                    user.value.xp_per_level,
                    user.value.level_curve,
                    user.value.level_multiplier,
                );
            }
            user.value.add_coins(u64::from(habit.coin_reward));

            let log = HabitLog::new(user_id, habit_id, now);
            let ledger = Transaction::earn(
                user_id,
                u64::from(habit.coin_reward),
                format!("Completed {}", habit.name),
                now,
            );

            let write = CompletionWrite {
                user: user.clone(),
                area_level,
                area_level_version,
                log,
                ledger,
            };

            match self.actions.commit_completion(write).await {
                Ok(()) => {
                    let today = today_outcome(
                        user_id,
                        utc_day(now),
                        self.habits.as_ref(),
                        self.logs.as_ref(),
                    )
                    .await?;
                    let user = user_view(&user.value, self.logs.as_ref()).await?;

                    return Ok(CompletionResult {
                        area_level,
                        user,
                        today,
                    });
                }
                Err(e) if e.is_stale() && attempts < MAX_ACTION_RETRIES => {
                    attempts += 1;
                    tracing::debug!(%user_id, attempts, "completion lost a write race, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Response payload for a bad-habit record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadHabitResult {
    pub user: UserView,
    pub avoided_penalty: bool,
    pub game_over: bool,
    pub today: DayOutcome,
}

/// Record a bad-habit occurrence: consume the oldest credit if one exists,
/// otherwise take the life hit and trigger game over when life runs out.
pub struct RecordBadHabit {
    users: Arc<dyn UserRepo>,
    habits: Arc<dyn HabitRepo>,
    credits: Arc<dyn CreditRepo>,
    logs: Arc<dyn LogRepo>,
    actions: Arc<dyn ActionStore>,
    clock: Arc<dyn ClockPort>,
}

impl RecordBadHabit {
    pub fn new(
        users: Arc<dyn UserRepo>,
        habits: Arc<dyn HabitRepo>,
        credits: Arc<dyn CreditRepo>,
        logs: Arc<dyn LogRepo>,
        actions: Arc<dyn ActionStore>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            users,
            habits,
            credits,
            logs,
            actions,
            clock,
        }
    }

    pub async fn execute(
        &self,
        user_id: UserId,
        habit_id: BadHabitId,
    ) -> Result<BadHabitResult, ActionError> {
        let mut attempts = 0;

        loop {
            let mut user = self
                .users
                .get(user_id)
                .await?
                .ok_or(ActionError::UserNotFound(user_id))?;
            user.value.ensure_active()?;

            let habit = self
                .habits
                .get_bad(habit_id)
                .await?
                .ok_or(ActionError::HabitNotFound)?;
            if !habit.is_actionable() {
                return Err(ActionError::HabitNotFound);
            }

            let now = self.clock.now();

            // Credits absorb occurrences oldest purchase first; consumption
            // deletes the row inside the same transaction as the log.
            let credit = self.credits.oldest_for(user_id, habit_id).await?;
            let avoided = credit.is_some();

            let mut triggers_game_over = false;
            if !avoided {
                user.value.apply_life_penalty(habit.life_penalty);
                if user.value.is_out_of_life() {
                    user.value.trigger_game_over(now)?;
                    triggers_game_over = true;
                }
            }

            let log = BadHabitLog::new(user_id, habit_id, avoided, now);
            let write = BadHabitWrite {
                user: user.clone(),
                consumed_credit: credit.map(|c| c.id),
                log,
                triggers_game_over,
            };

            match self.actions.commit_bad_habit(write).await {
                Ok(()) => {
                    let today = today_outcome(
                        user_id,
                        utc_day(now),
                        self.habits.as_ref(),
                        self.logs.as_ref(),
                    )
                    .await?;
                    let view = user_view(&user.value, self.logs.as_ref()).await?;

                    return Ok(BadHabitResult {
                        user: view,
                        avoided_penalty: avoided,
                        game_over: triggers_game_over,
                        today,
                    });
                }
                Err(e) if e.is_stale() && attempts < MAX_ACTION_RETRIES => {
                    attempts += 1;
                    tracing::debug!(%user_id, attempts, "bad-habit record lost a write race, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use habitquest_domain::{
        Area, BadHabit, BadHabitCredit, GameState, GoodHabit, LevelCurve, User,
    };

    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{
        MockActionStore, MockAreaRepo, MockCreditRepo, MockHabitRepo, MockLogRepo, MockUserRepo,
        Versioned,
    };

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).single().expect("valid time")
    }

    fn test_user() -> User {
        User::new("Otto", now())
    }

    fn test_area() -> Area {
        Area::new("Fitness", "star", 100, LevelCurve::Linear, 1.0, now()).expect("valid area")
    }

    fn test_good_habit(area_id: habitquest_domain::AreaId) -> GoodHabit {
        GoodHabit::new(area_id, "Run", 30, 5, "daily", now()).expect("valid habit")
    }

    fn test_bad_habit() -> BadHabit {
        BadHabit::new(None, "Smoking", 10, true, 50, now()).expect("valid habit")
    }

    fn quiet_log_repo() -> MockLogRepo {
        let mut logs = MockLogRepo::new();
        logs.expect_good_completions_in().returning(|_, _, _| Ok(vec![]));
        logs.expect_bad_occurrences_in().returning(|_, _, _| Ok(vec![]));
        logs.expect_total_reward_xp().returning(|_| Ok(0));
        logs
    }

    #[tokio::test]
    async fn when_user_not_found_completion_fails() {
        let mut users = MockUserRepo::new();
        users.expect_get().returning(|_| Ok(None));

        let use_case = CompleteGoodHabit::new(
            Arc::new(users),
            Arc::new(MockAreaRepo::new()),
            Arc::new(MockHabitRepo::new()),
            Arc::new(MockLogRepo::new()),
            Arc::new(MockActionStore::new()),
            Arc::new(FixedClock(now())),
        );

        let result = use_case.execute(UserId::new(), GoodHabitId::new()).await;
        assert!(matches!(result, Err(ActionError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn when_game_over_completion_is_rejected() {
        let mut user = test_user();
        user.life = 0;
        user.trigger_game_over(now()).expect("trigger");
        let user_id = user.id;

        let mut users = MockUserRepo::new();
        users
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(user.clone(), 0))));

        let use_case = CompleteGoodHabit::new(
            Arc::new(users),
            Arc::new(MockAreaRepo::new()),
            Arc::new(MockHabitRepo::new()),
            Arc::new(MockLogRepo::new()),
            Arc::new(MockActionStore::new()),
            Arc::new(FixedClock(now())),
        );

        let result = use_case.execute(user_id, GoodHabitId::new()).await;
        assert!(matches!(
            result,
            Err(ActionError::Domain(DomainError::Conflict(_)))
        ));
    }

    #[tokio::test]
    async fn archived_habit_completion_reads_as_not_found() {
        let user = test_user();
        let user_id = user.id;
        let area = test_area();
        let mut habit = test_good_habit(area.id);
        habit.archive(now());
        let habit_id = habit.id;

        let mut users = MockUserRepo::new();
        users
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(user.clone(), 0))));

        let mut habits = MockHabitRepo::new();
        habits
            .expect_get_good()
            .returning(move |_| Ok(Some(habit.clone())));

        let use_case = CompleteGoodHabit::new(
            Arc::new(users),
            Arc::new(MockAreaRepo::new()),
            Arc::new(habits),
            Arc::new(MockLogRepo::new()),
            Arc::new(MockActionStore::new()),
            Arc::new(FixedClock(now())),
        );

        let result = use_case.execute(user_id, habit_id).await;
        assert!(matches!(result, Err(ActionError::HabitNotFound)));
    }

    #[tokio::test]
    async fn archived_area_completion_reads_as_not_found() {
        let user = test_user();
        let user_id = user.id;
        let mut area = test_area();
        area.archive(now());
        let habit = test_good_habit(area.id);
        let habit_id = habit.id;

        let mut users = MockUserRepo::new();
        users
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(user.clone(), 0))));

        let mut habits = MockHabitRepo::new();
        habits
            .expect_get_good()
            .returning(move |_| Ok(Some(habit.clone())));

        let mut areas = MockAreaRepo::new();
        areas
            .expect_get()
            .returning(move |_| Ok(Some(area.clone())));

        let use_case = CompleteGoodHabit::new(
            Arc::new(users),
            Arc::new(areas),
            Arc::new(habits),
            Arc::new(MockLogRepo::new()),
            Arc::new(MockActionStore::new()),
            Arc::new(FixedClock(now())),
        );

        let result = use_case.execute(user_id, habit_id).await;
        assert!(matches!(result, Err(ActionError::AreaNotFound)));
    }

    #[tokio::test]
    async fn archived_bad_habit_record_reads_as_not_found() {
        let user = test_user();
        let user_id = user.id;
        let mut habit = test_bad_habit();
        habit.archive(now());
        let habit_id = habit.id;

        let mut users = MockUserRepo::new();
        users
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(user.clone(), 0))));

        let mut habits = MockHabitRepo::new();
        habits
            .expect_get_bad()
            .returning(move |_| Ok(Some(habit.clone())));

        let use_case = RecordBadHabit::new(
            Arc::new(users),
            Arc::new(habits),
            Arc::new(MockCreditRepo::new()),
            Arc::new(MockLogRepo::new()),
            Arc::new(MockActionStore::new()),
            Arc::new(FixedClock(now())),
        );

        let result = use_case.execute(user_id, habit_id).await;
        assert!(matches!(result, Err(ActionError::HabitNotFound)));
    }

    #[tokio::test]
    async fn completion_levels_area_and_user_and_commits_once() {
        let user = test_user();
        let user_id = user.id;
        let area = test_area();
        let habit = test_good_habit(area.id);
        let habit_id = habit.id;

        let mut users = MockUserRepo::new();
        let user_for_get = user.clone();
        users
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(user_for_get.clone(), 3))));

        let mut habits = MockHabitRepo::new();
        let habit_for_get = habit.clone();
        habits
            .expect_get_good()
            .returning(move |_| Ok(Some(habit_for_get.clone())));
        habits.expect_count_active_good().returning(|| Ok(1));

        let mut areas = MockAreaRepo::new();
        let area_for_get = area.clone();
        areas
            .expect_get()
            .returning(move |_| Ok(Some(area_for_get.clone())));
        areas.expect_get_level().returning(|_, _| Ok(None));

        let mut actions = MockActionStore::new();
        actions
            .expect_commit_completion()
            .times(1)
            .withf(move |write| {
                write.user.version == 3
                    && write.area_level_version.is_none()
                    && write.area_level.progress.level == 1
                    && write.area_level.progress.xp == 30
                    && write.user.value.progress.xp == 30
                    && write.user.value.coins == 5
                    && write.ledger.amount == 5
            })
            .returning(|_| Ok(()));

        let use_case = CompleteGoodHabit::new(
            Arc::new(users),
            Arc::new(areas),
            Arc::new(habits),
            Arc::new(quiet_log_repo()),
            Arc::new(actions),
            Arc::new(FixedClock(now())),
        );

        let result = use_case.execute(user_id, habit_id).await.expect("completes");
        assert_eq!(result.user.coins, 5);
        assert_eq!(result.user.xp, 30);
        assert_eq!(result.today.total_active_good, 1);
    }

    #[tokio::test]
    async fn completion_in_logs_mode_leaves_stored_counters() {
        let mut user = test_user();
        user.xp_mode = XpComputationMode::Logs;
        let user_id = user.id;
        let area = test_area();
        let habit = test_good_habit(area.id);
        let habit_id = habit.id;

        let mut users = MockUserRepo::new();
        let user_for_get = user.clone();
        users
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(user_for_get.clone(), 0))));

        let mut habits = MockHabitRepo::new();
        let habit_for_get = habit.clone();
        habits
            .expect_get_good()
            .returning(move |_| Ok(Some(habit_for_get.clone())));
        habits.expect_count_active_good().returning(|| Ok(1));

        let mut areas = MockAreaRepo::new();
        let area_for_get = area.clone();
        areas
            .expect_get()
            .returning(move |_| Ok(Some(area_for_get.clone())));
        areas.expect_get_level().returning(|_, _| Ok(None));

        let mut actions = MockActionStore::new();
        actions
            .expect_commit_completion()
            .withf(|write| write.user.value.progress.xp == 0 && write.user.value.coins == 5)
            .returning(|_| Ok(()));

        // Lifetime log sum drives the view: 130 xp at base 100 = level 2, 30 in.
        let mut logs = MockLogRepo::new();
        logs.expect_good_completions_in().returning(|_, _, _| Ok(vec![]));
        logs.expect_bad_occurrences_in().returning(|_, _, _| Ok(vec![]));
        logs.expect_total_reward_xp().returning(|_| Ok(130));

        let use_case = CompleteGoodHabit::new(
            Arc::new(users),
            Arc::new(areas),
            Arc::new(habits),
            Arc::new(logs),
            Arc::new(actions),
            Arc::new(FixedClock(now())),
        );

        let result = use_case.execute(user_id, habit_id).await.expect("completes");
        assert_eq!(result.user.level, 2);
        assert_eq!(result.user.xp, 30);
    }

    #[tokio::test]
    async fn stale_completion_retries_and_succeeds() {
        let user = test_user();
        let user_id = user.id;
        let area = test_area();
        let habit = test_good_habit(area.id);
        let habit_id = habit.id;

        let mut users = MockUserRepo::new();
        let user_for_get = user.clone();
        users
            .expect_get()
            .times(2)
            .returning(move |_| Ok(Some(Versioned::new(user_for_get.clone(), 0))));

        let mut habits = MockHabitRepo::new();
        let habit_for_get = habit.clone();
        habits
            .expect_get_good()
            .returning(move |_| Ok(Some(habit_for_get.clone())));
        habits.expect_count_active_good().returning(|| Ok(1));

        let mut areas = MockAreaRepo::new();
        let area_for_get = area.clone();
        areas
            .expect_get()
            .returning(move |_| Ok(Some(area_for_get.clone())));
        areas.expect_get_level().returning(|_, _| Ok(None));

        let mut actions = MockActionStore::new();
        let mut first = true;
        actions.expect_commit_completion().times(2).returning(move |_| {
            if first {
                first = false;
                Err(RepoError::stale("User", "u"))
            } else {
                Ok(())
            }
        });

        let use_case = CompleteGoodHabit::new(
            Arc::new(users),
            Arc::new(areas),
            Arc::new(habits),
            Arc::new(quiet_log_repo()),
            Arc::new(actions),
            Arc::new(FixedClock(now())),
        );

        use_case.execute(user_id, habit_id).await.expect("retry succeeds");
    }

    #[tokio::test]
    async fn bad_habit_with_credit_is_forgiven() {
        let user = test_user();
        let user_id = user.id;
        let habit = test_bad_habit();
        let habit_id = habit.id;
        let credit = BadHabitCredit::new(user_id, habit_id, now());
        let credit_id = credit.id;

        let mut users = MockUserRepo::new();
        let user_for_get = user.clone();
        users
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(user_for_get.clone(), 0))));

        let mut habits = MockHabitRepo::new();
        let habit_for_get = habit.clone();
        habits
            .expect_get_bad()
            .returning(move |_| Ok(Some(habit_for_get.clone())));
        habits.expect_count_active_good().returning(|| Ok(0));

        let mut credits = MockCreditRepo::new();
        credits
            .expect_oldest_for()
            .returning(move |_, _| Ok(Some(credit)));

        let mut actions = MockActionStore::new();
        actions
            .expect_commit_bad_habit()
            .withf(move |write| {
                write.consumed_credit == Some(credit_id)
                    && write.log.avoided_penalty
                    && !write.triggers_game_over
                    && write.user.value.life == 100
            })
            .returning(|_| Ok(()));

        let use_case = RecordBadHabit::new(
            Arc::new(users),
            Arc::new(habits),
            Arc::new(credits),
            Arc::new(quiet_log_repo()),
            Arc::new(actions),
            Arc::new(FixedClock(now())),
        );

        let result = use_case.execute(user_id, habit_id).await.expect("records");
        assert!(result.avoided_penalty);
        assert!(!result.game_over);
        assert_eq!(result.user.life, 100);
    }

    #[tokio::test]
    async fn bad_habit_without_credit_costs_life() {
        let user = test_user();
        let user_id = user.id;
        let habit = test_bad_habit();
        let habit_id = habit.id;

        let mut users = MockUserRepo::new();
        let user_for_get = user.clone();
        users
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(user_for_get.clone(), 0))));

        let mut habits = MockHabitRepo::new();
        let habit_for_get = habit.clone();
        habits
            .expect_get_bad()
            .returning(move |_| Ok(Some(habit_for_get.clone())));
        habits.expect_count_active_good().returning(|| Ok(0));

        let mut credits = MockCreditRepo::new();
        credits.expect_oldest_for().returning(|_, _| Ok(None));

        let mut actions = MockActionStore::new();
        actions
            .expect_commit_bad_habit()
            .withf(|write| {
                write.consumed_credit.is_none()
                    && !write.log.avoided_penalty
                    && !write.triggers_game_over
                    && write.user.value.life == 90
            })
            .returning(|_| Ok(()));

        let use_case = RecordBadHabit::new(
            Arc::new(users),
            Arc::new(habits),
            Arc::new(credits),
            Arc::new(quiet_log_repo()),
            Arc::new(actions),
            Arc::new(FixedClock(now())),
        );

        let result = use_case.execute(user_id, habit_id).await.expect("records");
        assert!(!result.avoided_penalty);
        assert_eq!(result.user.life, 90);
    }

    #[tokio::test]
    async fn bad_habit_exhausting_life_triggers_game_over() {
        let mut user = test_user();
        user.life = 5;
        let user_id = user.id;
        let habit = test_bad_habit();
        let habit_id = habit.id;

        let mut users = MockUserRepo::new();
        let user_for_get = user.clone();
        users
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(user_for_get.clone(), 0))));

        let mut habits = MockHabitRepo::new();
        let habit_for_get = habit.clone();
        habits
            .expect_get_bad()
            .returning(move |_| Ok(Some(habit_for_get.clone())));
        habits.expect_count_active_good().returning(|| Ok(0));

        let mut credits = MockCreditRepo::new();
        credits.expect_oldest_for().returning(|_, _| Ok(None));

        let mut actions = MockActionStore::new();
        actions
            .expect_commit_bad_habit()
            .withf(|write| {
                write.triggers_game_over
                    && write.user.value.game_state == GameState::GameOver
                    && write.user.value.life == 0
                    && write.user.value.total_game_overs == 1
            })
            .returning(|_| Ok(()));

        let use_case = RecordBadHabit::new(
            Arc::new(users),
            Arc::new(habits),
            Arc::new(credits),
            Arc::new(quiet_log_repo()),
            Arc::new(actions),
            Arc::new(FixedClock(now())),
        );

        let result = use_case.execute(user_id, habit_id).await.expect("records");
        assert!(result.game_over);
        assert_eq!(result.user.game_state, GameState::GameOver);
    }
}
