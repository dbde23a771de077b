//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::{
    clock::SystemClock,
    ports::{
        ActionStore, AreaRepo, ClockPort, CreditRepo, HabitRepo, LogRepo, TransactionRepo,
        UserRepo,
    },
    sqlite::SqliteRepositories,
};
use crate::use_cases::actions::{CompleteGoodHabit, RecordBadHabit};
use crate::use_cases::config::{GetUserConfig, UpdateUserConfig};
use crate::use_cases::game::{CompleteRecovery, GetGameState, SetRecoveryProgress};
use crate::use_cases::management::{AreaCrud, BuyCredit, HabitCrud, UserCrud};
use crate::use_cases::streaks::{GetGeneralStreak, GetHabitHistory, ListHabitStreaks};

/// Main application state, passed to HTTP handlers via Axum state.
pub struct App {
    pub repositories: Repositories,
    pub use_cases: UseCases,
}

/// Port traits injected directly, all backed by the same SQLite pool.
pub struct Repositories {
    pub user: Arc<dyn UserRepo>,
    pub area: Arc<dyn AreaRepo>,
    pub habit: Arc<dyn HabitRepo>,
    pub log: Arc<dyn LogRepo>,
    pub credit: Arc<dyn CreditRepo>,
    pub transaction: Arc<dyn TransactionRepo>,
    pub action: Arc<dyn ActionStore>,
}

/// Container for all use cases.
pub struct UseCases {
    pub complete_good_habit: CompleteGoodHabit,
    pub record_bad_habit: RecordBadHabit,
    pub general_streak: GetGeneralStreak,
    pub habit_streaks: ListHabitStreaks,
    pub habit_history: GetHabitHistory,
    pub game_state: GetGameState,
    pub set_recovery_progress: SetRecoveryProgress,
    pub complete_recovery: CompleteRecovery,
    pub get_config: GetUserConfig,
    pub update_config: UpdateUserConfig,
    pub users: UserCrud,
    pub areas: AreaCrud,
    pub habits: HabitCrud,
    pub buy_credit: BuyCredit,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(repos: SqliteRepositories) -> Self {
        let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());

        let user_repo: Arc<dyn UserRepo> = repos.user.clone();
        let area_repo: Arc<dyn AreaRepo> = repos.area.clone();
        let habit_repo: Arc<dyn HabitRepo> = repos.habit.clone();
        let log_repo: Arc<dyn LogRepo> = repos.log.clone();
        let credit_repo: Arc<dyn CreditRepo> = repos.credit.clone();
        let transaction_repo: Arc<dyn TransactionRepo> = repos.transaction.clone();
        let action_store: Arc<dyn ActionStore> = repos.action.clone();

        let use_cases = UseCases {
            complete_good_habit: CompleteGoodHabit::new(
                user_repo.clone(),
                area_repo.clone(),
                habit_repo.clone(),
                log_repo.clone(),
                action_store.clone(),
                clock.clone(),
            ),
            record_bad_habit: RecordBadHabit::new(
                user_repo.clone(),
                habit_repo.clone(),
                credit_repo.clone(),
                log_repo.clone(),
                action_store.clone(),
                clock.clone(),
            ),
            general_streak: GetGeneralStreak::new(
                user_repo.clone(),
                habit_repo.clone(),
                log_repo.clone(),
            ),
            habit_streaks: ListHabitStreaks::new(
                user_repo.clone(),
                habit_repo.clone(),
                log_repo.clone(),
            ),
            habit_history: GetHabitHistory::new(
                user_repo.clone(),
                habit_repo.clone(),
                log_repo.clone(),
            ),
            game_state: GetGameState::new(user_repo.clone()),
            set_recovery_progress: SetRecoveryProgress::new(user_repo.clone()),
            complete_recovery: CompleteRecovery::new(user_repo.clone()),
            get_config: GetUserConfig::new(user_repo.clone()),
            update_config: UpdateUserConfig::new(user_repo.clone()),
            users: UserCrud::new(user_repo.clone(), transaction_repo.clone(), clock.clone()),
            areas: AreaCrud::new(area_repo.clone(), clock.clone()),
            habits: HabitCrud::new(area_repo.clone(), habit_repo.clone(), clock.clone()),
            buy_credit: BuyCredit::new(
                user_repo.clone(),
                habit_repo.clone(),
                credit_repo.clone(),
                action_store.clone(),
                clock,
            ),
        };

        Self {
            repositories: Repositories {
                user: user_repo,
                area: area_repo,
                habit: habit_repo,
                log: log_repo,
                credit: credit_repo,
                transaction: transaction_repo,
                action: action_store,
            },
            use_cases,
        }
    }
}
