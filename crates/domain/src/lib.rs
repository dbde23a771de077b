//! HabitQuest Domain - progression math, streak aggregation, and game-state
//! rules for the gamified habit tracker.
//!
//! This crate is pure: no async, no I/O, no clocks. Timestamps and log rows
//! are passed in by callers.

pub mod entities;
pub mod error;
pub mod game_state;
pub mod ids;
pub mod leveling;
pub mod streaks;
pub mod value_objects;

pub use entities::{
    Area, AreaLevel, BadHabit, BadHabitCredit, BadHabitLog, GoodHabit, HabitLog, Transaction,
    TransactionKind, User, UserConfig, XpComputationMode, DEFAULT_MAX_LIFE,
    DEFAULT_RECOVERY_TARGET, DEFAULT_XP_PER_LEVEL, MIN_XP_PER_LEVEL,
};
pub use error::DomainError;
pub use game_state::GameState;
pub use ids::{
    AreaId, BadHabitId, BadHabitLogId, CreditId, GoodHabitId, HabitLogId, TransactionId, UserId,
};
pub use leveling::{apply_completion, level_from_total_xp, xp_required, LevelCurve, LevelProgress};
pub use streaks::{
    bad_habit_history, bad_habit_streak, day_success, general_streak, good_habit_history,
    good_habit_streak, BadDayStatus, BadOccurrence, DayOutcome, GeneralStreak, GoodCompletion,
    GoodDayStatus, HabitKind, HistoryDay, StreakCounts, DAY_SUCCESS_THRESHOLD_PERCENT,
};
pub use value_objects::EntityStatus;
