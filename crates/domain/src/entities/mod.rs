//! Domain entities.

mod area;
mod habit;
mod logs;
mod transaction;
mod user;

pub use area::{Area, AreaLevel};
pub use habit::{BadHabit, GoodHabit};
pub use logs::{BadHabitCredit, BadHabitLog, HabitLog};
pub use transaction::{Transaction, TransactionKind};
pub use user::{
    User, UserConfig, XpComputationMode, DEFAULT_MAX_LIFE, DEFAULT_RECOVERY_TARGET,
    DEFAULT_XP_PER_LEVEL, MIN_XP_PER_LEVEL,
};
