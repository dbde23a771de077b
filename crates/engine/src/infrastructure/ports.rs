// Port traits define the full contract - some methods are for future use
#![allow(dead_code)]

//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is
//! concrete types. Ports exist for:
//! - Database access (could swap SQLite -> Postgres)
//! - Clock (for testing)
//!
//! The `ActionStore` port is the transactional boundary: every multi-row
//! mutation of an action (completion, bad-habit record, credit purchase)
//! commits as one all-or-nothing write set.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use habitquest_domain::{
    Area, AreaId, AreaLevel, BadHabit, BadHabitCredit, BadHabitId, BadHabitLog, CreditId,
    GoodHabit, GoodHabitId, HabitLog, Transaction, User, UserId,
};

// =============================================================================
// Error Types
// =============================================================================

/// Repository operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Entity not found - includes entity type and ID for actionable error messages.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Database operation failed - includes operation name for tracing.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A versioned write lost a race: the row changed since it was read.
    /// The caller re-reads and retries.
    #[error("Stale write on {entity_type}: {id}")]
    Stale {
        entity_type: &'static str,
        id: String,
    },
}

impl RepoError {
    /// Create a NotFound error with entity type and ID context.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Create a Database error with operation context.
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    /// Create a Stale error with entity type and ID context.
    pub fn stale(entity_type: &'static str, id: impl ToString) -> Self {
        Self::Stale {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Check if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a Stale (lost race) error.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

// =============================================================================
// Versioned rows
// =============================================================================

/// A row paired with the optimistic-concurrency version it was read at.
///
/// Writes through [`ActionStore`] carry the expected version; a mismatch
/// means a concurrent action got there first and the write is rejected as
/// [`RepoError::Stale`] instead of silently losing the update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: i64,
}

impl<T> Versioned<T> {
    pub fn new(value: T, version: i64) -> Self {
        Self { value, version }
    }
}

// =============================================================================
// Transactional write sets
// =============================================================================

/// Atomic write set for a good-habit completion: user counters, the
/// (possibly fresh) area-level row, the habit log, and the ledger entry.
#[derive(Debug, Clone)]
pub struct CompletionWrite {
    pub user: Versioned<User>,
    /// `version == None` inserts a fresh row (first completion in the area).
    pub area_level: AreaLevel,
    pub area_level_version: Option<i64>,
    pub log: HabitLog,
    pub ledger: Transaction,
}

/// Atomic write set for a bad-habit occurrence.
#[derive(Debug, Clone)]
pub struct BadHabitWrite {
    pub user: Versioned<User>,
    /// Credit consumed to forgive the occurrence; deleted by the commit.
    /// Deleting zero rows means another request consumed it first - stale.
    pub consumed_credit: Option<CreditId>,
    pub log: BadHabitLog,
    /// When set, the user update additionally asserts
    /// `game_state = 'active'` so the game-over transition fires at most
    /// once under concurrent records.
    pub triggers_game_over: bool,
}

/// Atomic write set for buying a bad-habit credit with coins.
#[derive(Debug, Clone)]
pub struct CreditPurchaseWrite {
    pub user: Versioned<User>,
    pub credit: BadHabitCredit,
    pub ledger: Transaction,
}

// =============================================================================
// Database Ports
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get(&self, id: UserId) -> Result<Option<Versioned<User>>, RepoError>;
    async fn insert(&self, user: &User) -> Result<(), RepoError>;
    /// Versioned full-row update (non-action paths: config, recovery).
    async fn update(&self, user: &Versioned<User>) -> Result<(), RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AreaRepo: Send + Sync {
    async fn get(&self, id: AreaId) -> Result<Option<Area>, RepoError>;
    async fn save(&self, area: &Area) -> Result<(), RepoError>;
    async fn list(&self, include_archived: bool) -> Result<Vec<Area>, RepoError>;
    async fn get_level(
        &self,
        user_id: UserId,
        area_id: AreaId,
    ) -> Result<Option<Versioned<AreaLevel>>, RepoError>;
    async fn list_levels(&self, user_id: UserId) -> Result<Vec<AreaLevel>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HabitRepo: Send + Sync {
    async fn get_good(&self, id: GoodHabitId) -> Result<Option<GoodHabit>, RepoError>;
    async fn save_good(&self, habit: &GoodHabit) -> Result<(), RepoError>;
    async fn list_good(&self, include_archived: bool) -> Result<Vec<GoodHabit>, RepoError>;
    /// Count of active, non-archived good habits - the `totalActiveGood`
    /// denominator for general-streak day success.
    async fn count_active_good(&self) -> Result<u32, RepoError>;

    async fn get_bad(&self, id: BadHabitId) -> Result<Option<BadHabit>, RepoError>;
    async fn save_bad(&self, habit: &BadHabit) -> Result<(), RepoError>;
    async fn list_bad(&self, include_archived: bool) -> Result<Vec<BadHabit>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LogRepo: Send + Sync {
    /// Habit logs with `from <= timestamp < to`.
    async fn good_completions_in(
        &self,
        user_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HabitLog>, RepoError>;

    /// Bad-habit logs with `from <= timestamp < to`.
    async fn bad_occurrences_in(
        &self,
        user_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BadHabitLog>, RepoError>;

    /// Lifetime sum of reward XP over all habit logs (joined against the
    /// habit definitions). Source of truth in "logs" xp-computation mode.
    async fn total_reward_xp(&self, user_id: UserId) -> Result<u64, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CreditRepo: Send + Sync {
    /// Oldest-purchased unconsumed credit for (user, bad habit), if any.
    async fn oldest_for(
        &self,
        user_id: UserId,
        bad_habit_id: BadHabitId,
    ) -> Result<Option<BadHabitCredit>, RepoError>;
    async fn count_for(&self, user_id: UserId, bad_habit_id: BadHabitId)
        -> Result<u32, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionRepo: Send + Sync {
    async fn list_for_user(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<Transaction>, RepoError>;
}

/// Transactional boundary for action write sets. Each method commits its
/// whole write set in one database transaction; a version mismatch anywhere
/// rolls the set back and surfaces [`RepoError::Stale`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionStore: Send + Sync {
    async fn commit_completion(&self, write: CompletionWrite) -> Result<(), RepoError>;
    async fn commit_bad_habit(&self, write: BadHabitWrite) -> Result<(), RepoError>;
    async fn commit_credit_purchase(&self, write: CreditPurchaseWrite) -> Result<(), RepoError>;
}

// =============================================================================
// Testability Ports
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
