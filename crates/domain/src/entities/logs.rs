//! Append-only log records and the credit inventory.
//!
//! Logs are immutable once written: they are the audit trail and, in "logs"
//! xp-computation mode, the source of truth for total XP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{BadHabitId, BadHabitLogId, CreditId, GoodHabitId, HabitLogId, UserId};

/// One good-habit completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitLog {
    pub id: HabitLogId,
    pub user_id: UserId,
    pub habit_id: GoodHabitId,
    pub timestamp: DateTime<Utc>,
}

impl HabitLog {
    pub fn new(user_id: UserId, habit_id: GoodHabitId, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: HabitLogId::new(),
            user_id,
            habit_id,
            timestamp,
        }
    }
}

/// One bad-habit occurrence. `avoided_penalty` records whether a
/// pre-purchased credit absorbed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadHabitLog {
    pub id: BadHabitLogId,
    pub user_id: UserId,
    pub bad_habit_id: BadHabitId,
    pub avoided_penalty: bool,
    pub timestamp: DateTime<Utc>,
}

impl BadHabitLog {
    pub fn new(
        user_id: UserId,
        bad_habit_id: BadHabitId,
        avoided_penalty: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BadHabitLogId::new(),
            user_id,
            bad_habit_id,
            avoided_penalty,
            timestamp,
        }
    }
}

/// A purchased token absorbing one bad-habit occurrence. Consumed oldest
/// purchase first; consumption deletes the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadHabitCredit {
    pub id: CreditId,
    pub user_id: UserId,
    pub bad_habit_id: BadHabitId,
    pub purchased_at: DateTime<Utc>,
}

impl BadHabitCredit {
    pub fn new(user_id: UserId, bad_habit_id: BadHabitId, purchased_at: DateTime<Utc>) -> Self {
        Self {
            id: CreditId::new(),
            user_id,
            bad_habit_id,
            purchased_at,
        }
    }
}
