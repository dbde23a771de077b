//! Habit definitions - the good habits that earn XP/coins and the bad
//! habits that cost life.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{AreaId, BadHabitId, GoodHabitId};
use crate::value_objects::EntityStatus;

/// A habit whose completion is the sole XP/coin-earning event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodHabit {
    pub id: GoodHabitId,
    pub area_id: AreaId,
    pub name: String,
    pub xp_reward: u32,
    pub coin_reward: u32,
    /// Free-form cadence description ("daily", "3x per week", ...).
    pub cadence: String,
    pub is_active: bool,
    pub status: EntityStatus,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl GoodHabit {
    pub fn new(
        area_id: AreaId,
        name: impl Into<String>,
        xp_reward: u32,
        coin_reward: u32,
        cadence: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("habit name cannot be empty"));
        }
        if xp_reward == 0 {
            return Err(DomainError::validation("xpReward must be at least 1"));
        }

        Ok(Self {
            id: GoodHabitId::new(),
            area_id,
            name,
            xp_reward,
            coin_reward,
            cadence: cadence.into(),
            is_active: true,
            status: EntityStatus::Active,
            archived_at: None,
            created_at: now,
        })
    }

    pub fn is_archived(&self) -> bool {
        self.status.is_archived()
    }

    /// Completable: flagged active and not archived.
    pub fn is_actionable(&self) -> bool {
        self.is_active && !self.is_archived()
    }

    pub fn archive(&mut self, now: DateTime<Utc>) {
        self.status = EntityStatus::Archived;
        self.archived_at = Some(now);
    }

    pub fn restore(&mut self) {
        self.status = EntityStatus::Active;
        self.archived_at = None;
    }
}

/// A habit whose occurrence costs life, unless absorbed by a credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadHabit {
    pub id: BadHabitId,
    /// `None` means the habit is global rather than tied to one area.
    pub area_id: Option<AreaId>,
    pub name: String,
    pub life_penalty: u32,
    /// Whether credits can be bought to absorb occurrences.
    pub controllable: bool,
    /// Coin price of one credit.
    pub coin_cost: u32,
    pub is_active: bool,
    pub status: EntityStatus,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BadHabit {
    pub fn new(
        area_id: Option<AreaId>,
        name: impl Into<String>,
        life_penalty: u32,
        controllable: bool,
        coin_cost: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("habit name cannot be empty"));
        }
        if life_penalty == 0 {
            return Err(DomainError::validation("lifePenalty must be at least 1"));
        }

        Ok(Self {
            id: BadHabitId::new(),
            area_id,
            name,
            life_penalty,
            controllable,
            coin_cost,
            is_active: true,
            status: EntityStatus::Active,
            archived_at: None,
            created_at: now,
        })
    }

    pub fn is_archived(&self) -> bool {
        self.status.is_archived()
    }

    pub fn is_actionable(&self) -> bool {
        self.is_active && !self.is_archived()
    }

    pub fn archive(&mut self, now: DateTime<Utc>) {
        self.status = EntityStatus::Archived;
        self.archived_at = Some(now);
    }

    pub fn restore(&mut self) {
        self.status = EntityStatus::Active;
        self.archived_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_good_habit_requires_positive_xp_reward() {
        let now = Utc::now();
        assert!(GoodHabit::new(AreaId::new(), "Run", 0, 5, "daily", now).is_err());
        assert!(GoodHabit::new(AreaId::new(), "Run", 1, 0, "daily", now).is_ok());
        assert!(GoodHabit::new(AreaId::new(), "  ", 10, 5, "daily", now).is_err());
    }

    #[test]
    fn test_bad_habit_requires_positive_penalty() {
        let now = Utc::now();
        assert!(BadHabit::new(None, "Smoking", 0, true, 50, now).is_err());
        assert!(BadHabit::new(None, "Smoking", 5, true, 50, now).is_ok());
    }

    #[test]
    fn test_archived_habit_is_not_actionable() {
        let now = Utc::now();
        let mut habit =
            GoodHabit::new(AreaId::new(), "Run", 10, 5, "daily", now).expect("valid habit");
        assert!(habit.is_actionable());

        habit.archive(now);
        assert!(!habit.is_actionable());

        habit.restore();
        habit.is_active = false;
        assert!(!habit.is_actionable());
    }

    #[test]
    fn test_bad_habit_without_area_is_global() {
        let now = Utc::now();
        let habit = BadHabit::new(None, "Doomscrolling", 2, false, 0, now).expect("valid habit");
        assert!(habit.area_id.is_none());
    }
}
