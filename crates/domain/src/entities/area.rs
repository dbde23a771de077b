//! Area entity - a life area grouping habits, with its own progression track.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::user::MIN_XP_PER_LEVEL;
use crate::error::DomainError;
use crate::ids::{AreaId, UserId};
use crate::leveling::{LevelCurve, LevelProgress};
use crate::value_objects::EntityStatus;

/// A life area (e.g. fitness, reading). Owns habits and, per user, a lazily
/// created [`AreaLevel`] progression row. Archived rather than destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub id: AreaId,
    pub name: String,
    pub icon: String,
    pub xp_per_level: u32,
    pub level_curve: LevelCurve,
    pub level_multiplier: f64,
    pub status: EntityStatus,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Area {
    pub fn new(
        name: impl Into<String>,
        icon: impl Into<String>,
        xp_per_level: u32,
        level_curve: LevelCurve,
        level_multiplier: f64,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("area name cannot be empty"));
        }
        if xp_per_level < MIN_XP_PER_LEVEL {
            return Err(DomainError::validation(format!(
                "xpPerLevel must be at least {}",
                MIN_XP_PER_LEVEL
            )));
        }
        if level_multiplier < 1.0 {
            return Err(DomainError::validation("levelMultiplier must be at least 1.0"));
        }

        Ok(Self {
            id: AreaId::new(),
            name,
            icon: icon.into(),
            xp_per_level,
            level_curve,
            level_multiplier,
            status: EntityStatus::Active,
            archived_at: None,
            created_at: now,
        })
    }

    pub fn is_archived(&self) -> bool {
        self.status.is_archived()
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

/// Per-(user, area) progression row. Same curve math as the user track but
/// parameterized by the area's settings. Unique on (user_id, area_id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaLevel {
    pub user_id: UserId,
    pub area_id: AreaId,
    #[serde(flatten)]
    pub progress: LevelProgress,
}

impl AreaLevel {
    /// Fresh row for a user's first completion in an area.
    pub fn new(user_id: UserId, area_id: AreaId) -> Self {
        Self {
            user_id,
            area_id,
            progress: LevelProgress::start(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_area_validates() {
        let now = Utc::now();
        assert!(Area::new("", "star", 100, LevelCurve::Linear, 1.0, now).is_err());
        assert!(Area::new("Fitness", "star", 5, LevelCurve::Linear, 1.0, now).is_err());
        assert!(Area::new("Fitness", "star", 100, LevelCurve::Exponential, 0.5, now).is_err());
        assert!(Area::new("Fitness", "star", 100, LevelCurve::Exponential, 1.5, now).is_ok());
    }

    #[test]
    fn test_archive_and_restore() {
        let now = Utc::now();
        let mut area =
            Area::new("Fitness", "star", 100, LevelCurve::Linear, 1.0, now).expect("valid area");
        assert!(!area.is_archived());

        area.archive(now);
        assert!(area.is_archived());
        assert_eq!(area.archived_at, Some(now));

        area.restore();
        assert!(!area.is_archived());
        assert_eq!(area.archived_at, None);
    }

    #[test]
    fn test_area_level_starts_fresh() {
        let level = AreaLevel::new(UserId::new(), AreaId::new());
        assert_eq!(level.progress, LevelProgress::start());
    }
}
