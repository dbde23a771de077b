//! Archival status value object.
//!
//! Areas and habits are never destroyed; they are archived. Archived rows
//! stay visible in historical logs and archive views but are excluded from
//! every active-state query, which filters on this enum explicitly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Whether an entity is live or soft-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    Active,
    Archived,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }

    pub fn is_archived(&self) -> bool {
        matches!(self, Self::Archived)
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            _ => Err(DomainError::parse(format!("Unknown entity status: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for status in [EntityStatus::Active, EntityStatus::Archived] {
            assert_eq!(status.as_str().parse::<EntityStatus>().ok(), Some(status));
        }
    }

    #[test]
    fn test_is_archived() {
        assert!(EntityStatus::Archived.is_archived());
        assert!(!EntityStatus::Active.is_archived());
    }
}
