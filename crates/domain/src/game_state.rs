//! Game lifecycle states.
//!
//! The cycle is active -> game_over (life hit zero) -> recovery (challenge
//! started) -> active (challenge completed, life restored). Transition rules
//! live on [`crate::entities::User`]; this module only defines the state
//! value and its wire/storage encoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Lifecycle state of a user's game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    /// Normal play: habit actions are permitted.
    Active,
    /// Life reached zero; all habit actions are blocked.
    GameOver,
    /// The recovery challenge is underway; habit actions remain blocked.
    Recovery,
}

impl GameState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::GameOver => "game_over",
            Self::Recovery => "recovery",
        }
    }

    /// Whether habit actions (complete / record) are permitted.
    pub fn allows_actions(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GameState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "game_over" => Ok(Self::GameOver),
            "recovery" => Ok(Self::Recovery),
            _ => Err(DomainError::parse(format!("Unknown game state: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for state in [GameState::Active, GameState::GameOver, GameState::Recovery] {
            assert_eq!(state.as_str().parse::<GameState>().ok(), Some(state));
        }
        assert!("dead".parse::<GameState>().is_err());
    }

    #[test]
    fn test_only_active_allows_actions() {
        assert!(GameState::Active.allows_actions());
        assert!(!GameState::GameOver.allows_actions());
        assert!(!GameState::Recovery.allows_actions());
    }
}
