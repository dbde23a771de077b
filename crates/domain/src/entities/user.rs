//! User entity - the single live account row, mutated by every action.
//!
//! Owns the game-state lifecycle (active -> game_over -> recovery -> active)
//! and the progression/currency counters. The once-only guarantee for the
//! game-over transition under concurrent requests is enforced by the store's
//! conditional update; the methods here encode the single-threaded rules.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::game_state::GameState;
use crate::ids::UserId;
use crate::leveling::{LevelCurve, LevelProgress};

/// Life restored on creation and on recovery completion.
pub const DEFAULT_MAX_LIFE: i64 = 100;
/// Default per-level XP requirement.
pub const DEFAULT_XP_PER_LEVEL: u32 = 100;
/// Lower bound for the per-level XP requirement.
pub const MIN_XP_PER_LEVEL: u32 = 10;
/// Default recovery distance target: a marathon, in meters.
pub const DEFAULT_RECOVERY_TARGET: u32 = 42_195;

/// How a user's level/xp pair is maintained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpComputationMode {
    /// Counters are updated in place on every completion.
    Stored,
    /// Counters are recomputed on read from the lifetime habit-log XP sum;
    /// the stored pair is left untouched by completions.
    Logs,
}

impl XpComputationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Logs => "logs",
        }
    }
}

impl fmt::Display for XpComputationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for XpComputationMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stored" => Ok(Self::Stored),
            "logs" => Ok(Self::Logs),
            _ => Err(DomainError::parse(format!("Unknown xp computation mode: {}", s))),
        }
    }
}

/// Progression and leveling settings, shared by the config endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    pub xp_per_level: u32,
    pub level_curve: LevelCurve,
    pub level_multiplier: f64,
    pub xp_mode: XpComputationMode,
    pub recovery_target: u32,
}

impl UserConfig {
    /// Validate ranges: `xp_per_level >= 10`, `level_multiplier >= 1.0`,
    /// `recovery_target > 0`.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.xp_per_level < MIN_XP_PER_LEVEL {
            return Err(DomainError::validation(format!(
                "xpPerLevel must be at least {}",
                MIN_XP_PER_LEVEL
            )));
        }
        if self.level_multiplier < 1.0 {
            return Err(DomainError::validation("levelMultiplier must be at least 1.0"));
        }
        if self.recovery_target == 0 {
            return Err(DomainError::validation("recoveryTarget must be positive"));
        }
        Ok(())
    }
}

/// The account row. One per user; created once, mutated by every action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub life: i64,
    pub max_life: i64,
    pub coins: u64,
    #[serde(flatten)]
    pub progress: LevelProgress,
    pub xp_per_level: u32,
    pub level_curve: LevelCurve,
    pub level_multiplier: f64,
    pub xp_mode: XpComputationMode,
    pub game_state: GameState,
    pub game_over_at: Option<DateTime<Utc>>,
    pub recovery_started_at: Option<DateTime<Utc>>,
    pub recovery_distance: u32,
    pub recovery_target: u32,
    pub total_game_overs: u32,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            life: DEFAULT_MAX_LIFE,
            max_life: DEFAULT_MAX_LIFE,
            coins: 0,
            progress: LevelProgress::start(),
            xp_per_level: DEFAULT_XP_PER_LEVEL,
            level_curve: LevelCurve::Linear,
            level_multiplier: 1.0,
            xp_mode: XpComputationMode::Stored,
            game_state: GameState::Active,
            game_over_at: None,
            recovery_started_at: None,
            recovery_distance: 0,
            recovery_target: DEFAULT_RECOVERY_TARGET,
            total_game_overs: 0,
            created_at: now,
        }
    }

    /// Reject habit actions unless the game is active.
    pub fn ensure_active(&self) -> Result<(), DomainError> {
        if !self.game_state.allows_actions() {
            return Err(DomainError::conflict(format!(
                "game is not active (state: {})",
                self.game_state
            )));
        }
        Ok(())
    }

    /// Subtract a life penalty, clamping at zero. Returns the new life.
    pub fn apply_life_penalty(&mut self, penalty: u32) -> i64 {
        self.life = (self.life - i64::from(penalty)).max(0);
        self.life
    }

    /// Whether an unforgiven hit has exhausted the life pool.
    pub fn is_out_of_life(&self) -> bool {
        self.life <= 0
    }

    /// Transition active -> game_over. Records when it happened, starts the
    /// recovery clock, and bumps the lifetime counter.
    ///
    /// Only legal from the active state; the store layer additionally guards
    /// this with a conditional update so two concurrent bad-habit actions
    /// cannot both fire it.
    pub fn trigger_game_over(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.game_state != GameState::Active {
            return Err(DomainError::invalid_state_transition(format!(
                "game over can only trigger from active (state: {})",
                self.game_state
            )));
        }
        self.game_state = GameState::GameOver;
        self.game_over_at = Some(now);
        self.recovery_started_at = Some(now);
        self.recovery_distance = 0;
        self.total_game_overs += 1;
        Ok(())
    }

    /// Store externally-reported recovery distance. Only meaningful while
    /// the game is not active; the value is clamped to >= 0 by its type and
    /// never changes the game state by itself.
    pub fn set_recovery_progress(&mut self, meters: u32) -> Result<(), DomainError> {
        if self.game_state == GameState::Active {
            return Err(DomainError::conflict(
                "recovery progress only applies while the game is over",
            ));
        }
        self.recovery_distance = meters;
        Ok(())
    }

    /// Whether the recovery challenge target has been reached.
    pub fn recovery_complete(&self) -> bool {
        self.recovery_distance >= self.recovery_target
    }

    /// Transition back to active once the recovery target is reached.
    ///
    /// Restores life to its configured maximum and clears the recovery
    /// bookkeeping. Calling while already active is an explicit conflict so
    /// the reset can never double-fire.
    pub fn complete_recovery(&mut self) -> Result<(), DomainError> {
        if self.game_state == GameState::Active {
            return Err(DomainError::conflict("game is already active"));
        }
        if !self.recovery_complete() {
            return Err(DomainError::conflict(format!(
                "recovery target not reached: {}/{} meters",
                self.recovery_distance, self.recovery_target
            )));
        }
        self.game_state = GameState::Active;
        self.life = self.max_life;
        self.game_over_at = None;
        self.recovery_started_at = None;
        self.recovery_distance = 0;
        Ok(())
    }

    pub fn add_coins(&mut self, amount: u64) {
        self.coins += amount;
    }

    /// Spend coins, rejecting overdrafts.
    pub fn spend_coins(&mut self, amount: u64) -> Result<(), DomainError> {
        if self.coins < amount {
            return Err(DomainError::conflict(format!(
                "insufficient coins: have {}, need {}",
                self.coins, amount
            )));
        }
        self.coins -= amount;
        Ok(())
    }

    /// Current leveling settings as a config view.
    pub fn config(&self) -> UserConfig {
        UserConfig {
            xp_per_level: self.xp_per_level,
            level_curve: self.level_curve,
            level_multiplier: self.level_multiplier,
            xp_mode: self.xp_mode,
            recovery_target: self.recovery_target,
        }
    }

    /// Apply a validated config update.
    pub fn apply_config(&mut self, config: UserConfig) -> Result<(), DomainError> {
        config.validate()?;
        self.xp_per_level = config.xp_per_level;
        self.level_curve = config.level_curve;
        self.level_multiplier = config.level_multiplier;
        self.xp_mode = config.xp_mode;
        self.recovery_target = config.recovery_target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new("Otto", Utc::now())
    }

    #[test]
    fn test_new_user_defaults() {
        let user = user();
        assert_eq!(user.life, DEFAULT_MAX_LIFE);
        assert_eq!(user.game_state, GameState::Active);
        assert_eq!(user.progress, LevelProgress::start());
        assert_eq!(user.recovery_target, DEFAULT_RECOVERY_TARGET);
        assert_eq!(user.total_game_overs, 0);
    }

    #[test]
    fn test_life_penalty_clamps_at_zero() {
        let mut user = user();
        user.life = 3;
        assert_eq!(user.apply_life_penalty(10), 0);
        assert!(user.is_out_of_life());
    }

    #[test]
    fn test_trigger_game_over_from_active() {
        let mut user = user();
        let now = Utc::now();
        user.life = 0;
        user.trigger_game_over(now).expect("trigger from active");

        assert_eq!(user.game_state, GameState::GameOver);
        assert_eq!(user.game_over_at, Some(now));
        assert_eq!(user.recovery_started_at, Some(now));
        assert_eq!(user.recovery_distance, 0);
        assert_eq!(user.total_game_overs, 1);
    }

    #[test]
    fn test_trigger_game_over_twice_fails() {
        let mut user = user();
        user.trigger_game_over(Utc::now()).expect("first trigger");
        let second = user.trigger_game_over(Utc::now());
        assert!(matches!(second, Err(DomainError::InvalidStateTransition(_))));
        assert_eq!(user.total_game_overs, 1, "counter must not double-fire");
    }

    #[test]
    fn test_actions_blocked_while_not_active() {
        let mut user = user();
        assert!(user.ensure_active().is_ok());
        user.trigger_game_over(Utc::now()).expect("trigger");
        assert!(matches!(user.ensure_active(), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn test_recovery_progress_rejected_while_active() {
        let mut user = user();
        assert!(matches!(
            user.set_recovery_progress(100),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn test_recovery_flow_restores_life_and_clears_fields() {
        let mut user = user();
        user.life = 0;
        user.trigger_game_over(Utc::now()).expect("trigger");

        user.set_recovery_progress(10_000).expect("progress");
        assert!(!user.recovery_complete());
        assert!(matches!(user.complete_recovery(), Err(DomainError::Conflict(_))));

        user.set_recovery_progress(DEFAULT_RECOVERY_TARGET).expect("progress");
        assert!(user.recovery_complete());
        user.complete_recovery().expect("complete");

        assert_eq!(user.game_state, GameState::Active);
        assert_eq!(user.life, user.max_life);
        assert_eq!(user.game_over_at, None);
        assert_eq!(user.recovery_started_at, None);
        assert_eq!(user.recovery_distance, 0);
        // The lifetime counter survives the reset.
        assert_eq!(user.total_game_overs, 1);
    }

    #[test]
    fn test_complete_recovery_while_active_is_conflict() {
        let mut user = user();
        assert!(matches!(user.complete_recovery(), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn test_spend_coins_rejects_overdraft() {
        let mut user = user();
        user.add_coins(5);
        assert!(user.spend_coins(10).is_err());
        assert_eq!(user.coins, 5);
        user.spend_coins(5).expect("spend");
        assert_eq!(user.coins, 0);
    }

    #[test]
    fn test_user_json_shape() {
        let user = user();
        let json = serde_json::to_value(&user).expect("serializes");

        // Level/xp flatten into the user object; enums use their wire names.
        assert_eq!(json["level"], 1);
        assert_eq!(json["xp"], 0);
        assert_eq!(json["maxLife"], DEFAULT_MAX_LIFE);
        assert_eq!(json["levelCurve"], "linear");
        assert_eq!(json["xpMode"], "stored");
        assert_eq!(json["gameState"], "active");
        assert!(json.get("progress").is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut user = user();
        let mut config = user.config();

        config.xp_per_level = 5;
        assert!(user.apply_config(config).is_err());

        config.xp_per_level = 50;
        config.level_multiplier = 0.9;
        assert!(user.apply_config(config).is_err());

        config.level_multiplier = 1.5;
        config.level_curve = LevelCurve::Exponential;
        config.xp_mode = XpComputationMode::Logs;
        user.apply_config(config).expect("valid config");
        assert_eq!(user.xp_per_level, 50);
        assert_eq!(user.level_curve, LevelCurve::Exponential);
        assert_eq!(user.xp_mode, XpComputationMode::Logs);
    }
}
