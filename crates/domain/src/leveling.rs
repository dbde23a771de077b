//! Leveling math - converts habit rewards into level-ups.
//!
//! Pure functions shared by user-wide and per-area progression. A single
//! completion may cross several levels at once; the rollover loop terminates
//! because the per-level requirement is always at least 1 XP.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Shape of the XP requirement as levels rise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelCurve {
    /// Every level costs the same base amount.
    #[serde(rename = "linear")]
    Linear,
    /// Each level costs `base * multiplier^(level-1)`.
    #[serde(rename = "exp")]
    Exponential,
}

impl LevelCurve {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Exponential => "exp",
        }
    }
}

impl fmt::Display for LevelCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LevelCurve {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "exp" => Ok(Self::Exponential),
            _ => Err(DomainError::parse(format!("Unknown level curve: {}", s))),
        }
    }
}

/// A (level, xp) pair where `xp` is progress *into* the current level.
///
/// Invariant outside of a rollover computation: `xp < xp_required(level, ..)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: u32,
    pub xp: u64,
}

impl LevelProgress {
    /// Starting point for any progression track.
    pub fn start() -> Self {
        Self { level: 1, xp: 0 }
    }
}

impl Default for LevelProgress {
    fn default() -> Self {
        Self::start()
    }
}

/// XP needed to advance from `level` to `level + 1`.
///
/// Linear curves are level-independent. Exponential curves floor to an
/// integer but never drop below 1, so the rollover loop always terminates.
/// A multiplier below 1.0 is invalid input and is clamped to 1.0.
pub fn xp_required(level: u32, base: u32, curve: LevelCurve, multiplier: f64) -> u64 {
    match curve {
        LevelCurve::Linear => u64::from(base),
        LevelCurve::Exponential => {
            let multiplier = multiplier.max(1.0);
            let exponent = level.saturating_sub(1) as i32;
            let required = (f64::from(base) * multiplier.powi(exponent)).floor();
            (required as u64).max(1)
        }
    }
}

/// Apply one completion's reward to a progression track.
///
/// Adds `reward_xp` and rolls over as many level-ups as the accumulated XP
/// pays for. Post-condition: the returned xp is strictly below the
/// requirement for the returned level. A zero reward is a valid no-op.
pub fn apply_completion(
    current: LevelProgress,
    reward_xp: u64,
    base: u32,
    curve: LevelCurve,
    multiplier: f64,
) -> LevelProgress {
    let mut level = current.level.max(1);
    let mut xp = current.xp + reward_xp;

    loop {
        let required = xp_required(level, base, curve, multiplier);
        if xp < required {
            break;
        }
        xp -= required;
        level += 1;
    }

    LevelProgress { level, xp }
}

/// Rebuild (level, xp) from a lifetime XP total.
///
/// Used when a user's bookkeeping mode derives level/xp from logs instead
/// of stored counters. Equivalent to folding [`apply_completion`] over the
/// individual rewards in any order, since the result depends only on the sum.
pub fn level_from_total_xp(
    total_xp: u64,
    base: u32,
    curve: LevelCurve,
    multiplier: f64,
) -> LevelProgress {
    apply_completion(LevelProgress::start(), total_xp, base, curve, multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_requirement_is_level_independent() {
        for level in 1..=50 {
            assert_eq!(xp_required(level, 100, LevelCurve::Linear, 2.0), 100);
        }
    }

    #[test]
    fn test_exponential_requirement_formula() {
        // floor(base * mult^(level-1))
        assert_eq!(xp_required(1, 100, LevelCurve::Exponential, 2.0), 100);
        assert_eq!(xp_required(2, 100, LevelCurve::Exponential, 2.0), 200);
        assert_eq!(xp_required(3, 100, LevelCurve::Exponential, 2.0), 400);
        assert_eq!(xp_required(4, 100, LevelCurve::Exponential, 1.5), 337);
    }

    #[test]
    fn test_exponential_requirement_never_below_one() {
        // Degenerate base still yields a positive requirement.
        assert!(xp_required(1, 0, LevelCurve::Exponential, 2.0) >= 1);
    }

    #[test]
    fn test_multiplier_below_one_clamps() {
        // 0.5 would shrink requirements toward zero; clamped to 1.0 instead.
        assert_eq!(xp_required(5, 100, LevelCurve::Exponential, 0.5), 100);
    }

    #[test]
    fn test_apply_completion_single_level_up() {
        let result = apply_completion(LevelProgress::start(), 100, 100, LevelCurve::Linear, 1.0);
        assert_eq!(result, LevelProgress { level: 2, xp: 0 });
    }

    #[test]
    fn test_apply_completion_multiple_level_ups_in_one_call() {
        // 350 XP at 100/level: level 1 -> 4 with 50 left over.
        let result = apply_completion(LevelProgress::start(), 350, 100, LevelCurve::Linear, 1.0);
        assert_eq!(result, LevelProgress { level: 4, xp: 50 });
    }

    #[test]
    fn test_apply_completion_postcondition_holds() {
        for reward in [0u64, 1, 99, 100, 101, 350, 1_000, 123_456] {
            for curve in [LevelCurve::Linear, LevelCurve::Exponential] {
                let result = apply_completion(LevelProgress::start(), reward, 100, curve, 1.5);
                assert!(
                    result.xp < xp_required(result.level, 100, curve, 1.5),
                    "reward {} left xp {} at level {}",
                    reward,
                    result.xp,
                    result.level
                );
            }
        }
    }

    #[test]
    fn test_zero_reward_is_noop() {
        let current = LevelProgress { level: 3, xp: 40 };
        let result = apply_completion(current, 0, 100, LevelCurve::Linear, 1.0);
        assert_eq!(result, current);
    }

    #[test]
    fn test_exponential_scenario_base_100_mult_2() {
        // Completion 1 from level 1 / xp 0 with reward 100 -> level 2, xp 0.
        let first = apply_completion(LevelProgress::start(), 100, 100, LevelCurve::Exponential, 2.0);
        assert_eq!(first, LevelProgress { level: 2, xp: 0 });

        // Completion 2 -> level 2, xp 100 (requirement at level 2 is 200).
        let second = apply_completion(first, 100, 100, LevelCurve::Exponential, 2.0);
        assert_eq!(second, LevelProgress { level: 2, xp: 100 });
    }

    #[test]
    fn test_level_from_total_xp_matches_fold_in_any_order() {
        let rewards = [25u64, 100, 10, 300, 55, 5];
        let total: u64 = rewards.iter().sum();

        for curve in [LevelCurve::Linear, LevelCurve::Exponential] {
            let from_total = level_from_total_xp(total, 100, curve, 2.0);

            let folded_forward = rewards.iter().fold(LevelProgress::start(), |acc, &r| {
                apply_completion(acc, r, 100, curve, 2.0)
            });
            let folded_reverse = rewards.iter().rev().fold(LevelProgress::start(), |acc, &r| {
                apply_completion(acc, r, 100, curve, 2.0)
            });

            assert_eq!(from_total, folded_forward);
            assert_eq!(from_total, folded_reverse);
        }
    }

    #[test]
    fn test_level_curve_round_trip() {
        for curve in [LevelCurve::Linear, LevelCurve::Exponential] {
            assert_eq!(curve.as_str().parse::<LevelCurve>().ok(), Some(curve));
        }
        assert!("quadratic".parse::<LevelCurve>().is_err());
    }
}
