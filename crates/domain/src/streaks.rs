//! Streak aggregation - day-indexed success/failure views over habit logs.
//!
//! Everything here is pure: callers fetch the log rows for a date window and
//! pass them in as plain records. Days are calendar dates with no
//! time-of-day significance; log timestamps are bucketed to UTC dates before
//! they reach this module.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{BadHabitId, GoodHabitId};

/// Threshold (percent of active good habits completed) for a successful day.
pub const DAY_SUCCESS_THRESHOLD_PERCENT: u64 = 80;

/// A good-habit completion bucketed to its calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoodCompletion {
    pub habit_id: GoodHabitId,
    pub date: NaiveDate,
}

/// A bad-habit occurrence bucketed to its calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadOccurrence {
    pub bad_habit_id: BadHabitId,
    pub date: NaiveDate,
    /// True when a pre-purchased credit absorbed the occurrence.
    pub avoided_penalty: bool,
}

/// Good or bad habit, as exposed in per-habit streak listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitKind {
    Good,
    Bad,
}

impl HabitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Bad => "bad",
        }
    }
}

impl fmt::Display for HabitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HabitKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(Self::Good),
            "bad" => Ok(Self::Bad),
            _ => Err(DomainError::parse(format!("Unknown habit type: {}", s))),
        }
    }
}

/// One day's outcome within a general-streak window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayOutcome {
    pub date: NaiveDate,
    /// Distinct active good habits completed that day.
    pub completed_good: u32,
    /// Count of currently active good habits, applied to the whole window.
    pub total_active_good: u32,
    pub has_unforgiven_bad: bool,
    /// `None` is a freeze day: no active good habits to measure.
    pub success: Option<bool>,
}

/// General streak over a window: counters plus the per-day breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralStreak {
    pub current_count: u32,
    pub longest_count: u32,
    pub days: Vec<DayOutcome>,
}

/// Current/longest pair for a single habit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakCounts {
    pub current_count: u32,
    pub longest_count: u32,
}

/// Day status in a good habit's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoodDayStatus {
    Done,
    Miss,
    /// The habit itself is currently inactive; applied uniformly across the
    /// window rather than per historical day.
    Inactive,
}

/// Day status in a bad habit's history. `Occurred` (unforgiven) takes
/// precedence over `Forgiven` when both happen on the same day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadDayStatus {
    Clean,
    Forgiven,
    Occurred,
}

/// One dated entry in a habit's history view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryDay<S> {
    pub date: NaiveDate,
    pub status: S,
}

/// Inclusive day iteration; a reversed range collapses to a single day.
fn days_in(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let to = to.max(from);
    from.iter_days().take_while(move |d| *d <= to)
}

/// Success rule for one day.
///
/// With no active good habits the day is frozen (`None`) unless an
/// unforgiven bad occurrence forces a failure. Otherwise the day succeeds
/// when at least [`DAY_SUCCESS_THRESHOLD_PERCENT`] of active good habits
/// were completed and no unforgiven bad occurred. The percentage floors,
/// matching integer division.
pub fn day_success(completed_good: u32, total_active_good: u32, has_unforgiven_bad: bool) -> Option<bool> {
    if total_active_good == 0 {
        if has_unforgiven_bad {
            return Some(false);
        }
        return None;
    }

    let percent = u64::from(completed_good) * 100 / u64::from(total_active_good);
    Some(percent >= DAY_SUCCESS_THRESHOLD_PERCENT && !has_unforgiven_bad)
}

/// Build the general streak for `[from, to]`.
///
/// `total_active_good` is the count of *currently* active good habits; the
/// same count is applied to every day in the window, so past outcomes shift
/// when habits are later added or archived. This mirrors the original
/// behavior deliberately.
///
/// Streak scan: success increments the running count (tracking the max as
/// longest), failure resets it, a freeze day leaves it untouched.
pub fn general_streak(
    from: NaiveDate,
    to: NaiveDate,
    completions: &[GoodCompletion],
    occurrences: &[BadOccurrence],
    total_active_good: u32,
) -> GeneralStreak {
    // Distinct habit ids per day: repeated completions of one habit count once.
    let mut completed_by_day: BTreeMap<NaiveDate, HashSet<GoodHabitId>> = BTreeMap::new();
    for completion in completions {
        completed_by_day
            .entry(completion.date)
            .or_default()
            .insert(completion.habit_id);
    }

    let mut unforgiven_days: BTreeSet<NaiveDate> = BTreeSet::new();
    for occurrence in occurrences {
        if !occurrence.avoided_penalty {
            unforgiven_days.insert(occurrence.date);
        }
    }

    let mut days = Vec::new();
    let mut current = 0u32;
    let mut longest = 0u32;

    for date in days_in(from, to) {
        let completed_good = completed_by_day
            .get(&date)
            .map(|ids| ids.len() as u32)
            .unwrap_or(0);
        let has_unforgiven_bad = unforgiven_days.contains(&date);
        let success = day_success(completed_good, total_active_good, has_unforgiven_bad);

        match success {
            Some(true) => {
                current += 1;
                longest = longest.max(current);
            }
            Some(false) => current = 0,
            None => {}
        }

        days.push(DayOutcome {
            date,
            completed_good,
            total_active_good,
            has_unforgiven_bad,
            success,
        });
    }

    GeneralStreak {
        current_count: current,
        longest_count: longest,
        days,
    }
}

/// Streak for one good habit: a day counts when at least one log exists,
/// any miss resets the run.
pub fn good_habit_streak(
    from: NaiveDate,
    to: NaiveDate,
    done_dates: &BTreeSet<NaiveDate>,
) -> StreakCounts {
    scan_streak(from, to, |date| done_dates.contains(&date))
}

/// Streak for one bad habit: a day is clean unless an unforgiven occurrence
/// exists. Forgiven occurrences and log-free days both keep the run alive.
pub fn bad_habit_streak(
    from: NaiveDate,
    to: NaiveDate,
    unforgiven_dates: &BTreeSet<NaiveDate>,
) -> StreakCounts {
    scan_streak(from, to, |date| !unforgiven_dates.contains(&date))
}

fn scan_streak(from: NaiveDate, to: NaiveDate, day_counts: impl Fn(NaiveDate) -> bool) -> StreakCounts {
    let mut current = 0u32;
    let mut longest = 0u32;

    for date in days_in(from, to) {
        if day_counts(date) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }

    StreakCounts {
        current_count: current,
        longest_count: longest,
    }
}

/// Day-by-day history for a good habit.
pub fn good_habit_history(
    from: NaiveDate,
    to: NaiveDate,
    done_dates: &BTreeSet<NaiveDate>,
    habit_active: bool,
) -> Vec<HistoryDay<GoodDayStatus>> {
    days_in(from, to)
        .map(|date| {
            let status = if !habit_active {
                GoodDayStatus::Inactive
            } else if done_dates.contains(&date) {
                GoodDayStatus::Done
            } else {
                GoodDayStatus::Miss
            };
            HistoryDay { date, status }
        })
        .collect()
}

/// Day-by-day history for a bad habit.
pub fn bad_habit_history(
    from: NaiveDate,
    to: NaiveDate,
    unforgiven_dates: &BTreeSet<NaiveDate>,
    forgiven_dates: &BTreeSet<NaiveDate>,
) -> Vec<HistoryDay<BadDayStatus>> {
    days_in(from, to)
        .map(|date| {
            let status = if unforgiven_dates.contains(&date) {
                BadDayStatus::Occurred
            } else if forgiven_dates.contains(&date) {
                BadDayStatus::Forgiven
            } else {
                BadDayStatus::Clean
            };
            HistoryDay { date, status }
        })
        .collect()
}
