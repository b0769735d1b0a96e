//! Streak calculation over a habit's completion ledger.
//!
//! Streaks are always recomputed from the full set of completion dates. Days
//! on which the habit is not due are transparent: they neither extend nor
//! break a streak. Today is "in progress": a due but not yet completed today
//! does not break the streak until the day is over.
//!
//! Schedules are not versioned, so the whole history is evaluated against
//! the habit's current schedule.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::schedule::WeeklySchedule;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl StreakState {
    /// User-level rollup: the best habit's streaks, not their sum.
    pub fn rollup<I>(states: I) -> StreakState
    where
        I: IntoIterator<Item = StreakState>,
    {
        states
            .into_iter()
            .fold(StreakState::default(), |acc, s| StreakState {
                current_streak: acc.current_streak.max(s.current_streak),
                longest_streak: acc.longest_streak.max(s.longest_streak),
            })
    }
}

/// First day that counts towards a habit's history: the earlier of its
/// creation day and its first completion.
pub fn history_start(created_on: NaiveDate, completions: &BTreeSet<NaiveDate>) -> NaiveDate {
    match completions.first() {
        Some(first) if *first < created_on => *first,
        _ => created_on,
    }
}

/// Walk backwards from `today` counting due-and-completed days until the
/// first due day without a completion (today excepted).
pub fn current_streak(
    schedule: &WeeklySchedule,
    completions: &BTreeSet<NaiveDate>,
    start: NaiveDate,
    today: NaiveDate,
) -> u32 {
    let mut streak = 0;
    let mut day = today;
    while day >= start {
        if schedule.is_due(day) {
            if completions.contains(&day) {
                streak += 1;
            } else if day != today {
                break;
            }
        }
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// Longest run of consecutive due-and-completed days between `start` and
/// `today` inclusive.
pub fn longest_streak(
    schedule: &WeeklySchedule,
    completions: &BTreeSet<NaiveDate>,
    start: NaiveDate,
    today: NaiveDate,
) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    for day in start.iter_days().take_while(|d| *d <= today) {
        if !schedule.is_due(day) {
            continue;
        }
        if completions.contains(&day) {
            run += 1;
            longest = longest.max(run);
        } else if day != today {
            run = 0;
        }
    }
    longest
}

/// Current and longest streak for one habit as of `today`.
pub fn compute(
    schedule: &WeeklySchedule,
    created_on: NaiveDate,
    completions: &BTreeSet<NaiveDate>,
    today: NaiveDate,
) -> StreakState {
    let start = history_start(created_on, completions);
    StreakState {
        current_streak: current_streak(schedule, completions, start, today),
        longest_streak: longest_streak(schedule, completions, start, today),
    }
}
