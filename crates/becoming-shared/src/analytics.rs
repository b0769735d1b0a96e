//! Read-only rollups over an owner's habits and completion ledger.
//!
//! All figures are deterministic functions of the histories handed in and
//! the owner's `today`. An owner with no habits gets the documented
//! defaults (zeros and `None`), never an error.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::Serialize;

use crate::clock::OwnerClock;
use crate::constants::WEEKLY_WINDOW_DAYS;
use crate::schedule::WeeklySchedule;
use crate::streak::{self, StreakState};
use crate::types::{weekday_name, TimeOfDay, WEEK_SUNDAY_FIRST};

/// Everything the aggregator needs to know about one habit.
#[derive(Debug, Clone)]
pub struct HabitHistory {
    pub schedule: WeeklySchedule,
    pub created_on: NaiveDate,
    pub completions: BTreeSet<NaiveDate>,
    /// Owner-local hour of each completion's `completedAt`.
    pub completion_hours: Vec<u32>,
}

impl HabitHistory {
    /// Build a history from `(date, completed_at)` ledger rows.
    pub fn from_events<I>(
        schedule: WeeklySchedule,
        created_at: DateTime<Utc>,
        events: I,
        clock: &OwnerClock,
    ) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, DateTime<Utc>)>,
    {
        let mut completions = BTreeSet::new();
        let mut completion_hours = Vec::new();
        for (date, completed_at) in events {
            completions.insert(date);
            completion_hours.push(clock.local_hour(completed_at));
        }
        Self {
            schedule,
            created_on: clock.local_date(created_at),
            completions,
            completion_hours,
        }
    }

    pub fn start(&self) -> NaiveDate {
        streak::history_start(self.created_on, &self.completions)
    }

    pub fn streak(&self, today: NaiveDate) -> StreakState {
        streak::compute(&self.schedule, self.created_on, &self.completions, today)
    }

    /// `(due, completed)` for a single day.
    fn tally_on(&self, day: NaiveDate) -> (u32, u32) {
        if day < self.start() || !self.schedule.is_due(day) {
            return (0, 0);
        }
        (1, u32::from(self.completions.contains(&day)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOfDayBreakdown {
    pub morning: u64,
    pub afternoon: u64,
    pub evening: u64,
    pub night: u64,
}

impl TimeOfDayBreakdown {
    fn record(&mut self, hour: u32) {
        match TimeOfDay::from_hour(hour) {
            TimeOfDay::Morning => self.morning += 1,
            TimeOfDay::Afternoon => self.afternoon += 1,
            TimeOfDay::Evening => self.evening += 1,
            TimeOfDay::Night => self.night += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayTally {
    #[serde(serialize_with = "serialize_weekday")]
    pub day: Weekday,
    pub due: u64,
    pub completed: u64,
}

impl WeekdayTally {
    fn empty(day: Weekday) -> Self {
        Self {
            day,
            due: 0,
            completed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayReport {
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_weekday")]
    pub weekday: Weekday,
    pub due: u32,
    pub completed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub weekly_completion: f64,
    #[serde(serialize_with = "serialize_opt_weekday")]
    pub best_day: Option<Weekday>,
    #[serde(serialize_with = "serialize_opt_weekday")]
    pub worst_day: Option<Weekday>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_completed: u64,
    pub time_of_day: TimeOfDayBreakdown,
    pub weekdays: Vec<WeekdayTally>,
}

/// Per-day due/completed counts for the `days` days ending at `today`,
/// oldest first.
pub fn daily_breakdown(histories: &[HabitHistory], today: NaiveDate, days: u32) -> Vec<DayReport> {
    let first = today - Duration::days(i64::from(days.saturating_sub(1)));
    first
        .iter_days()
        .take_while(|d| *d <= today)
        .map(|date| {
            let (due, completed) = histories
                .iter()
                .map(|h| h.tally_on(date))
                .fold((0, 0), |(d, c), (hd, hc)| (d + hd, c + hc));
            DayReport {
                date,
                weekday: date.weekday(),
                due,
                completed,
            }
        })
        .collect()
}

/// Completed due-instances over due-instances in the window, as a
/// percentage rounded to one decimal. Zero when nothing was due.
pub fn window_completion(histories: &[HabitHistory], today: NaiveDate, days: u32) -> f64 {
    let (due, completed) = daily_breakdown(histories, today, days)
        .iter()
        .fold((0u64, 0u64), |(d, c), r| {
            (d + u64::from(r.due), c + u64::from(r.completed))
        });
    percentage(completed, due)
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let pct = part as f64 / whole as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// All-history due/completed counts per weekday, Sunday first.
pub fn weekday_tallies(histories: &[HabitHistory], today: NaiveDate) -> Vec<WeekdayTally> {
    let mut tallies: Vec<WeekdayTally> = WEEK_SUNDAY_FIRST
        .iter()
        .map(|d| WeekdayTally::empty(*d))
        .collect();

    for history in histories {
        if history.schedule.is_never_due() {
            continue;
        }
        for day in history.start().iter_days().take_while(|d| *d <= today) {
            let (due, completed) = history.tally_on(day);
            let slot = &mut tallies[day.weekday().num_days_from_sunday() as usize];
            slot.due += u64::from(due);
            slot.completed += u64::from(completed);
        }
    }
    tallies
}

/// Highest and lowest completion ratio among weekdays that had at least one
/// due-instance. Ties go to the earliest weekday, Sunday first.
pub fn best_and_worst(tallies: &[WeekdayTally]) -> (Option<Weekday>, Option<Weekday>) {
    let mut best: Option<&WeekdayTally> = None;
    let mut worst: Option<&WeekdayTally> = None;

    for tally in tallies.iter().filter(|t| t.due > 0) {
        if best.map_or(true, |b| ratio_cmp(tally, b).is_gt()) {
            best = Some(tally);
        }
        if worst.map_or(true, |w| ratio_cmp(tally, w).is_lt()) {
            worst = Some(tally);
        }
    }

    (best.map(|t| t.day), worst.map(|t| t.day))
}

// Exact comparison of completed/due without going through floats.
fn ratio_cmp(a: &WeekdayTally, b: &WeekdayTally) -> std::cmp::Ordering {
    (u128::from(a.completed) * u128::from(b.due)).cmp(&(u128::from(b.completed) * u128::from(a.due)))
}

/// Full analytics rollup for one owner as of `today`.
pub fn analyze(histories: &[HabitHistory], today: NaiveDate) -> AnalyticsReport {
    let weekdays = weekday_tallies(histories, today);
    let (best_day, worst_day) = best_and_worst(&weekdays);
    let streaks = StreakState::rollup(histories.iter().map(|h| h.streak(today)));

    let mut time_of_day = TimeOfDayBreakdown::default();
    let mut total_completed = 0u64;
    for history in histories {
        total_completed += history.completions.len() as u64;
        for hour in &history.completion_hours {
            time_of_day.record(*hour);
        }
    }

    AnalyticsReport {
        weekly_completion: window_completion(histories, today, WEEKLY_WINDOW_DAYS),
        best_day,
        worst_day,
        current_streak: streaks.current_streak,
        longest_streak: streaks.longest_streak,
        total_completed,
        time_of_day,
        weekdays,
    }
}

fn serialize_weekday<S>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(weekday_name(*day))
}

fn serialize_opt_weekday<S>(day: &Option<Weekday>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match day {
        Some(d) => serializer.serialize_some(weekday_name(*d)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(day: NaiveDate, hour: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(&day.and_hms_opt(hour, 0, 0).unwrap())
    }

    fn history(schedule: WeeklySchedule, created: NaiveDate, done: &[(NaiveDate, u32)]) -> HabitHistory {
        HabitHistory::from_events(
            schedule,
            at(created, 0),
            done.iter().map(|(d, h)| (*d, at(*d, *h))),
            &OwnerClock::utc(),
        )
    }

    #[test]
    fn test_zero_habits_gives_defaults() {
        let report = analyze(&[], date(2024, 1, 10));
        assert_eq!(report.weekly_completion, 0.0);
        assert_eq!(report.best_day, None);
        assert_eq!(report.worst_day, None);
        assert_eq!(report.current_streak, 0);
        assert_eq!(report.total_completed, 0);
        assert_eq!(report.weekdays.len(), 7);
    }

    #[test]
    fn test_nothing_due_in_window_is_zero_not_nan() {
        let h = history(WeeklySchedule::NEVER, date(2024, 1, 1), &[(date(2024, 1, 2), 9)]);
        let pct = window_completion(&[h], date(2024, 1, 7), 7);
        assert_eq!(pct, 0.0);
        assert!(!pct.is_nan());
    }

    #[test]
    fn test_weekly_completion_counts_due_instances_only() {
        // Every day, created Mon 2024-01-01, today Wed 01-03: 3 due, 2 done.
        let h = history(
            WeeklySchedule::EVERY_DAY,
            date(2024, 1, 1),
            &[(date(2024, 1, 1), 8), (date(2024, 1, 3), 8)],
        );
        assert_eq!(window_completion(&[h], date(2024, 1, 3), 7), 66.7);
    }

    #[test]
    fn test_days_before_history_start_are_not_due() {
        let h = history(WeeklySchedule::EVERY_DAY, date(2024, 1, 5), &[(date(2024, 1, 5), 8)]);
        let days = daily_breakdown(&[h], date(2024, 1, 7), 7);
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].date, date(2024, 1, 1));
        assert_eq!(days[0].due, 0);
        assert_eq!(days[4].due, 1);
        assert_eq!(days[4].completed, 1);
    }

    #[test]
    fn test_best_and_worst_use_ratios_with_sunday_first_ties() {
        let tallies = vec![
            WeekdayTally { day: Weekday::Sun, due: 0, completed: 0 },
            WeekdayTally { day: Weekday::Mon, due: 4, completed: 2 },
            WeekdayTally { day: Weekday::Tue, due: 2, completed: 2 },
            WeekdayTally { day: Weekday::Wed, due: 3, completed: 3 },
            WeekdayTally { day: Weekday::Thu, due: 2, completed: 1 },
            WeekdayTally { day: Weekday::Fri, due: 5, completed: 0 },
            WeekdayTally { day: Weekday::Sat, due: 1, completed: 0 },
        ];
        let (best, worst) = best_and_worst(&tallies);
        assert_eq!(best, Some(Weekday::Tue));
        assert_eq!(worst, Some(Weekday::Fri));
    }

    #[test]
    fn test_best_and_worst_skip_days_never_due() {
        let h = history(
            WeeklySchedule::on(&[Weekday::Mon, Weekday::Wed]),
            date(2024, 1, 1),
            &[(date(2024, 1, 1), 8), (date(2024, 1, 8), 8)],
        );
        let report = analyze(&[h], date(2024, 1, 10));
        assert_eq!(report.best_day, Some(Weekday::Mon));
        assert_eq!(report.worst_day, Some(Weekday::Wed));
    }

    #[test]
    fn test_time_of_day_and_totals() {
        let h = history(
            WeeklySchedule::EVERY_DAY,
            date(2024, 1, 1),
            &[(date(2024, 1, 1), 7), (date(2024, 1, 2), 13), (date(2024, 1, 3), 23)],
        );
        let report = analyze(&[h], date(2024, 1, 3));
        assert_eq!(report.total_completed, 3);
        assert_eq!(report.time_of_day.morning, 1);
        assert_eq!(report.time_of_day.afternoon, 1);
        assert_eq!(report.time_of_day.night, 1);
        assert_eq!(report.current_streak, 3);
    }

    #[test]
    fn test_user_streak_follows_best_habit() {
        let a = history(
            WeeklySchedule::EVERY_DAY,
            date(2024, 1, 1),
            &[(date(2024, 1, 2), 9), (date(2024, 1, 3), 9)],
        );
        let b = history(
            WeeklySchedule::EVERY_DAY,
            date(2024, 1, 1),
            &[(date(2024, 1, 3), 9)],
        );
        let report = analyze(&[a, b], date(2024, 1, 3));
        assert_eq!(report.current_streak, 2);
        assert_eq!(report.longest_streak, 2);
    }

    #[test]
    fn test_serializes_day_names() {
        let report = analyze(&[], date(2024, 1, 3));
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["bestDay"].is_null());
        assert_eq!(json["weekdays"][0]["day"], "Sunday");
        assert_eq!(json["weeklyCompletion"], 0.0);
    }
}
