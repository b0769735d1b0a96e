//! Owner-local calendar arithmetic.
//!
//! Every "today" and every completion date is expressed in the owner's
//! configured UTC offset so that the due boundary of a habit never moves in
//! the middle of the owner's local day. Owners without a configured offset
//! are treated as UTC.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Timelike, Utc};

use crate::constants::MAX_UTC_OFFSET_MINUTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerClock {
    offset: FixedOffset,
}

impl OwnerClock {
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Clock for an owner's stored offset. Missing or out-of-range offsets
    /// fall back to UTC.
    pub fn from_offset_minutes(minutes: Option<i32>) -> Self {
        minutes
            .filter(|m| is_valid_offset(*m))
            .and_then(|m| FixedOffset::east_opt(m * 60))
            .map(|offset| Self { offset })
            .unwrap_or_else(Self::utc)
    }

    /// The owner's calendar day at instant `now`.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_date(now)
    }

    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    pub fn local_hour(&self, at: DateTime<Utc>) -> u32 {
        at.with_timezone(&self.offset).hour()
    }
}

impl Default for OwnerClock {
    fn default() -> Self {
        Self::utc()
    }
}

pub fn is_valid_offset(minutes: i32) -> bool {
    (-MAX_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&minutes)
}

/// Human-friendly elapsed time, e.g. `"just now"`, `"5m ago"`, `"3d ago"`.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    if elapsed < Duration::minutes(1) {
        "just now".to_string()
    } else if elapsed < Duration::hours(1) {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed < Duration::days(1) {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed < Duration::weeks(5) {
        format!("{}d ago", elapsed.num_days())
    } else {
        format!("{}w ago", elapsed.num_weeks())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_today_respects_offset() {
        // 2024-01-05 03:30 UTC is still Thursday evening in UTC-5.
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 3, 30, 0).unwrap();
        let new_york = OwnerClock::from_offset_minutes(Some(-5 * 60));
        assert_eq!(new_york.today(now), NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert_eq!(OwnerClock::utc().today(now), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(new_york.local_hour(now), 22);
    }

    #[test]
    fn test_missing_or_invalid_offset_falls_back_to_utc() {
        assert_eq!(OwnerClock::from_offset_minutes(None), OwnerClock::utc());
        assert_eq!(OwnerClock::from_offset_minutes(Some(20 * 60)), OwnerClock::utc());
        let kolkata = OwnerClock::from_offset_minutes(Some(330));
        let now = Utc.with_ymd_and_hms(2024, 1, 4, 18, 45, 0).unwrap();
        assert_eq!(kolkata.today(now), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn test_time_ago_formatting() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(time_ago(now - Duration::seconds(10), now), "just now");
        assert_eq!(time_ago(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(time_ago(now - Duration::hours(3), now), "3h ago");
        assert_eq!(time_ago(now - Duration::days(2), now), "2d ago");
        assert_eq!(time_ago(now - Duration::days(70), now), "10w ago");
    }
}
