//! Weekly schedule evaluation.
//!
//! A habit is "due" on a calendar day when its weekly schedule marks that
//! day of the week as active. The schedule is indexed Sunday = 0 through
//! Saturday = 6. Callers are responsible for producing the calendar day in
//! the owner's timezone (see [`crate::clock::OwnerClock`]).

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Seven flags, Sunday first. Always exactly seven entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<bool>", into = "Vec<bool>")]
pub struct WeeklySchedule([bool; 7]);

impl WeeklySchedule {
    pub const EVERY_DAY: WeeklySchedule = WeeklySchedule([true; 7]);
    pub const NEVER: WeeklySchedule = WeeklySchedule([false; 7]);

    pub fn new(days: [bool; 7]) -> Self {
        Self(days)
    }

    /// Build a schedule from the set of weekdays it is active on.
    pub fn on(days: &[Weekday]) -> Self {
        let mut flags = [false; 7];
        for day in days {
            flags[day.num_days_from_sunday() as usize] = true;
        }
        Self(flags)
    }

    pub fn is_due_on(&self, weekday: Weekday) -> bool {
        self.0[weekday.num_days_from_sunday() as usize]
    }

    /// Whether the habit is due on `date`.
    pub fn is_due(&self, date: NaiveDate) -> bool {
        self.is_due_on(date.weekday())
    }

    /// An all-false schedule is legal; it is simply never due.
    pub fn is_never_due(&self) -> bool {
        self.0.iter().all(|d| !d)
    }

    /// Compact storage form: seven `0`/`1` characters, Sunday first.
    pub fn to_mask(&self) -> String {
        self.0.iter().map(|d| if *d { '1' } else { '0' }).collect()
    }

    /// Parse the storage form written by [`WeeklySchedule::to_mask`].
    pub fn from_mask(mask: &str) -> Result<Self, ScheduleError> {
        if mask.chars().count() != 7 {
            return Err(ScheduleError::InvalidMask(mask.to_string()));
        }
        let mut flags = [false; 7];
        for (i, c) in mask.chars().enumerate() {
            flags[i] = match c {
                '1' => true,
                '0' => false,
                _ => return Err(ScheduleError::InvalidMask(mask.to_string())),
            };
        }
        Ok(Self(flags))
    }
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self::EVERY_DAY
    }
}

impl TryFrom<Vec<bool>> for WeeklySchedule {
    type Error = ScheduleError;

    fn try_from(value: Vec<bool>) -> Result<Self, Self::Error> {
        let len = value.len();
        let flags: [bool; 7] = value
            .try_into()
            .map_err(|_| ScheduleError::WrongLength(len))?;
        Ok(Self(flags))
    }
}

impl From<WeeklySchedule> for Vec<bool> {
    fn from(value: WeeklySchedule) -> Self {
        value.0.to_vec()
    }
}
