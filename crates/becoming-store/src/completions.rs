//! The completion ledger.
//!
//! A completion is a set-membership fact keyed by `(habit_id, date)`; the
//! primary key makes a second insert for the same day a no-op rather than a
//! duplicate.

use chrono::NaiveDate;
use rusqlite::params;
use uuid::Uuid;

use crate::database::{date_at, fmt_date, fmt_timestamp, timestamp_at, uuid_at, Database};
use crate::error::Result;
use crate::models::CompletionEvent;

impl Database {
    /// Record a completion. Returns `true` if a new row was written, `false`
    /// if the day was already complete.
    pub fn insert_completion(&self, event: &CompletionEvent) -> Result<bool> {
        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO completions (habit_id, date, completed_at)
             VALUES (?1, ?2, ?3)",
            params![
                event.habit_id.to_string(),
                fmt_date(&event.date),
                fmt_timestamp(&event.completed_at),
            ],
        )?;
        Ok(affected > 0)
    }

    /// Remove a completion. Returns `true` if a row was deleted.
    pub fn delete_completion(&self, habit_id: Uuid, date: NaiveDate) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM completions WHERE habit_id = ?1 AND date = ?2",
            params![habit_id.to_string(), fmt_date(&date)],
        )?;
        Ok(affected > 0)
    }

    pub fn is_completed(&self, habit_id: Uuid, date: NaiveDate) -> Result<bool> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM completions WHERE habit_id = ?1 AND date = ?2)",
            params![habit_id.to_string(), fmt_date(&date)],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// A habit's ledger, oldest day first.
    pub fn completions_for_habit(&self, habit_id: Uuid) -> Result<Vec<CompletionEvent>> {
        let mut stmt = self.conn().prepare(
            "SELECT habit_id, date, completed_at
             FROM completions
             WHERE habit_id = ?1
             ORDER BY date ASC",
        )?;
        let rows = stmt.query_map(params![habit_id.to_string()], row_to_event)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    /// Every completion across an owner's habits, grouped by habit and
    /// ordered by day.
    pub fn completions_for_owner(&self, owner_id: Uuid) -> Result<Vec<CompletionEvent>> {
        let mut stmt = self.conn().prepare(
            "SELECT c.habit_id, c.date, c.completed_at
             FROM completions c
             JOIN habits h ON h.id = c.habit_id
             WHERE h.owner_id = ?1
             ORDER BY c.habit_id ASC, c.date ASC",
        )?;
        let rows = stmt.query_map(params![owner_id.to_string()], row_to_event)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    /// Lifetime number of completion events across an owner's habits.
    pub fn count_completions_for_owner(&self, owner_id: Uuid) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*)
             FROM completions c
             JOIN habits h ON h.id = c.habit_id
             WHERE h.owner_id = ?1",
            params![owner_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<CompletionEvent> {
    Ok(CompletionEvent {
        habit_id: uuid_at(row, 0)?,
        date: date_at(row, 1)?,
        completed_at: timestamp_at(row, 2)?,
    })
}
