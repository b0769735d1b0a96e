//! CRUD operations for [`Habit`] records.
//!
//! Every read and write is scoped to an owner: a habit that exists but
//! belongs to someone else is reported as [`StoreError::NotFound`].

use becoming_shared::WeeklySchedule;
use rusqlite::params;
use uuid::Uuid;

use crate::database::{fmt_timestamp, parsed_at, timestamp_at, uuid_at, Database};
use crate::error::{Result, StoreError};
use crate::models::Habit;

const HABIT_COLUMNS: &str =
    "id, owner_id, name, identity, difficulty, reminder_time, weekly_schedule, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    pub fn create_habit(&self, habit: &Habit) -> Result<()> {
        self.conn().execute(
            "INSERT INTO habits (id, owner_id, name, identity, difficulty, reminder_time, weekly_schedule, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                habit.id.to_string(),
                habit.owner_id.to_string(),
                habit.name,
                habit.identity,
                habit.difficulty.as_str(),
                habit.reminder_time.to_string(),
                habit.weekly_schedule.to_mask(),
                fmt_timestamp(&habit.created_at),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a habit owned by `owner_id`.
    pub fn get_habit_for_owner(&self, id: Uuid, owner_id: Uuid) -> Result<Habit> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1 AND owner_id = ?2"),
                params![id.to_string(), owner_id.to_string()],
                read_habit_row,
            )
            .map_err(StoreError::from_query)?;
        row.into_habit()
    }

    /// All of an owner's habits, oldest first.
    pub fn list_habits_for_owner(&self, owner_id: Uuid) -> Result<Vec<Habit>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {HABIT_COLUMNS} FROM habits WHERE owner_id = ?1 ORDER BY created_at ASC, id ASC"
        ))?;

        let rows = stmt.query_map(params![owner_id.to_string()], read_habit_row)?;

        let mut habits = Vec::new();
        for row in rows {
            habits.push(row?.into_habit()?);
        }
        Ok(habits)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite the mutable fields of an existing habit.
    pub fn update_habit(&self, habit: &Habit) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE habits
             SET name = ?1, identity = ?2, difficulty = ?3, reminder_time = ?4, weekly_schedule = ?5
             WHERE id = ?6 AND owner_id = ?7",
            params![
                habit.name,
                habit.identity,
                habit.difficulty.as_str(),
                habit.reminder_time.to_string(),
                habit.weekly_schedule.to_mask(),
                habit.id.to_string(),
                habit.owner_id.to_string(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Hard-delete a habit. ON DELETE CASCADE removes its completion
    /// events. Returns `true` if a row was deleted.
    pub fn delete_habit_for_owner(&self, id: Uuid, owner_id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM habits WHERE id = ?1 AND owner_id = ?2",
            params![id.to_string(), owner_id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A habit row before its schedule mask has been checked.
struct HabitRow {
    habit: Habit,
    mask: String,
}

impl HabitRow {
    /// A stored schedule that is not seven flags is an integrity fault and
    /// is reported upward rather than defaulted.
    fn into_habit(self) -> Result<Habit> {
        let schedule = WeeklySchedule::from_mask(&self.mask).map_err(|e| {
            StoreError::Integrity(format!("habit {}: {e}", self.habit.id))
        })?;
        Ok(Habit {
            weekly_schedule: schedule,
            ..self.habit
        })
    }
}

fn read_habit_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HabitRow> {
    Ok(HabitRow {
        habit: Habit {
            id: uuid_at(row, 0)?,
            owner_id: uuid_at(row, 1)?,
            name: row.get(2)?,
            identity: row.get(3)?,
            difficulty: parsed_at(row, 4)?,
            reminder_time: parsed_at(row, 5)?,
            weekly_schedule: WeeklySchedule::NEVER,
            created_at: timestamp_at(row, 7)?,
        },
        mask: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::*;
    use becoming_shared::types::Difficulty;
    use chrono::Weekday;

    #[test]
    fn test_create_and_get_scoped_to_owner() {
        let (db, _dir) = temp_db();
        let alice = user(&db, "alice@example.com");
        let bob = user(&db, "bob@example.com");
        let h = habit(&db, &alice, "Read");

        assert_eq!(db.get_habit_for_owner(h.id, alice.id).unwrap(), h);
        assert!(matches!(
            db.get_habit_for_owner(h.id, bob.id),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_update_changes_fields() {
        let (db, _dir) = temp_db();
        let alice = user(&db, "alice@example.com");
        let mut h = habit(&db, &alice, "Read");
        h.name = "Read 30 minutes".into();
        h.difficulty = Difficulty::Hard;
        h.weekly_schedule = WeeklySchedule::on(&[Weekday::Mon, Weekday::Fri]);
        db.update_habit(&h).unwrap();
        assert_eq!(db.get_habit_for_owner(h.id, alice.id).unwrap(), h);
    }

    #[test]
    fn test_list_is_owner_scoped_and_ordered() {
        let (db, _dir) = temp_db();
        let alice = user(&db, "alice@example.com");
        let bob = user(&db, "bob@example.com");
        let first = habit(&db, &alice, "First");
        let mut second = first.clone();
        second.id = Uuid::new_v4();
        second.name = "Second".into();
        second.created_at = first.created_at + chrono::Duration::minutes(1);
        db.create_habit(&second).unwrap();
        habit(&db, &bob, "Other");

        let names: Vec<_> = db
            .list_habits_for_owner(alice.id)
            .unwrap()
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn test_corrupt_schedule_is_an_integrity_error() {
        let (db, _dir) = temp_db();
        let alice = user(&db, "alice@example.com");
        let h = habit(&db, &alice, "Read");
        db.conn()
            .execute(
                "UPDATE habits SET weekly_schedule = '101' WHERE id = ?1",
                params![h.id.to_string()],
            )
            .unwrap();
        assert!(matches!(
            db.get_habit_for_owner(h.id, alice.id),
            Err(StoreError::Integrity(_))
        ));
    }

    #[test]
    fn test_delete_only_by_owner() {
        let (db, _dir) = temp_db();
        let alice = user(&db, "alice@example.com");
        let bob = user(&db, "bob@example.com");
        let h = habit(&db, &alice, "Read");
        assert!(!db.delete_habit_for_owner(h.id, bob.id).unwrap());
        assert!(db.delete_habit_for_owner(h.id, alice.id).unwrap());
        assert!(!db.delete_habit_for_owner(h.id, alice.id).unwrap());
    }
}
