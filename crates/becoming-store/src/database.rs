//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`]. [`Database::open_at`]
//! guarantees that migrations have run; the server calls it once at startup
//! and afterwards opens short-lived handles with [`Database::connect`], one
//! per store operation, so that readers proceed concurrently under WAL.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Connection;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::migrations;

/// How long a writer waits for SQLite's write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at an explicit path and bring its schema
    /// up to date.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "opening database");

        let db = Self::connect(path)?;
        migrations::run_migrations(&db.conn)?;
        Ok(db)
    }

    /// Open a connection to an already-migrated database.
    pub fn connect(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }

    /// Run `f` inside an immediate (write-locking) transaction. Commits on
    /// `Ok`, rolls back on `Err`.
    ///
    /// The closure may fail with any error that a [`StoreError`] converts
    /// into, so callers can abort a transaction with their own error type.
    pub fn write<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Self) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        self.in_transaction("BEGIN IMMEDIATE", f)
    }

    /// Run `f` inside a deferred transaction so that every query it makes
    /// sees the same snapshot.
    pub fn read<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Self) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        self.in_transaction("BEGIN DEFERRED", f)
    }

    fn in_transaction<T, E, F>(&self, begin: &str, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Self) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        self.conn.execute_batch(begin).map_err(StoreError::from)?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT").map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Column encoding helpers shared by the CRUD modules
// ---------------------------------------------------------------------------

/// Fixed-precision RFC 3339 so that lexical order equals time order.
pub(crate) fn fmt_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn fmt_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn conversion<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

pub(crate) fn uuid_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion(idx, e))
}

pub(crate) fn timestamp_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion(idx, e))
}

pub(crate) fn date_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion(idx, e))
}

pub(crate) fn parsed_at<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion(idx, e))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::{Habit, User};
    use becoming_shared::types::{Difficulty, ReminderTime};
    use becoming_shared::WeeklySchedule;
    use chrono::TimeZone;

    pub fn temp_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).expect("should open");
        (db, dir)
    }

    pub fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn user(db: &Database, email: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: email.into(),
            password_hash: "$argon2id$placeholder".into(),
            utc_offset_minutes: None,
            created_at: ts(2024, 1, 1, 8),
        };
        db.create_user(&user).unwrap();
        user
    }

    pub fn habit(db: &Database, owner: &User, name: &str) -> Habit {
        let habit = Habit {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            name: name.into(),
            identity: "Learner".into(),
            difficulty: Difficulty::Medium,
            reminder_time: "09:00".parse::<ReminderTime>().unwrap(),
            weekly_schedule: WeeklySchedule::EVERY_DAY,
            created_at: ts(2024, 1, 1, 9),
        };
        db.create_habit(&habit).unwrap();
        habit
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_open_round_trip() {
        let (db, _dir) = temp_db();
        assert!(db.path().is_some());
    }

    #[test]
    fn test_reopening_does_not_rerun_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("again.db");
        drop(Database::open_at(&path).unwrap());
        let db = Database::open_at(&path).unwrap();
        let version: u32 = db
            .conn()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, migrations::CURRENT_VERSION);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let (db, _dir) = temp_db();
        let result: Result<()> = db.write(|db| {
            user(db, "a@example.com");
            Err(StoreError::Integrity("boom".into()))
        });
        assert!(result.is_err());
        assert!(db.find_user_by_email("a@example.com").unwrap().is_none());
    }

    #[test]
    fn test_timestamps_sort_lexically() {
        let a = fmt_timestamp(&ts(2024, 1, 1, 9));
        let b = fmt_timestamp(&(ts(2024, 1, 1, 9) + chrono::Duration::microseconds(1500)));
        assert!(a < b);
        assert_eq!(a.len(), b.len());
    }
}
