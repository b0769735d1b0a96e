//! CRUD operations for [`User`] records.

use rusqlite::{params, ErrorCode, OptionalExtension};
use uuid::Uuid;

use crate::database::{fmt_timestamp, timestamp_at, uuid_at, Database};
use crate::error::{Result, StoreError};
use crate::models::User;

const USER_COLUMNS: &str = "id, name, email, password_hash, utc_offset_minutes, created_at";

impl Database {
    /// Insert a new user. Fails with [`StoreError::Conflict`] when the email
    /// is already registered.
    pub fn create_user(&self, user: &User) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, name, email, password_hash, utc_offset_minutes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.id.to_string(),
                    user.name,
                    user.email.to_lowercase(),
                    user.password_hash,
                    user.utc_offset_minutes,
                    fmt_timestamp(&user.created_at),
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    StoreError::Conflict("email already registered".into())
                }
                other => StoreError::Sqlite(other),
            })?;
        Ok(())
    }

    pub fn get_user(&self, id: Uuid) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .map_err(StoreError::from_query)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email.trim().to_lowercase()],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    /// Update the mutable profile fields.
    pub fn update_user_profile(&self, user: &User) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET name = ?1, utc_offset_minutes = ?2 WHERE id = ?3",
            params![user.name, user.utc_offset_minutes, user.id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        utc_offset_minutes: row.get(4)?,
        created_at: timestamp_at(row, 5)?,
    })
}
