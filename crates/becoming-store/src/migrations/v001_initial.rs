//! v001 -- Initial schema creation.
//!
//! Creates the core tables: `users`, `habits`, `completions`, and
//! `identity_selections`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id                 TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    name               TEXT NOT NULL,
    email              TEXT NOT NULL,               -- stored lower-cased
    password_hash      TEXT NOT NULL,               -- Argon2id PHC string
    utc_offset_minutes INTEGER,                     -- NULL = UTC
    created_at         TEXT NOT NULL                -- RFC-3339
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email);

-- ----------------------------------------------------------------
-- Habits
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS habits (
    id              TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    owner_id        TEXT NOT NULL,                  -- FK -> users(id)
    name            TEXT NOT NULL,
    identity        TEXT NOT NULL,
    difficulty      TEXT NOT NULL,                  -- easy | medium | hard
    reminder_time   TEXT NOT NULL,                  -- HH:MM
    weekly_schedule TEXT NOT NULL,                  -- 7 x '0'/'1', Sunday first
    created_at      TEXT NOT NULL,

    FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_habits_owner ON habits(owner_id, created_at);

-- ----------------------------------------------------------------
-- Completion ledger: one row per (habit, owner-local day)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS completions (
    habit_id     TEXT NOT NULL,                     -- FK -> habits(id)
    date         TEXT NOT NULL,                     -- YYYY-MM-DD
    completed_at TEXT NOT NULL,                     -- RFC-3339

    PRIMARY KEY (habit_id, date),
    FOREIGN KEY (habit_id) REFERENCES habits(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Identity selection: at most one row per user
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS identity_selections (
    owner_id           TEXT PRIMARY KEY NOT NULL,   -- FK -> users(id)
    primary_identity   TEXT NOT NULL,
    secondary_identity TEXT,
    updated_at         TEXT NOT NULL,

    FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE,
    CHECK (secondary_identity IS NULL OR secondary_identity <> primary_identity)
);

CREATE INDEX IF NOT EXISTS idx_identity_primary ON identity_selections(primary_identity);
CREATE INDEX IF NOT EXISTS idx_identity_secondary ON identity_selections(secondary_identity);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
