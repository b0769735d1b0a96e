use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS boosts (
    id            TEXT PRIMARY KEY NOT NULL,        -- UUID v4
    from_owner_id TEXT NOT NULL,                    -- never returned to recipients
    to_owner_id   TEXT NOT NULL,
    identity_tag  TEXT NOT NULL,
    sent_at       TEXT NOT NULL,                    -- RFC-3339

    FOREIGN KEY (from_owner_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (to_owner_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_boosts_recipient ON boosts(to_owner_id, sent_at DESC);

CREATE TABLE IF NOT EXISTS reflections (
    id         TEXT PRIMARY KEY NOT NULL,           -- UUID v4
    owner_id   TEXT NOT NULL,
    content    TEXT NOT NULL,
    mood       TEXT,                                -- great | okay | struggling
    created_at TEXT NOT NULL,

    FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_reflections_owner ON reflections(owner_id, created_at DESC);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
