//! v001 -- Initial schema creation.
//!
//! Creates the two cache tables: `session` and `app_settings`. Both are
//! single-row tables keyed to id 1.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Cached sign-in session
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS session (
    id           INTEGER PRIMARY KEY CHECK (id = 1),
    user_id      TEXT NOT NULL,
    email        TEXT NOT NULL,
    display_name TEXT,
    signed_in_at TEXT NOT NULL                -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Local app settings (single JSON blob)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS app_settings (
    id   INTEGER PRIMARY KEY CHECK (id = 1),
    json TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
