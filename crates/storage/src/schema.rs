use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, unixepoch())",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS layer_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    read_only INTEGER NOT NULL DEFAULT 0
);
INSERT OR IGNORE INTO layer_state (id, read_only) VALUES (1, 0);

CREATE TABLE IF NOT EXISTS entities (
    entity_id BLOB PRIMARY KEY CHECK (length(entity_id) = 16),
    path TEXT NOT NULL UNIQUE,
    instance_proxy INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS attributes (
    entity_id BLOB NOT NULL REFERENCES entities (entity_id),
    name TEXT NOT NULL,
    value_type TEXT NOT NULL,
    locked INTEGER NOT NULL DEFAULT 0,
    default_value BLOB,
    PRIMARY KEY (entity_id, name)
);

CREATE TABLE IF NOT EXISTS time_samples (
    entity_id BLOB NOT NULL,
    name TEXT NOT NULL,
    time REAL NOT NULL,
    value BLOB NOT NULL,
    PRIMARY KEY (entity_id, name, time),
    FOREIGN KEY (entity_id, name) REFERENCES attributes (entity_id, name) ON DELETE CASCADE
);
";
