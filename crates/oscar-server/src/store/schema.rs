//! SQLite schema for the feedbag store.

/// Applied on every open; `IF NOT EXISTS` keeps reopens idempotent.
pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS user (
    screen_name TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS feedbag (
    screen_name   TEXT    NOT NULL,
    group_id      INTEGER NOT NULL,
    item_id       INTEGER NOT NULL,
    class_id      INTEGER NOT NULL,
    name          TEXT    NOT NULL,
    attributes    BLOB,
    last_modified INTEGER NOT NULL,
    UNIQUE (screen_name, group_id, item_id)
);

CREATE INDEX IF NOT EXISTS feedbag_name_class ON feedbag (name, class_id);

CREATE TABLE IF NOT EXISTS profile (
    screen_name TEXT PRIMARY KEY,
    body        TEXT NOT NULL
);
";
