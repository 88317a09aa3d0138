use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: u32 = 2;

pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

pub fn create_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

/// `*_folded` columns hold the lowercased name so that case-insensitive
/// matching also covers non-ASCII letters, which SQLite's LIKE does not fold.
pub fn create_registry_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS towns (
            id          INTEGER PRIMARY KEY,
            code        INTEGER UNIQUE NOT NULL,
            name        TEXT NOT NULL,
            name_folded TEXT NOT NULL,
            postal_code TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS streets (
            id          INTEGER PRIMARY KEY,
            name        TEXT UNIQUE NOT NULL,
            name_folded TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS numbers (
            id          INTEGER PRIMARY KEY,
            code        INTEGER UNIQUE NOT NULL,
            name        TEXT NOT NULL,
            name_folded TEXT NOT NULL,
            coord_x     REAL NOT NULL DEFAULT 0.0,
            coord_y     REAL NOT NULL DEFAULT 0.0,
            town_id     INTEGER REFERENCES towns(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS street_towns (
            street_id   INTEGER NOT NULL REFERENCES streets(id) ON DELETE CASCADE,
            town_id     INTEGER NOT NULL REFERENCES towns(id) ON DELETE CASCADE,
            PRIMARY KEY (street_id, town_id)
        );

        CREATE TABLE IF NOT EXISTS street_numbers (
            street_id   INTEGER NOT NULL REFERENCES streets(id) ON DELETE CASCADE,
            number_id   INTEGER NOT NULL REFERENCES numbers(id) ON DELETE CASCADE,
            PRIMARY KEY (street_id, number_id)
        );
        ",
    )?;
    Ok(())
}

pub fn create_registry_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_streets_name_folded ON streets(name_folded);
        CREATE INDEX IF NOT EXISTS idx_towns_name_folded   ON towns(name_folded);
        CREATE INDEX IF NOT EXISTS idx_numbers_town        ON numbers(town_id);
        CREATE INDEX IF NOT EXISTS idx_street_numbers_num  ON street_numbers(number_id);
        ",
    )?;
    Ok(())
}

pub fn create_import_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS import_log (
            id            INTEGER PRIMARY KEY,
            name          TEXT NOT NULL,
            state         TEXT NOT NULL CHECK(state IN ('running', 'done', 'failed')),
            start_date    TEXT NOT NULL,
            end_date      TEXT,
            files         INTEGER NOT NULL DEFAULT 0,
            file_count    INTEGER NOT NULL DEFAULT 0,
            rows          INTEGER NOT NULL DEFAULT 0,
            towns         INTEGER NOT NULL DEFAULT 0,
            streets       INTEGER NOT NULL DEFAULT 0,
            numbers       INTEGER NOT NULL DEFAULT 0,
            warnings      INTEGER NOT NULL DEFAULT 0,
            error_message TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_import_log_start ON import_log(start_date);
        ",
    )?;
    Ok(())
}
