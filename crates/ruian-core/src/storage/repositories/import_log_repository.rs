use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::Result;
use crate::models::{ImportLog, ImportState};

use super::Repository;

pub trait ImportLogRepository: Repository<Entity = ImportLog, Id = i64> {
    /// Most recent runs first.
    fn list(&self, limit: usize) -> Result<Vec<ImportLog>>;
    fn latest(&self) -> Result<Option<ImportLog>>;
}

pub struct SqliteImportLogRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteImportLogRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

const LOG_COLUMNS: &str = "id, name, state, start_date, end_date, files, file_count, rows, \
                           towns, streets, numbers, warnings, error_message";

fn parse_time(raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<ImportLog> {
    let end_date = match row.get::<_, Option<String>>(4)? {
        Some(raw) => Some(parse_time(raw)?),
        None => None,
    };
    Ok(ImportLog {
        id: row.get(0)?,
        name: row.get(1)?,
        state: ImportState::parse(&row.get::<_, String>(2)?),
        start_date: parse_time(row.get(3)?)?,
        end_date,
        files: row.get(5)?,
        file_count: row.get(6)?,
        rows: row.get::<_, i64>(7)? as u64,
        towns: row.get::<_, i64>(8)? as u64,
        streets: row.get::<_, i64>(9)? as u64,
        numbers: row.get::<_, i64>(10)? as u64,
        warnings: row.get::<_, i64>(11)? as u64,
        error_message: row.get(12)?,
    })
}

impl<'a> Repository for SqliteImportLogRepository<'a> {
    type Entity = ImportLog;
    type Id = i64;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let log = self
            .conn
            .query_row(
                &format!("SELECT {LOG_COLUMNS} FROM import_log WHERE id = ?1"),
                params![id],
                log_from_row,
            )
            .optional()?;
        Ok(log)
    }

    /// Inserts when `id == 0`, updates otherwise. Returns the row id.
    fn save(&self, log: &Self::Entity) -> Result<i64> {
        let end_date = log.end_date.map(|d| d.to_rfc3339());
        if log.id == 0 {
            self.conn.execute(
                "INSERT INTO import_log (name, state, start_date, end_date, files, file_count,
                                         rows, towns, streets, numbers, warnings, error_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    log.name,
                    log.state.as_str(),
                    log.start_date.to_rfc3339(),
                    end_date,
                    log.files,
                    log.file_count,
                    log.rows as i64,
                    log.towns as i64,
                    log.streets as i64,
                    log.numbers as i64,
                    log.warnings as i64,
                    log.error_message,
                ],
            )?;
            return Ok(self.conn.last_insert_rowid());
        }

        self.conn.execute(
            "UPDATE import_log SET name = ?2, state = ?3, start_date = ?4, end_date = ?5,
                    files = ?6, file_count = ?7, rows = ?8, towns = ?9, streets = ?10,
                    numbers = ?11, warnings = ?12, error_message = ?13
             WHERE id = ?1",
            params![
                log.id,
                log.name,
                log.state.as_str(),
                log.start_date.to_rfc3339(),
                end_date,
                log.files,
                log.file_count,
                log.rows as i64,
                log.towns as i64,
                log.streets as i64,
                log.numbers as i64,
                log.warnings as i64,
                log.error_message,
            ],
        )?;
        Ok(log.id)
    }

    fn delete(&self, id: &Self::Id) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM import_log WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

impl<'a> ImportLogRepository for SqliteImportLogRepository<'a> {
    fn list(&self, limit: usize) -> Result<Vec<ImportLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM import_log ORDER BY start_date DESC, id DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], log_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn latest(&self) -> Result<Option<ImportLog>> {
        Ok(self.list(1)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::open_in_memory;

    #[test]
    fn test_insert_then_update() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get_connection();
        let repo = SqliteImportLogRepository::new(&conn);

        let mut log = ImportLog::start("20250131");
        log.id = repo.save(&log).unwrap();
        assert!(log.id > 0);

        log.state = ImportState::Done;
        log.rows = 42;
        log.end_date = Some(Utc::now());
        assert_eq!(repo.save(&log).unwrap(), log.id);

        let loaded = repo.latest().unwrap().unwrap();
        assert_eq!(loaded.state, ImportState::Done);
        assert_eq!(loaded.rows, 42);
        assert!(loaded.end_date.is_some());
    }

    #[test]
    fn test_list_newest_first() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get_connection();
        let repo = SqliteImportLogRepository::new(&conn);

        let mut older = ImportLog::start("a");
        older.start_date = older.start_date - chrono::Duration::days(1);
        repo.save(&older).unwrap();
        repo.save(&ImportLog::start("b")).unwrap();

        let names: Vec<_> = repo.list(10).unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
