mod connection;
mod error;
mod migrations;
mod schema;

pub use connection::ConnectionPool;
pub use error::DatabaseError;
pub use migrations::{Migration, get_applied_versions, run_migrations};
pub use schema::SCHEMA_VERSION;

use std::path::Path;

use rusqlite::Connection;

use crate::error::{Result, RuianError};
use crate::models::{AddressNumber, ImportLog, Street, Town};

use super::repositories::{
    ImportLogRepository, NumberRepository, Repository, SqliteImportLogRepository,
    SqliteNumberRepository, SqliteStreetRepository, SqliteTownRepository, StreetRepository,
    TownRepository,
};

pub fn open_database(path: &Path) -> Result<ConnectionPool> {
    let pool = ConnectionPool::open(path)?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    Ok(pool)
}

pub fn open_in_memory() -> Result<ConnectionPool> {
    let pool = ConnectionPool::open_in_memory()?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    Ok(pool)
}

/// Registry counts shown by `ruian stats` and `ruian doctor`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RegistryStats {
    pub towns: usize,
    pub streets: usize,
    pub numbers: usize,
}

pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let pool = open_database(path)?;
        Ok(Self { pool })
    }

    pub fn open_in_memory() -> Result<Self> {
        let pool = open_in_memory()?;
        Ok(Self { pool })
    }

    pub fn path(&self) -> Option<&str> {
        self.pool.path()
    }

    /// Run `f` inside a single transaction. Rolled back if `f` fails.
    pub fn transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.pool.get_connection();
        let tx = conn.unchecked_transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    pub fn schema_versions(&self) -> Result<Vec<u32>> {
        let conn = self.pool.get_connection();
        migrations::get_applied_versions(&conn)
    }

    // ─── Towns ─────────────────────────────────────────────

    pub fn save_town(&self, town: &Town) -> Result<i64> {
        let conn = self.pool.get_connection();
        SqliteTownRepository::new(&conn).save(town)
    }

    pub fn get_town(&self, id: i64) -> Result<Town> {
        let conn = self.pool.get_connection();
        SqliteTownRepository::new(&conn)
            .find_by_id(&id)?
            .ok_or(RuianError::TownNotFound(id))
    }

    pub fn list_towns(&self, limit: usize) -> Result<Vec<Town>> {
        let conn = self.pool.get_connection();
        SqliteTownRepository::new(&conn).list(limit)
    }

    // ─── Streets ───────────────────────────────────────────

    pub fn save_street(&self, street: &Street) -> Result<i64> {
        let conn = self.pool.get_connection();
        SqliteStreetRepository::new(&conn).save(street)
    }

    pub fn get_street(&self, id: i64) -> Result<Street> {
        let conn = self.pool.get_connection();
        SqliteStreetRepository::new(&conn)
            .find_by_id(&id)?
            .ok_or(RuianError::StreetNotFound(id))
    }

    pub fn search_streets(&self, query: &str, limit: usize) -> Result<Vec<Street>> {
        let conn = self.pool.get_connection();
        SqliteStreetRepository::new(&conn).search(query, limit)
    }

    pub fn list_streets(&self, limit: usize) -> Result<Vec<Street>> {
        let conn = self.pool.get_connection();
        SqliteStreetRepository::new(&conn).list(limit)
    }

    // ─── Numbers ───────────────────────────────────────────

    pub fn save_number(&self, number: &AddressNumber) -> Result<i64> {
        let conn = self.pool.get_connection();
        SqliteNumberRepository::new(&conn).save(number)
    }

    pub fn numbers_in_street(
        &self,
        street_id: i64,
        terms: &[String],
        limit: usize,
    ) -> Result<Vec<(AddressNumber, Option<Town>)>> {
        let conn = self.pool.get_connection();
        SqliteNumberRepository::new(&conn).in_street(street_id, terms, limit)
    }

    // ─── Import log ────────────────────────────────────────

    pub fn save_import_log(&self, log: &ImportLog) -> Result<i64> {
        let conn = self.pool.get_connection();
        SqliteImportLogRepository::new(&conn).save(log)
    }

    pub fn list_import_logs(&self, limit: usize) -> Result<Vec<ImportLog>> {
        let conn = self.pool.get_connection();
        SqliteImportLogRepository::new(&conn).list(limit)
    }

    pub fn latest_import_log(&self) -> Result<Option<ImportLog>> {
        let conn = self.pool.get_connection();
        SqliteImportLogRepository::new(&conn).latest()
    }

    // ─── Maintenance ───────────────────────────────────────

    pub fn stats(&self) -> Result<RegistryStats> {
        let conn = self.pool.get_connection();
        Ok(RegistryStats {
            towns: SqliteTownRepository::new(&conn).count()?,
            streets: SqliteStreetRepository::new(&conn).count()?,
            numbers: SqliteNumberRepository::new(&conn).count()?,
        })
    }

    /// Remove all registry data. Import logs are kept.
    pub fn clear_registry(&self) -> Result<()> {
        self.transaction(|conn| {
            conn.execute_batch(
                "
                DELETE FROM street_numbers;
                DELETE FROM street_towns;
                DELETE FROM numbers;
                DELETE FROM streets;
                DELETE FROM towns;
                ",
            )?;
            Ok(())
        })?;
        tracing::info!("registry data cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_runs_migrations() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_versions().unwrap(), vec![1, SCHEMA_VERSION]);
        assert_eq!(db.stats().unwrap(), RegistryStats::default());
    }

    #[test]
    fn test_open_file_twice_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ruian.db");
        {
            let db = Database::open(&path).unwrap();
            db.save_street(&Street::new("Hlavní")).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.stats().unwrap().streets, 1);
        assert_eq!(db.schema_versions().unwrap().len(), 2);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<()> = db.transaction(|conn| {
            SqliteStreetRepository::new(conn).save(&Street::new("Ztracená"))?;
            Err(RuianError::ValidationError("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(db.stats().unwrap().streets, 0);
    }

    #[test]
    fn test_clear_registry_keeps_logs() {
        let db = Database::open_in_memory().unwrap();
        let town = db.save_town(&Town::new(1, "Lhota", "53701")).unwrap();
        let mut number = AddressNumber::new(5, "1");
        number.town_id = Some(town);
        db.save_number(&number).unwrap();
        db.save_import_log(&ImportLog::start("x")).unwrap();

        db.clear_registry().unwrap();
        assert_eq!(db.stats().unwrap(), RegistryStats::default());
        assert_eq!(db.list_import_logs(10).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_street_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.get_street(99), Err(RuianError::StreetNotFound(99))));
    }
}
