use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::Result;
use crate::models::Town;

use super::{Repository, fold};

pub trait TownRepository: Repository<Entity = Town, Id = i64> {
    fn find_by_code(&self, code: i64) -> Result<Option<Town>>;
    fn list(&self, limit: usize) -> Result<Vec<Town>>;
    fn count(&self) -> Result<usize>;
}

pub struct SqliteTownRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteTownRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

pub(crate) fn town_from_row(row: &Row<'_>) -> rusqlite::Result<Town> {
    Ok(Town {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        postal_code: row.get(3)?,
    })
}

impl<'a> Repository for SqliteTownRepository<'a> {
    type Entity = Town;
    type Id = i64;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let town = self
            .conn
            .query_row(
                "SELECT id, code, name, postal_code FROM towns WHERE id = ?1",
                params![id],
                town_from_row,
            )
            .optional()?;
        Ok(town)
    }

    /// Upsert keyed on the RUIAN code; returns the row id.
    fn save(&self, town: &Self::Entity) -> Result<i64> {
        let id = self.conn.query_row(
            "INSERT INTO towns (code, name, name_folded, postal_code)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(code) DO UPDATE SET
                name = excluded.name,
                name_folded = excluded.name_folded,
                postal_code = excluded.postal_code
             RETURNING id",
            params![town.code, town.name, fold(&town.name), town.postal_code],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn delete(&self, id: &Self::Id) -> Result<bool> {
        let deleted = self.conn.execute("DELETE FROM towns WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

impl<'a> TownRepository for SqliteTownRepository<'a> {
    fn find_by_code(&self, code: i64) -> Result<Option<Town>> {
        let town = self
            .conn
            .query_row(
                "SELECT id, code, name, postal_code FROM towns WHERE code = ?1",
                params![code],
                town_from_row,
            )
            .optional()?;
        Ok(town)
    }

    fn list(&self, limit: usize) -> Result<Vec<Town>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, code, name, postal_code FROM towns ORDER BY name LIMIT ?1")?;
        let rows = stmt.query_map(params![limit as i64], town_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM towns", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
