use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;
use crate::models::Street;

use super::{Repository, contains_pattern, fold};

pub trait StreetRepository: Repository<Entity = Street, Id = i64> {
    fn find_by_name(&self, name: &str) -> Result<Option<Street>>;
    /// Streets whose name contains `query`, case-insensitively, ordered by name.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Street>>;
    fn list(&self, limit: usize) -> Result<Vec<Street>>;
    fn link_town(&self, street_id: i64, town_id: i64) -> Result<()>;
    fn link_number(&self, street_id: i64, number_id: i64) -> Result<()>;
    fn count(&self) -> Result<usize>;
}

pub struct SqliteStreetRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStreetRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn load_relations(&self, street: &mut Street) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT town_id FROM street_towns WHERE street_id = ?1 ORDER BY town_id")?;
        street.town_ids = stmt
            .query_map(params![street.id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM street_numbers WHERE street_id = ?1",
            params![street.id],
            |row| row.get(0),
        )?;
        street.number_count = count as u32;
        Ok(())
    }

    fn collect(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Street>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            let mut street = Street::new(row.get::<_, String>(1)?);
            street.id = row.get(0)?;
            Ok(street)
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

impl<'a> Repository for SqliteStreetRepository<'a> {
    type Entity = Street;
    type Id = i64;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let street = self
            .conn
            .query_row(
                "SELECT id, name FROM streets WHERE id = ?1",
                params![id],
                |row| {
                    let mut street = Street::new(row.get::<_, String>(1)?);
                    street.id = row.get(0)?;
                    Ok(street)
                },
            )
            .optional()?;

        match street {
            Some(mut street) => {
                self.load_relations(&mut street)?;
                Ok(Some(street))
            }
            None => Ok(None),
        }
    }

    /// Upsert keyed on the street name; returns the row id.
    fn save(&self, street: &Self::Entity) -> Result<i64> {
        let id = self.conn.query_row(
            "INSERT INTO streets (name, name_folded) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET name_folded = excluded.name_folded
             RETURNING id",
            params![street.name, fold(&street.name)],
            |row| row.get(0),
        )?;
        for town_id in &street.town_ids {
            self.link_town(id, *town_id)?;
        }
        Ok(id)
    }

    fn delete(&self, id: &Self::Id) -> Result<bool> {
        let deleted = self.conn.execute("DELETE FROM streets WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

impl<'a> StreetRepository for SqliteStreetRepository<'a> {
    fn find_by_name(&self, name: &str) -> Result<Option<Street>> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM streets WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        match id {
            Some(id) => self.find_by_id(&id),
            None => Ok(None),
        }
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<Street>> {
        self.collect(
            "SELECT id, name FROM streets
             WHERE name_folded LIKE ?1 ESCAPE '\\'
             ORDER BY name
             LIMIT ?2",
            params![contains_pattern(query), limit as i64],
        )
    }

    fn list(&self, limit: usize) -> Result<Vec<Street>> {
        let mut streets = self.collect(
            "SELECT id, name FROM streets ORDER BY name LIMIT ?1",
            params![limit as i64],
        )?;
        for street in &mut streets {
            self.load_relations(street)?;
        }
        Ok(streets)
    }

    fn link_town(&self, street_id: i64, town_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO street_towns (street_id, town_id) VALUES (?1, ?2)",
            params![street_id, town_id],
        )?;
        Ok(())
    }

    fn link_number(&self, street_id: i64, number_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO street_numbers (street_id, number_id) VALUES (?1, ?2)",
            params![street_id, number_id],
        )?;
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM streets", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Town;
    use crate::storage::database::open_in_memory;
    use crate::storage::repositories::{SqliteTownRepository, TownRepository};

    #[test]
    fn test_search_is_case_insensitive_for_diacritics() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get_connection();
        let repo = SqliteStreetRepository::new(&conn);

        repo.save(&Street::new("Čermákova")).unwrap();
        repo.save(&Street::new("Šumavská")).unwrap();
        repo.save(&Street::new("Nádražní")).unwrap();

        let found = repo.search("čERM", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Čermákova");

        let found = repo.search("á", 10).unwrap();
        let names: Vec<_> = found.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Nádražní", "Čermákova", "Šumavská"]);
    }

    #[test]
    fn test_search_respects_limit_and_literal_wildcards() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get_connection();
        let repo = SqliteStreetRepository::new(&conn);

        for name in ["Alfa", "Alfa 2", "Alfa 3"] {
            repo.save(&Street::new(name)).unwrap();
        }
        assert_eq!(repo.search("alfa", 2).unwrap().len(), 2);
        assert!(repo.search("%", 10).unwrap().is_empty());
    }

    #[test]
    fn test_links_and_relations() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get_connection();
        let streets = SqliteStreetRepository::new(&conn);
        let towns = SqliteTownRepository::new(&conn);

        let town_id = towns.save(&Town::new(1, "Lhota", "53701")).unwrap();
        let street_id = streets.save(&Street::new("Hlavní")).unwrap();
        streets.link_town(street_id, town_id).unwrap();
        streets.link_town(street_id, town_id).unwrap();

        let street = streets.find_by_name("Hlavní").unwrap().unwrap();
        assert_eq!(street.town_ids, vec![town_id]);
        assert_eq!(street.number_count, 0);
        assert_eq!(streets.save(&Street::new("Hlavní")).unwrap(), street_id);
    }
}
