use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter, types::Value};

use crate::error::Result;
use crate::models::{AddressNumber, Town};

use super::{Repository, contains_pattern, fold};

pub trait NumberRepository: Repository<Entity = AddressNumber, Id = i64> {
    fn find_by_code(&self, code: i64) -> Result<Option<AddressNumber>>;
    /// House numbers of a street, each term matching the number, the town
    /// name or the postal code. No terms returns the whole street.
    fn in_street(
        &self,
        street_id: i64,
        terms: &[String],
        limit: usize,
    ) -> Result<Vec<(AddressNumber, Option<Town>)>>;
    fn count(&self) -> Result<usize>;
}

pub struct SqliteNumberRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteNumberRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn load_street_ids(&self, number: &mut AddressNumber) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT street_id FROM street_numbers WHERE number_id = ?1 ORDER BY street_id")?;
        number.street_ids = stmt
            .query_map(params![number.id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(())
    }
}

const NUMBER_COLUMNS: &str = "n.id, n.code, n.name, n.coord_x, n.coord_y, n.town_id";

fn number_from_row(row: &Row<'_>) -> rusqlite::Result<AddressNumber> {
    Ok(AddressNumber {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        coord_x: row.get(3)?,
        coord_y: row.get(4)?,
        town_id: row.get(5)?,
        street_ids: Vec::new(),
    })
}

impl<'a> Repository for SqliteNumberRepository<'a> {
    type Entity = AddressNumber;
    type Id = i64;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let number = self
            .conn
            .query_row(
                &format!("SELECT {NUMBER_COLUMNS} FROM numbers n WHERE n.id = ?1"),
                params![id],
                number_from_row,
            )
            .optional()?;

        match number {
            Some(mut number) => {
                self.load_street_ids(&mut number)?;
                Ok(Some(number))
            }
            None => Ok(None),
        }
    }

    /// Upsert keyed on the RUIAN code; returns the row id.
    fn save(&self, number: &Self::Entity) -> Result<i64> {
        let id = self.conn.query_row(
            "INSERT INTO numbers (code, name, name_folded, coord_x, coord_y, town_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(code) DO UPDATE SET
                name = excluded.name,
                name_folded = excluded.name_folded,
                coord_x = excluded.coord_x,
                coord_y = excluded.coord_y,
                town_id = excluded.town_id
             RETURNING id",
            params![
                number.code,
                number.name,
                fold(&number.name),
                number.coord_x,
                number.coord_y,
                number.town_id
            ],
            |row| row.get(0),
        )?;
        for street_id in &number.street_ids {
            self.conn.execute(
                "INSERT OR IGNORE INTO street_numbers (street_id, number_id) VALUES (?1, ?2)",
                params![street_id, id],
            )?;
        }
        Ok(id)
    }

    fn delete(&self, id: &Self::Id) -> Result<bool> {
        let deleted = self.conn.execute("DELETE FROM numbers WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

impl<'a> NumberRepository for SqliteNumberRepository<'a> {
    fn find_by_code(&self, code: i64) -> Result<Option<AddressNumber>> {
        let id: Option<i64> = self
            .conn
            .query_row("SELECT id FROM numbers WHERE code = ?1", params![code], |row| {
                row.get(0)
            })
            .optional()?;
        match id {
            Some(id) => self.find_by_id(&id),
            None => Ok(None),
        }
    }

    fn in_street(
        &self,
        street_id: i64,
        terms: &[String],
        limit: usize,
    ) -> Result<Vec<(AddressNumber, Option<Town>)>> {
        let mut sql = format!(
            "SELECT {NUMBER_COLUMNS}, t.id, t.code, t.name, t.postal_code
             FROM street_numbers sn
             JOIN numbers n ON n.id = sn.number_id
             LEFT JOIN towns t ON t.id = n.town_id
             WHERE sn.street_id = ?"
        );
        let mut values: Vec<Value> = vec![Value::Integer(street_id)];

        for term in terms {
            sql.push_str(
                " AND (n.name_folded LIKE ? ESCAPE '\\'
                       OR t.name_folded LIKE ? ESCAPE '\\'
                       OR t.postal_code LIKE ? ESCAPE '\\')",
            );
            let pattern = contains_pattern(term);
            values.push(Value::Text(pattern.clone()));
            values.push(Value::Text(pattern.clone()));
            values.push(Value::Text(pattern));
        }

        sql.push_str(" ORDER BY t.name, CAST(n.name AS INTEGER), n.name LIMIT ?");
        values.push(Value::Integer(limit as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            let number = number_from_row(row)?;
            let town = match row.get::<_, Option<i64>>(6)? {
                Some(id) => Some(Town {
                    id,
                    code: row.get(7)?,
                    name: row.get(8)?,
                    postal_code: row.get(9)?,
                }),
                None => None,
            };
            Ok((number, town))
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM numbers", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Street;
    use crate::storage::database::open_in_memory;
    use crate::storage::repositories::{SqliteStreetRepository, SqliteTownRepository};

    fn seed(conn: &Connection) -> i64 {
        let towns = SqliteTownRepository::new(conn);
        let streets = SqliteStreetRepository::new(conn);
        let numbers = SqliteNumberRepository::new(conn);

        let brno = towns.save(&Town::new(1, "Brno", "60200")).unwrap();
        let lhota = towns.save(&Town::new(2, "Lhota", "53701")).unwrap();
        let street = streets.save(&Street::new("Hlavní")).unwrap();

        for (code, name, town) in [(10, "12", brno), (11, "2", brno), (12, "12a", lhota)] {
            let mut number = AddressNumber::new(code, name);
            number.town_id = Some(town);
            number.street_ids = vec![street];
            numbers.save(&number).unwrap();
        }
        street
    }

    #[test]
    fn test_in_street_without_terms_orders_numerically() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get_connection();
        let street = seed(&conn);
        let repo = SqliteNumberRepository::new(&conn);

        let found = repo.in_street(street, &[], 50).unwrap();
        let names: Vec<_> = found.iter().map(|(n, _)| n.name.as_str()).collect();
        assert_eq!(names, vec!["2", "12", "12a"]);
        assert_eq!(found[0].1.as_ref().unwrap().name, "Brno");
    }

    #[test]
    fn test_in_street_terms_match_number_or_town() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get_connection();
        let street = seed(&conn);
        let repo = SqliteNumberRepository::new(&conn);

        let found = repo
            .in_street(street, &["12".to_string(), "lhota".to_string()], 50)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0.code, 12);

        let by_zip = repo.in_street(street, &["602".to_string()], 50).unwrap();
        assert_eq!(by_zip.len(), 2);
    }

    #[test]
    fn test_find_by_code_loads_streets() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get_connection();
        let street = seed(&conn);
        let repo = SqliteNumberRepository::new(&conn);

        let number = repo.find_by_code(12).unwrap().unwrap();
        assert_eq!(number.street_ids, vec![street]);
        assert_eq!(repo.count().unwrap(), 3);
    }
}
