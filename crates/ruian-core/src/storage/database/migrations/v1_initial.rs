use rusqlite::Connection;

use super::Migration;
use crate::error::Result;
use crate::storage::database::schema;

pub struct V1Initial;

impl Migration for V1Initial {
    fn version(&self) -> u32 {
        1
    }

    fn description(&self) -> &'static str {
        "Registry tables: towns, streets, numbers and their street links"
    }

    fn up(&self, conn: &Connection) -> Result<()> {
        schema::create_migrations_table(conn)?;
        schema::create_registry_tables(conn)?;
        schema::create_registry_indexes(conn)?;
        Ok(())
    }
}
