use rusqlite::Connection;

use super::Migration;
use crate::error::Result;
use crate::storage::database::schema;

pub struct V2ImportLog;

impl Migration for V2ImportLog {
    fn version(&self) -> u32 {
        2
    }

    fn description(&self) -> &'static str {
        "Add import_log table for registry import runs"
    }

    fn up(&self, conn: &Connection) -> Result<()> {
        schema::create_import_log_table(conn)
    }
}
