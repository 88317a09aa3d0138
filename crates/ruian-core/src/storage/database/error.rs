use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Migration error at version {version}: {message}")]
    Migration { version: u32, message: String },

    #[error("Query error: {0}")]
    Query(String),
}
