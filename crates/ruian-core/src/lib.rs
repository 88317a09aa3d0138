pub mod config;
pub mod download;
pub mod error;
pub mod import;
pub mod logging;
pub mod models;
pub mod storage;
pub mod suggest;

pub use config::AppConfig;
pub use error::{RuianError, Result};
pub use models::*;

pub use storage::database::{
    ConnectionPool, Database, DatabaseError, RegistryStats, open_database, open_in_memory,
};
pub use storage::repositories::{
    ImportLogRepository, NumberRepository, Repository, SqliteImportLogRepository,
    SqliteNumberRepository, SqliteStreetRepository, SqliteTownRepository, StreetRepository,
    TownRepository,
};

pub use download::ArchiveDownloader;
pub use import::{ImportOptions, ImportStats, RuianImporter, archive_tag, archive_url};
pub use suggest::{
    LocalSuggestionSource, SuggestService, SuggestionSource, number_terms, strip_street_prefix,
};
