use thiserror::Error;

/// All errors that can occur in ruian-core.
#[derive(Debug, Error)]
pub enum RuianError {
    #[error("Street not found: {0}")]
    StreetNotFound(i64),

    #[error("Town not found: {0}")]
    TownNotFound(i64),

    #[error("Unknown lookup stage: {0}")]
    InvalidStage(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Import error in {file}: {message}")]
    Import { file: String, message: String },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Download of {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::database::DatabaseError),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl RuianError {
    /// Process exit code for this error when surfaced by the CLI.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::StreetNotFound(_) | Self::TownNotFound(_) => ExitCode::NotFound,
            Self::InvalidStage(_) | Self::ValidationError(_) => ExitCode::InvalidArgs,
            _ => ExitCode::GeneralError,
        }
    }
}

/// Exit codes used by the `ruian` binary.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
}

pub type Result<T> = std::result::Result<T, RuianError>;
