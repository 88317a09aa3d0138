use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RuianError};
use crate::logging::LogFormat;

/// Root application configuration, loaded from `~/.config/ruian/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub core: CoreConfig,
    pub autocomplete: AutocompleteConfig,
    pub import: ImportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub data_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutocompleteConfig {
    /// Quiet period after the last keystroke before a lookup is sent.
    pub debounce_ms: u64,
    /// Queries shorter than this never reach the registry.
    pub min_query_chars: usize,
    pub street_limit: usize,
    pub number_limit: usize,
    pub locale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub progress_step: usize,
    pub encoding: String,
    pub delimiter: char,
    /// Upper bound for downloading the monthly archive.
    pub download_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for CoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("ruian");

        Self {
            data_path: data_dir.to_string_lossy().to_string(),
        }
    }
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            min_query_chars: 3,
            street_limit: 10,
            number_limit: 50,
            locale: "cs".to_string(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            progress_step: 1000,
            encoding: "windows-1250".to_string(),
            delimiter: ';',
            download_timeout_secs: 600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/ruian/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("RUIAN_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("ruian")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let mut config = Self::load_from(&path)?;
        if let Ok(data_path) = std::env::var("RUIAN_DATA_PATH") {
            config.core.data_path = data_path;
        }
        Ok(config)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard path.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.autocomplete.min_query_chars == 0 {
            return Err(RuianError::ConfigError(
                "autocomplete.min_query_chars must be at least 1".to_string(),
            ));
        }
        if self.import.progress_step == 0 {
            return Err(RuianError::ConfigError(
                "import.progress_step must be positive".to_string(),
            ));
        }
        if self.import.download_timeout_secs == 0 {
            return Err(RuianError::ConfigError(
                "import.download_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.core.data_path)
    }

    /// Path to the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_path().join("ruian.db")
    }

    /// Where the TUI writes its log, since stdout belongs to the terminal UI.
    pub fn log_file_path(&self) -> PathBuf {
        match &self.logging.file {
            Some(file) => PathBuf::from(file),
            None => self.data_path().join("ruian.log"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.autocomplete.debounce_ms, 500);
        assert_eq!(cfg.autocomplete.min_query_chars, 3);
        assert_eq!(cfg.import.delimiter, ';');
        assert!(!cfg.core.data_path.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.autocomplete.debounce_ms = 250;
        cfg.logging.format = LogFormat::Json;
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.autocomplete.debounce_ms, 250);
        assert_eq!(loaded.logging.format, LogFormat::Json);
        assert_eq!(loaded.import.encoding, "windows-1250");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[autocomplete]\nstreet_limit = 5\n").unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.autocomplete.street_limit, 5);
        assert_eq!(loaded.autocomplete.number_limit, 50);
    }

    #[test]
    fn test_rejects_zero_min_chars() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[autocomplete]\nmin_query_chars = 0\n").unwrap();

        assert!(matches!(
            AppConfig::load_from(&path),
            Err(RuianError::ConfigError(_))
        ));
    }

    #[test]
    fn test_rejects_zero_download_timeout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[import]\ndownload_timeout_secs = 0\n").unwrap();

        assert!(matches!(
            AppConfig::load_from(&path),
            Err(RuianError::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let cfg = AppConfig::load_from(Path::new("/tmp/nonexistent_ruian_config.toml")).unwrap();
        assert_eq!(cfg.autocomplete.street_limit, 10);
    }

    #[test]
    fn test_derived_paths() {
        let mut cfg = AppConfig::default();
        cfg.core.data_path = "/srv/ruian".to_string();
        assert_eq!(cfg.database_path(), PathBuf::from("/srv/ruian/ruian.db"));
        assert_eq!(cfg.log_file_path(), PathBuf::from("/srv/ruian/ruian.log"));
    }
}
