//! # Application Configuration
//!
//! Where the database lives, catalog and sale-form defaults, and the log
//! filter.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     VITRINA_DB_PATH=/tmp/vitrina.db                                    │
//! │     VITRINA_LOG=debug                                                  │
//! │     VITRINA_DEFAULT_CATEGORY=Calzado                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/vitrina/vitrina.toml (Linux)                             │
//! │     ~/Library/Application Support/ec.vitrina.vitrina/vitrina.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     platform data dir, "Ropa", Efectivo, Local                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # vitrina.toml
//! [database]
//! path = "/path/to/vitrina.db"
//! max_connections = 5
//!
//! [catalog]
//! default_category = "Ropa"
//!
//! [sales]
//! default_payment_method = "Efectivo"
//! default_channel = "Local"
//!
//! [logging]
//! filter = "info,vitrina=debug,sqlx=warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use vitrina_core::{PaymentMethod, SalesChannel, DEFAULT_CATEGORY};
use vitrina_db::DbConfig;

/// Log filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,vitrina=debug,sqlx=warn";

// =============================================================================
// Config Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("No config path available")]
    NoPath,

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `vitrina.db` in the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Category given to products saved without one.
    #[serde(default = "default_category")]
    pub default_category: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Default for CatalogSettings {
    fn default() -> Self {
        CatalogSettings {
            default_category: default_category(),
        }
    }
}

/// Pre-selected values of a new sale form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesSettings {
    #[serde(default)]
    pub default_payment_method: PaymentMethod,

    #[serde(default)]
    pub default_channel: SalesChannel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub sales: SalesSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (vitrina.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.catalog.default_category.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "catalog.default_category must not be blank".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("VITRINA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Ok(filter) = std::env::var("VITRINA_LOG") {
            self.logging.filter = filter;
        }

        if let Ok(category) = std::env::var("VITRINA_DEFAULT_CATEGORY") {
            debug!(category = %category, "Overriding default category from environment");
            self.catalog.default_category = category;
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("ec", "vitrina", "vitrina")
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("vitrina.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Resolved database file: the configured path, else the platform data
    /// dir, else the working directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }

        Self::project_dirs()
            .map(|dirs| dirs.data_dir().join("vitrina.db"))
            .unwrap_or_else(|| PathBuf::from("vitrina.db"))
    }

    /// Pool configuration for [`vitrina_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path()).max_connections(self.database.max_connections)
    }
}
