use crate::pipeline::FailurePolicy;
use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_POSTGRES_HOST: &str = "localhost";
const DEFAULT_POSTGRES_PORT: u16 = 5432;
const DEFAULT_POSTGRES_USER: &str = "postgres";
const DEFAULT_POSTGRES_DB: &str = "openfoodimpact";
const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017/";
const DEFAULT_MONGODB_DATABASE: &str = "OpenFoodImpact";
const DEFAULT_MONGODB_COLLECTION: &str = "recipes";
const DEFAULT_SERVER_SELECTION_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PRODUCERS_FILE: &str = "foodsync.toml";
const DEFAULT_TABULAR_PATH: &str = "data/fr.openfoodfacts.org.products.csv";
const DEFAULT_FALLBACK_CHUNK_SIZE: usize = 50;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoSettings {
    pub uri: String,
    pub database: String,
    pub collection: String,
    pub server_selection_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub postgres: PostgresSettings,
    pub mongo: MongoSettings,
    pub producers_file: PathBuf,
    pub tabular_path: PathBuf,
    pub fallback_chunk_size: usize,
    /// Named policy for a failed seasonal-calendar stage.
    pub seasonal_failure_policy: FailurePolicy,
    pub log_level: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            postgres: PostgresSettings::default(),
            mongo: MongoSettings::default(),
            producers_file: PathBuf::from(DEFAULT_PRODUCERS_FILE),
            tabular_path: PathBuf::from(DEFAULT_TABULAR_PATH),
            fallback_chunk_size: DEFAULT_FALLBACK_CHUNK_SIZE,
            seasonal_failure_policy: FailurePolicy::Abort,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_POSTGRES_HOST.to_string(),
            port: DEFAULT_POSTGRES_PORT,
            user: DEFAULT_POSTGRES_USER.to_string(),
            password: String::new(),
            database: DEFAULT_POSTGRES_DB.to_string(),
        }
    }
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            uri: DEFAULT_MONGODB_URI.to_string(),
            database: DEFAULT_MONGODB_DATABASE.to_string(),
            collection: DEFAULT_MONGODB_COLLECTION.to_string(),
            server_selection_timeout_ms: DEFAULT_SERVER_SELECTION_TIMEOUT_MS,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::ParseError {
                field: key.to_string(),
                error: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

impl SyncConfig {
    /// Reads the configuration from the environment, falling back to defaults
    /// for unset variables. Set but unparseable values are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let postgres = PostgresSettings {
            host: env_or("POSTGRES_HOST", DEFAULT_POSTGRES_HOST),
            port: env_parsed("POSTGRES_PORT")?.unwrap_or(DEFAULT_POSTGRES_PORT),
            user: env_or("POSTGRES_USER", DEFAULT_POSTGRES_USER),
            password: env_or("POSTGRES_PASSWORD", ""),
            database: env_or("POSTGRES_DB", DEFAULT_POSTGRES_DB),
        };

        let mongo = MongoSettings {
            uri: env_or("MONGODB_URI", DEFAULT_MONGODB_URI),
            database: env_or("MONGODB_DATABASE", DEFAULT_MONGODB_DATABASE),
            collection: env_or("MONGODB_COLLECTION", DEFAULT_MONGODB_COLLECTION),
            server_selection_timeout_ms: env_parsed("FOODSYNC_MONGO_TIMEOUT_MS")?
                .unwrap_or(DEFAULT_SERVER_SELECTION_TIMEOUT_MS),
        };

        Ok(Self {
            postgres,
            mongo,
            producers_file: PathBuf::from(env_or("FOODSYNC_PRODUCERS", DEFAULT_PRODUCERS_FILE)),
            tabular_path: PathBuf::from(env_or("FOODSYNC_OFF_PATH", DEFAULT_TABULAR_PATH)),
            fallback_chunk_size: env_parsed("FOODSYNC_FALLBACK_CHUNK")?
                .unwrap_or(DEFAULT_FALLBACK_CHUNK_SIZE),
            seasonal_failure_policy: env_parsed("FOODSYNC_SEASONAL_FAILURE")?
                .unwrap_or(FailurePolicy::Abort),
            log_level: env_or("FOODSYNC_LOG_LEVEL", DEFAULT_LOG_LEVEL).to_lowercase(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.postgres.host.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "PostgreSQL host must not be empty".to_string(),
            ));
        }

        let uri = &self.mongo.uri;
        if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
            return Err(ConfigError::ValidationFailed(format!(
                "MongoDB URI must start with mongodb:// or mongodb+srv://, got {}",
                self.mongo.uri
            )));
        }

        if self.mongo.server_selection_timeout_ms < 100 {
            return Err(ConfigError::ValidationFailed(
                "Server selection timeout must be at least 100ms".to_string(),
            ));
        }
        if self.mongo.server_selection_timeout_ms > 60_000 {
            return Err(ConfigError::ValidationFailed(
                "Server selection timeout cannot exceed 60000ms".to_string(),
            ));
        }

        if self.fallback_chunk_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "Fallback chunk size must be at least 1".to_string(),
            ));
        }
        if self.fallback_chunk_size > 10_000 {
            return Err(ConfigError::ValidationFailed(
                "Fallback chunk size cannot exceed 10000".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }
}

impl fmt::Display for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Foodsync Configuration:")?;
        writeln!(
            f,
            "  PostgreSQL: {}@{}:{}/{}",
            self.postgres.user, self.postgres.host, self.postgres.port, self.postgres.database
        )?;
        writeln!(
            f,
            "  PostgreSQL Password: {}",
            if self.postgres.password.is_empty() {
                "(none)"
            } else {
                "(set)"
            }
        )?;
        writeln!(f, "  MongoDB URI: {}", self.mongo.uri)?;
        writeln!(
            f,
            "  MongoDB Collection: {}.{}",
            self.mongo.database, self.mongo.collection
        )?;
        writeln!(
            f,
            "  Server Selection Timeout: {}ms",
            self.mongo.server_selection_timeout_ms
        )?;
        writeln!(f, "  Producers File: {}", self.producers_file.display())?;
        writeln!(f, "  Tabular Source: {}", self.tabular_path.display())?;
        writeln!(f, "  Fallback Chunk Size: {}", self.fallback_chunk_size)?;
        writeln!(
            f,
            "  Seasonal Failure Policy: {}",
            self.seasonal_failure_policy
        )?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
