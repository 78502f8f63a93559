//! # Configuration
//!
//! Settings are layered, highest priority last:
//! 1. built-in defaults
//! 2. `config.toml` (optional)
//! 3. environment variables prefixed `FORUM__`, nested with `__`
//!    (e.g. `FORUM__DATABASE__URL`, `FORUM__INVITES__EXPIRY_HOURS`)
//!
//! Keep credentials in the environment or `.env`, not in the file.

pub mod telemetry;

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use secrecy::SecretString;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const ENV_PREFIX: &str = "FORUM";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to initialise tracing: {0}")]
    Telemetry(String),
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: SecretString,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InviteSettings {
    pub expiry_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSettings {
    pub admin_username: String,
    pub admin_email: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub invites: InviteSettings,
    pub seed: SeedSettings,
    /// The `.env` file that was read, if any.
    #[serde(skip)]
    pub env_file: Option<PathBuf>,
}

impl Settings {
    /// Reads `.env` if present, then loads from [`DEFAULT_CONFIG_PATH`].
    /// Tracing is not up yet, so the `.env` path is returned in `env_file`.
    pub fn load() -> Result<Self, ConfigError> {
        let env_file = dotenvy::dotenv().ok();
        let mut settings = Self::load_from_path(DEFAULT_CONFIG_PATH)?;
        settings.env_file = env_file;
        Ok(settings)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let config = Config::builder()
            .set_default("database.url", "postgres://localhost/forum")?
            .set_default("database.max_connections", 10)?
            .set_default("database.run_migrations", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("invites.expiry_hours", 168)?
            .set_default("seed.admin_username", "admin")?
            .set_default("seed.admin_email", "admin@localhost")?
            .add_source(File::new(&path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".into(),
            ));
        }
        if self.invites.expiry_hours <= 0 {
            return Err(ConfigError::Invalid(
                "invites.expiry_hours must be positive".into(),
            ));
        }
        if self.seed.admin_username.trim().is_empty() {
            return Err(ConfigError::Invalid("seed.admin_username is empty".into()));
        }
        Ok(())
    }
}
