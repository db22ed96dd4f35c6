//! # cf-config
//!
//! Layered runtime settings: built-in defaults, then an optional
//! `connectify.toml`, then `CONNECTIFY__SECTION__KEY` environment variables.

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// e.g. `sqlite://connectify.db` or `sqlite::memory:`
    pub url: String,
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(deserialize_with = "secret")]
    pub jwt_secret: SecretString,
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailSettings {
    pub from_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub format: LogFormat,
    /// Fallback filter when `RUST_LOG` is unset
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub retry: RetrySettings,
    pub mail: MailSettings,
    pub log: LogSettings,
}

impl Settings {
    /// Loads `.env` (if any) and then the layered sources.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_sources(
            File::with_name("connectify").required(false),
            Environment::with_prefix("CONNECTIFY")
                .prefix_separator("__")
                .separator("__"),
        )
    }

    fn from_sources(file: File<config::FileSourceFile, config::FileFormat>, env: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 4000)?
            .set_default("database.url", "sqlite://connectify.db")?
            .set_default("auth.token_ttl_hours", 24)?
            .set_default("retry.max_attempts", 3)?
            .set_default("mail.from_address", "noreply@connectify.local")?
            .set_default("log.format", "pretty")?
            .set_default("log.filter", "info")?
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;

        settings.check()?;
        Ok(settings)
    }

    fn check(&self) -> Result<(), ConfigError> {
        use secrecy::ExposeSecret;

        if self.auth.jwt_secret.expose_secret().len() < 16 {
            return Err(ConfigError::Invalid("auth.jwt_secret must be at least 16 characters".into()));
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_hours must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
