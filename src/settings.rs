//! Process settings from the environment (`.env` honoured).

use crate::bootstrap::Seed;
use crate::config::{load_from_path, resolve, FullConfig, ResolvedModel};
use crate::error::ConfigError;
use std::path::PathBuf;

const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    /// Descriptor file; the built-in bookstore descriptor when None.
    pub schema_path: Option<PathBuf>,
    /// Seed fixture; the built-in bookstore seed when None.
    pub seed_path: Option<PathBuf>,
    /// Drop, recreate and seed all tables before serving.
    pub reset_on_start: bool,
    pub body_limit: usize,
}

fn parse<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse()
            .map_err(|_| ConfigError::Validation(format!("{} has invalid value '{}'", key, s))),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    /// Build settings from any key lookup. `DATABASE_URL` wins over the `BOOKSTORE_DB_*` parts.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => {
                let host = get("BOOKSTORE_DB_HOST").unwrap_or_else(|| "localhost".into());
                let user = get("BOOKSTORE_DB_USER").unwrap_or_else(|| "postgres".into());
                let password = get("BOOKSTORE_DB_PASSWORD").unwrap_or_default();
                let database = get("BOOKSTORE_DB_DATABASE").unwrap_or_else(|| "bookstore".into());
                if password.is_empty() {
                    format!("postgres://{}@{}/{}", user, host, database)
                } else {
                    format!("postgres://{}:{}@{}/{}", user, password, host, database)
                }
            }
        };
        Ok(Settings {
            database_url,
            bind_addr: get("BOOKSTORE_BIND").unwrap_or_else(|| DEFAULT_BIND.into()),
            max_connections: parse(
                "BOOKSTORE_MAX_CONNECTIONS",
                get("BOOKSTORE_MAX_CONNECTIONS"),
                DEFAULT_MAX_CONNECTIONS,
            )?,
            schema_path: get("BOOKSTORE_SCHEMA_PATH").map(PathBuf::from),
            seed_path: get("BOOKSTORE_SEED_PATH").map(PathBuf::from),
            reset_on_start: parse("BOOKSTORE_RESET", get("BOOKSTORE_RESET"), true)?,
            body_limit: parse("BOOKSTORE_BODY_LIMIT", get("BOOKSTORE_BODY_LIMIT"), DEFAULT_BODY_LIMIT)?,
        })
    }

    pub async fn load_model(&self) -> Result<ResolvedModel, ConfigError> {
        let config = match &self.schema_path {
            Some(path) => load_from_path(path).await?,
            None => FullConfig::bookstore()?,
        };
        resolve(&config)
    }

    pub async fn load_seed(&self) -> Result<Seed, ConfigError> {
        match &self.seed_path {
            Some(path) => Seed::load_from_path(path).await,
            None => Seed::bookstore(),
        }
    }
}
