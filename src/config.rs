use std::env;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/campus_lost_found";
pub const DEFAULT_LOCAL_STORE_DIR: &str = ".campus-data";
/// `LOCAL_STORE_DIR` value selecting the in-memory fallback store.
pub const IN_MEMORY_STORE: &str = ":memory:";
const DEV_JWT_SECRET: &str = "campus-lost-found-dev-secret";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackendKind {
    Postgres,
    Local,
}

impl std::str::FromStr for StorageBackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackendKind::Postgres),
            "local" => Ok(StorageBackendKind::Local),
            other => Err(AppError::Config(format!(
                "STORAGE_BACKEND must be 'postgres' or 'local', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub storage_backend: StorageBackendKind,
    pub database_url: String,
    pub database_max_connections: u32,
    /// `None` keeps the fallback store in memory.
    pub local_store_dir: Option<PathBuf>,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let storage_backend = match var("STORAGE_BACKEND") {
            Some(v) => v.parse()?,
            None => StorageBackendKind::Postgres,
        };

        let local_store_dir = match var("LOCAL_STORE_DIR") {
            Some(v) if v == IN_MEMORY_STORE => None,
            Some(v) => Some(PathBuf::from(v)),
            None => Some(PathBuf::from(DEFAULT_LOCAL_STORE_DIR)),
        };

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set, using development secret");
            DEV_JWT_SECRET.to_string()
        });

        Ok(Config {
            storage_backend,
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                var("DATABASE_MAX_CONNECTIONS"),
                10,
            )?,
            local_store_dir,
            server_host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: parse_or("SERVER_PORT", var("SERVER_PORT"), 50051)?,
            jwt_secret,
            token_ttl_hours: parse_or("TOKEN_TTL_HOURS", var("TOKEN_TTL_HOURS"), 24)?,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", key, v, e))),
        None => Ok(default),
    }
}
