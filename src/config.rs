//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup. For local development a `.env` file is honored.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::models::DEFAULT_LEVEL_DIVISOR;

/// Default number of retries after a write conflict.
pub const DEFAULT_MAX_WRITE_RETRIES: u32 = 3;
/// Default timeout applied to every backend call.
pub const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 10_000;

/// Which storage backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local store, for development and tests
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Invalid("STORE_BACKEND")),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL (allowed CORS origin)
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,

    /// Session JWT signing key shared with the auth provider (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Expected `aud` claim in session JWTs
    pub jwt_audience: String,

    // --- Points workflow ---
    /// Points per level; level = floor(total / divisor) + 1
    pub level_divisor: u64,
    /// Retries after a write conflict before giving up
    pub max_write_retries: u32,
    /// Timeout applied to every backend call
    pub backend_timeout: Duration,
    /// Optional JSON achievement catalog to seed at startup
    pub achievements_seed_path: Option<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            jwt_audience: "authenticated".to_string(),
            level_divisor: DEFAULT_LEVEL_DIVISOR,
            max_write_retries: DEFAULT_MAX_WRITE_RETRIES,
            backend_timeout: Duration::from_millis(DEFAULT_BACKEND_TIMEOUT_MS),
            achievements_seed_path: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let level_divisor = parse_or("LEVEL_DIVISOR", DEFAULT_LEVEL_DIVISOR)?;
        if level_divisor == 0 {
            return Err(ConfigError::Invalid("LEVEL_DIVISOR"));
        }

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_or("PORT", 8080)?,
            store_backend: parse_or("STORE_BACKEND", StoreBackend::Firestore)?,

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            jwt_audience: env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "authenticated".to_string()),

            level_divisor,
            max_write_retries: parse_or("MAX_WRITE_RETRIES", DEFAULT_MAX_WRITE_RETRIES)?,
            backend_timeout: Duration::from_millis(parse_or(
                "BACKEND_TIMEOUT_MS",
                DEFAULT_BACKEND_TIMEOUT_MS,
            )?),
            achievements_seed_path: env::var("ACHIEVEMENTS_SEED_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty()),
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
