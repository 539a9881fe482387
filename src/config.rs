//! Application configuration loaded from environment variables.
//!
//! All configuration is loaded from environment variables with sensible
//! defaults for development. In production, configure via environment
//! variables or a `.env` file (loaded with `dotenvy`).
//!
//! # Security Configuration
//!
//! - `API_KEY_PRIMARY`: the key every protected request must present.
//!   When unset, authentication fails closed: every presented credential
//!   is rejected (public endpoints stay reachable).
//! - `API_KEY_SECONDARY`: optional second accepted value, for key rotation.
//!
//! # Rate Limiting
//!
//! - `RATE_LIMIT_PER_MINUTE`: tokens per key per 60-second window
//!   (default: 60). Buckets fully replenish once per window.

use std::env;

use anyhow::anyhow;

use crate::error::{ApiError, AppResult};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 8080)
    pub port: u16,

    // =========================================================================
    // Persistence Configuration
    // =========================================================================
    /// SQLite connection URL (default: "sqlite://rag-store.db?mode=rwc")
    pub database_url: String,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Primary API key. Required for any protected request to succeed;
    /// an unset primary key rejects every presented credential.
    pub primary_api_key: Option<String>,

    /// Optional secondary API key, accepted alongside the primary.
    pub secondary_api_key: Option<String>,

    /// Comma-separated list of allowed CORS origins ("*" = any, dev only).
    pub cors_allowed_origins: Vec<String>,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    /// Tokens granted to each API key per 60-second window (default: 60).
    pub rate_limit_per_minute: u32,

    // =========================================================================
    // Request Limits
    // =========================================================================
    /// Maximum request body size in bytes (default: 1MB).
    pub max_request_body_size: usize,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level filter (e.g., "info", "debug")
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Internal` if any value fails to parse or
    /// validation rejects the combination.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 8080)?,

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://rag-store.db?mode=rwc".to_string()),

            primary_api_key: env::var("API_KEY_PRIMARY").ok().filter(|k| !k.trim().is_empty()),
            secondary_api_key: env::var("API_KEY_SECONDARY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            cors_allowed_origins: Self::parse_cors_origins(),

            rate_limit_per_minute: Self::parse_env("RATE_LIMIT_PER_MINUTE", 60)?,

            max_request_body_size: Self::parse_env("MAX_REQUEST_BODY_SIZE", 1024 * 1024)?,

            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    fn validate(&self) -> AppResult<()> {
        if self.rate_limit_per_minute == 0 {
            return Err(ApiError::Internal(anyhow!(
                "RATE_LIMIT_PER_MINUTE must be greater than 0"
            )));
        }

        if self.max_request_body_size == 0 {
            return Err(ApiError::Internal(anyhow!(
                "MAX_REQUEST_BODY_SIZE must be greater than 0"
            )));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if any API key is configured.
    ///
    /// With no primary key set the service still runs, but every protected
    /// request is denied; this is surfaced at startup as a warning.
    pub fn auth_configured(&self) -> bool {
        self.primary_api_key.is_some()
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| ApiError::Internal(anyhow!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse CORS allowed origins from environment variable.
    fn parse_cors_origins() -> Vec<String> {
        env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "sqlite://rag-store.db?mode=rwc".to_string(),
            primary_api_key: None,
            secondary_api_key: None,
            cors_allowed_origins: vec!["*".to_string()],
            rate_limit_per_minute: 60,
            max_request_body_size: 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}
