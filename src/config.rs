// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup and validated before the server
//! starts; nothing reads the environment after that.

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

/// Directory under the base path that is watched for activity files.
pub const WATCH_DIR: &str = "activities";

/// Default base directory, relative to the user's home.
const DEFAULT_BASE_DIR: &str = ".config/runnerdash";

/// Default database file name inside the base directory.
const DEFAULT_DB_FILE: &str = "runnerdash.db";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory holding the database and the `activities/` folder
    pub base_path: PathBuf,
    /// SQLite database file
    pub db_file: PathBuf,
    /// Address to bind the HTTP server to
    pub host: IpAddr,
    /// Server port
    pub port: u16,
    /// Verbose logging
    pub debug: bool,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// HS256 key for session tokens (raw bytes)
    pub session_signing_key: Vec<u8>,
}

impl Config {
    /// Config for tests, rooted at the given directory.
    pub fn test_default(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        Self {
            db_file: base_path.join(DEFAULT_DB_FILE),
            base_path,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8080,
            debug: false,
            frontend_url: "http://localhost:5173".to_string(),
            session_signing_key: b"test_session_key_32_bytes_min!!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honoured if present. When `SESSION_SIGNING_KEY` is
    /// unset a random key is generated, so sessions do not survive restarts.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let base_path = match env::var("RUNNERDASH_BASE_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => dirs::home_dir()
                .map(|home| home.join(DEFAULT_BASE_DIR))
                .ok_or(ConfigError::Missing("RUNNERDASH_BASE_PATH"))?,
        };

        let db_file = env::var("RUNNERDASH_DB_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| base_path.join(DEFAULT_DB_FILE));

        let host = env::var("RUNNERDASH_HOST")
            .unwrap_or_else(|_| "127.0.0.1".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("RUNNERDASH_HOST", "expected an IP address"))?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("PORT", "expected a port number"))?;

        let debug = env::var("RUNNERDASH_DEBUG")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let session_signing_key = match env::var("SESSION_SIGNING_KEY") {
            Ok(key) => key.trim().as_bytes().to_vec(),
            Err(_) => crate::services::credentials::random_bytes(32)
                .map_err(|_| ConfigError::Invalid("SESSION_SIGNING_KEY", "failed to generate"))?,
        };

        let config = Self {
            base_path,
            db_file,
            host,
            port,
            debug,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            session_signing_key,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("PORT", "must be non-zero"));
        }
        if self.session_signing_key.len() < 32 {
            return Err(ConfigError::Invalid(
                "SESSION_SIGNING_KEY",
                "must be at least 32 bytes",
            ));
        }
        if self.db_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("RUNNERDASH_DB_FILE", "must not be empty"));
        }
        Ok(())
    }

    /// Folder watched for new activity files.
    pub fn watch_dir(&self) -> PathBuf {
        self.base_path.join(WATCH_DIR)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
