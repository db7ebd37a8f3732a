// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local development.

use std::env;
use std::path::PathBuf;

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend origin, e.g. `https://api.example.com` (no trailing slash)
    pub api_base_url: String,
    /// Route of the login surface used for forced navigation
    pub login_path: String,
    /// Persisted session file; `None` keeps the session in memory only
    pub session_file: Option<PathBuf>,
    /// Seconds before expiry at which a cached access token stops being trusted
    pub refresh_margin_secs: i64,
    /// Timeout applied to every outbound HTTP request
    pub request_timeout_secs: u64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            login_path: "/login".to_string(),
            session_file: None,
            refresh_margin_secs: 0,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_base_url = env::var("API_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .map_err(|_| ConfigError::Missing("API_BASE_URL"))?;

        Ok(Self {
            api_base_url,
            login_path: env::var("LOGIN_PATH").unwrap_or_else(|_| "/login".to_string()),
            session_file: env::var("SESSION_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            refresh_margin_secs: parse_var("REFRESH_MARGIN_SECS", 0)?,
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", 30)?,
        })
    }

    /// Build an absolute URL for a backend endpoint path.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        if endpoint.starts_with('/') {
            format!("{}{}", self.api_base_url, endpoint)
        } else {
            format!("{}/{}", self.api_base_url, endpoint)
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: v }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
