//! Application configuration loaded from environment.

use std::net::SocketAddr;

/// Relay used when `MULTIMIRROR_HOST` is unset or empty.
pub const DEFAULT_RELAY_HOST: &str = "https://socket.multimirror.io";

/// Application configuration loaded from `.env` and environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g. `0.0.0.0:3000`).
    pub server_addr: SocketAddr,
    /// Public application key shared with subscribers and the relay.
    pub app_key: String,
    /// Secret for signing private/presence channel auth and publishing.
    pub app_secret: String,
    /// Base URL of the relay, without trailing slash.
    pub relay_host: String,
    /// Secret used to validate subscriber bearer tokens.
    pub jwt_secret: String,
    /// Log level: `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment. Call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_addr = get("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let server_addr: SocketAddr = server_addr
            .parse()
            .map_err(|_| ConfigLoadError::InvalidServerAddr)?;

        let app_key =
            get("MULTIMIRROR_APP_KEY").ok_or(ConfigLoadError::Missing("MULTIMIRROR_APP_KEY"))?;
        let app_secret = get("MULTIMIRROR_APP_SECRET")
            .ok_or(ConfigLoadError::Missing("MULTIMIRROR_APP_SECRET"))?;
        let relay_host = get("MULTIMIRROR_HOST")
            .unwrap_or_else(|| DEFAULT_RELAY_HOST.to_string())
            .trim_end_matches('/')
            .to_string();
        let jwt_secret = get("JWT_SECRET")
            .unwrap_or_else(|| "multimirror_jwt_secret_change_in_production".to_string());
        let log_level = get("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            server_addr,
            app_key,
            app_secret,
            relay_host,
            jwt_secret,
            log_level,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Invalid SERVER_ADDR")]
    InvalidServerAddr,

    #[error("Missing required setting {0}")]
    Missing(&'static str),
}
