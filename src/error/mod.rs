//! Application error types for robust error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid channel name: {0}")]
    InvalidChannel(String),

    /// Subscriber may not join the channel.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Publisher credential missing or wrong.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("Relay transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Broadcast failed: {0}")]
    BroadcastFailed(BroadcastFailure),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// One channel the relay did not acknowledge.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelFailure {
    pub channel: String,
    /// Upstream status, `None` when the relay could not be reached.
    pub status: Option<u16>,
    /// Raw upstream body, or the transport error text.
    pub body: String,
}

/// Aggregated result of a publish where at least one channel failed.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastFailure {
    pub event: String,
    pub delivered: usize,
    pub failures: Vec<ChannelFailure>,
}

impl std::fmt::Display for BroadcastFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "event {} rejected on {} channel(s)",
            self.event,
            self.failures.len()
        )?;
        if let Some(first) = self.failures.first() {
            match first.status {
                Some(status) => write!(f, " ({}: {} {})", first.channel, status, first.body)?,
                None => write!(f, " ({}: {})", first.channel, first.body)?,
            }
        }
        Ok(())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Serialization(e) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid payload: {}", e),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidChannel(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::AccessDenied(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Jwt(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Http(e) => (
                StatusCode::BAD_GATEWAY,
                format!("Relay transport error: {}", e),
            ),
            AppError::BroadcastFailed(failure) => {
                let body = Json(json!({
                    "error": self.to_string(),
                    "delivered": failure.delivered,
                    "failures": failure.failures,
                }));
                return (StatusCode::BAD_GATEWAY, body).into_response();
            }
            AppError::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {}", e),
            ),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_failure_display_includes_upstream_response() {
        let failure = BroadcastFailure {
            event: "OrderShipped".to_string(),
            delivered: 1,
            failures: vec![ChannelFailure {
                channel: "orders".to_string(),
                status: Some(500),
                body: "boom".to_string(),
            }],
        };
        let msg = AppError::BroadcastFailed(failure).to_string();
        assert!(msg.contains("OrderShipped"));
        assert!(msg.contains("orders: 500 boom"));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            AppError::AccessDenied("x".into()).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Auth("x".into()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        let failure = BroadcastFailure {
            event: "e".to_string(),
            delivered: 0,
            failures: vec![],
        };
        assert_eq!(
            AppError::BroadcastFailed(failure).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
