//! HTTP handlers: subscriber auth, broadcast trigger, and health.

use axum::{
    extract::State,
    http::StatusCode,
    Form, Json,
};
use serde_json::json;
use validator::Validate;

use crate::auth::JwtSecret;
use crate::error::AppError;
use crate::middleware::{Publisher, SubscriberUser};
use crate::models::channel::Channel;
use crate::models::event::{AuthRequest, AuthResponse, BroadcastReport, BroadcastRequest};
use crate::services::broadcaster::SOCKET_KEY;
use crate::services::{AuthService, Broadcaster};

/// Shared application state for the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub app_secret: String,
    pub auth_service: AuthService,
    pub broadcaster: Broadcaster,
    pub jwt_secret: JwtSecret,
}

impl AppState {
    pub fn jwt_secret(&self) -> &JwtSecret {
        &self.jwt_secret
    }
    pub fn auth_service(&self) -> &AuthService {
        &self.auth_service
    }
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }
}

/// POST /broadcasting/auth — sign a private/presence subscription.
/// Form body: `socket_id`, `channel_name`. The user comes from `Authorization: Bearer <jwt>`.
pub async fn authorize_channel(
    State(state): State<AppState>,
    SubscriberUser(user): SubscriberUser,
    Form(body): Form<AuthRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    let response = state
        .auth_service()
        .authenticate(&body.channel_name, &body.socket_id, user.as_ref())?;
    Ok(Json(response))
}

/// POST /api/broadcast — publish an event to channels on the relay.
/// Requires header: x-app-secret: <app_secret>.
pub async fn broadcast(
    State(state): State<AppState>,
    _publisher: Publisher,
    Json(body): Json<BroadcastRequest>,
) -> Result<Json<BroadcastReport>, AppError> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut payload = body.data;
    if let Some(socket) = body.socket {
        payload.insert(SOCKET_KEY.to_string(), serde_json::Value::String(socket));
    }
    let channels: Vec<Channel> = body.channels.iter().map(|c| Channel::from(c.as_str())).collect();

    let report = state
        .broadcaster()
        .broadcast(&channels, &body.event, payload)
        .await?;
    Ok(Json(report))
}

/// GET /health — liveness probe.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "multimirror" })),
    )
}
