//! Broadcasting adapter for the Multimirror realtime relay (Pusher protocol).
//!
//! Signs private and presence channel subscriptions with HMAC-SHA256 and
//! forwards published events to the relay's HTTP events API, one call per channel.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod relay;
pub mod services;

pub use config::Config;
pub use error::AppError;
pub use handlers::http::AppState;
pub use services::auth::AuthService;
pub use services::broadcaster::Broadcaster;

use axum::routing::{get, post};
use handlers::http;
use tower_http::trace::TraceLayer;

/// Build the API router (auth, broadcast, health). Used by main and by integration tests.
pub fn create_app(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/broadcasting/auth", post(http::authorize_channel))
        .route("/api/broadcast", post(http::broadcast))
        .route("/health", get(http::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
