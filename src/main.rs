//! Entry point: load config, wire dependencies, and run the server.

use multimirror::auth::{AuthenticatedUser, JwtSecret};
use multimirror::config::Config;
use multimirror::relay::HttpRelay;
use multimirror::services::{AuthService, Broadcaster, ChannelAuthorizer, ChannelParams};
use multimirror::{create_app, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `user.{id}` is private to its owner; any other guarded channel admits authenticated users.
fn channel_policy() -> ChannelAuthorizer {
    ChannelAuthorizer::new()
        .channel("user.{id}", |user: &AuthenticatedUser, params: &ChannelParams| {
            params.get("id") == Some(&user.id)
        })
        .fallback(|_: &AuthenticatedUser, _: &ChannelParams| true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("config: {}", e))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let broadcaster = Broadcaster::new(
        &config.relay_host,
        &config.app_key,
        &config.app_secret,
        Arc::new(HttpRelay::new()),
    )?;
    let auth_service = AuthService::new(
        config.app_key.clone(),
        config.app_secret.clone(),
        channel_policy(),
    );

    let state = AppState {
        app_secret: config.app_secret.clone(),
        auth_service,
        broadcaster,
        jwt_secret: JwtSecret::new(config.jwt_secret.clone()),
    };

    let app = create_app(state);

    tracing::info!(addr = %config.server_addr, relay = %config.relay_host, "listening");
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
