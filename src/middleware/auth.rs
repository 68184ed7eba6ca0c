//! Request extractors: optional subscriber identity (bearer JWT) and publisher credential.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use tracing::debug;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::handlers::http::AppState;

pub const HEADER_APP_SECRET: &str = "x-app-secret";

/// Subscriber behind an auth request, if a valid bearer token was sent.
/// A missing or invalid token yields `None`; guarded channels then deny access.
#[derive(Clone, Debug)]
pub struct SubscriberUser(pub Option<AuthenticatedUser>);

#[axum::async_trait]
impl FromRequestParts<AppState> for SubscriberUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok();
        let user = bearer.and_then(|TypedHeader(authorization)| {
            state
                .jwt_secret()
                .validate(authorization.token())
                .map_err(|e| debug!(error = %e, "rejected subscriber token"))
                .ok()
        });
        Ok(SubscriberUser(user))
    }
}

/// Caller allowed to publish: must send `x-app-secret: <app_secret>`.
#[derive(Clone, Copy, Debug)]
pub struct Publisher;

#[axum::async_trait]
impl FromRequestParts<AppState> for Publisher {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(HEADER_APP_SECRET)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if presented.is_empty() || !constant_time_eq(presented.as_bytes(), state.app_secret.as_bytes()) {
            debug!("rejected publish: invalid or missing x-app-secret");
            return Err(AppError::Auth("invalid or missing x-app-secret".to_string()));
        }
        Ok(Publisher)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
