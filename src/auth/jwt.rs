//! JWT issue and validation for subscriber identity.

use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    pub sub: String, // application user id
    pub exp: i64,
    pub iat: i64,
    /// Shown to other members of presence channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Value>,
}

/// The application user behind a subscriber auth request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub info: Option<serde_json::Value>,
}

impl AuthenticatedUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            info: None,
        }
    }

    pub fn with_info(mut self, info: serde_json::Value) -> Self {
        self.info = Some(info);
        self
    }
}

#[derive(Clone)]
pub struct JwtSecret {
    secret: String,
}

impl JwtSecret {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Mint a subscriber token for application backends. Valid for one day.
    pub fn issue(&self, user: &AuthenticatedUser) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            exp: (now + Duration::days(1)).timestamp(),
            iat: now.timestamp(),
            info: user.info.clone(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Jwt(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> AppResult<AuthenticatedUser> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| AppError::Jwt(e.to_string()))?;
        if data.claims.sub.is_empty() {
            return Err(AppError::Jwt("empty subject".to_string()));
        }
        Ok(AuthenticatedUser {
            id: data.claims.sub,
            info: data.claims.info,
        })
    }
}
