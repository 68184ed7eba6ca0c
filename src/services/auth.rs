//! Authentication for private and presence channels (Pusher-compatible HMAC).

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::channel::{
    normalize_channel_name, validate_channel_name, validate_socket_id, ChannelType,
};
use crate::models::event::AuthResponse;
use crate::models::presence::PresenceUser;
use crate::services::authorizer::{ChannelAuthorizer, ChannelGrant};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, info, instrument};

type HmacSha256 = Hmac<Sha256>;

/// Signs subscriptions for private/presence channels and verifies presented signatures.
/// Pusher-style: HMAC-SHA256(app_secret, socket_id:channel_name[:channel_data]).
#[derive(Clone)]
pub struct AuthService {
    app_key: String,
    app_secret: String,
    authorizer: ChannelAuthorizer,
}

impl AuthService {
    pub fn new(app_key: String, app_secret: String, authorizer: ChannelAuthorizer) -> Self {
        Self {
            app_key,
            app_secret,
            authorizer,
        }
    }

    fn mac(&self, socket_id: &str, channel: &str, custom_data: Option<&str>) -> AppResult<HmacSha256> {
        let sign_payload = match custom_data.filter(|d| !d.is_empty()) {
            Some(data) => format!("{}:{}:{}", socket_id, channel, data),
            None => format!("{}:{}", socket_id, channel),
        };
        let mut mac = HmacSha256::new_from_slice(self.app_secret.as_bytes())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init: {}", e)))?;
        mac.update(sign_payload.as_bytes());
        Ok(mac)
    }

    /// Hex signature over `socket_id:channel[:custom_data]`.
    pub fn sign(&self, socket_id: &str, channel: &str, custom_data: Option<&str>) -> AppResult<String> {
        let mac = self.mac(socket_id, channel, custom_data)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Build the auth body handed back to the subscriber.
    pub fn socket_auth(
        &self,
        channel: &str,
        socket_id: &str,
        custom_data: Option<&str>,
    ) -> AppResult<AuthResponse> {
        let signature = self.sign(socket_id, channel, custom_data)?;
        Ok(AuthResponse {
            auth: format!("{}:{}", self.app_key, signature),
            channel_data: custom_data.filter(|d| !d.is_empty()).map(str::to_string),
        })
    }

    /// Verify that a subscriber presented a valid signature for the channel.
    /// `auth` is either `<app_key>:<signature>` or the bare signature.
    pub fn verify(
        &self,
        channel: &str,
        socket_id: &str,
        auth: Option<&str>,
        channel_data: Option<&str>,
    ) -> AppResult<()> {
        if !ChannelType::from_name(channel).is_guarded() {
            return Ok(());
        }

        let auth = auth.ok_or_else(|| {
            AppError::AccessDenied("missing auth for private/presence channel".to_string())
        })?;
        let signature = match auth.split_once(':') {
            Some((key, sig)) if key == self.app_key => sig,
            Some(_) => return Err(AppError::AccessDenied("auth key mismatch".to_string())),
            None => auth,
        };
        let signature = hex::decode(signature)
            .map_err(|_| AppError::AccessDenied("invalid auth signature".to_string()))?;

        self.mac(socket_id, channel, channel_data)?
            .verify_slice(&signature)
            .map_err(|_| {
                debug!(channel = %channel, "auth signature mismatch");
                AppError::AccessDenied("invalid auth signature".to_string())
            })
    }

    /// Authorize `user` for `channel_name` and sign the subscription.
    #[instrument(skip(self, user), fields(user_id = user.map(|u| u.id.as_str())))]
    pub fn authenticate(
        &self,
        channel_name: &str,
        socket_id: &str,
        user: Option<&AuthenticatedUser>,
    ) -> AppResult<AuthResponse> {
        validate_socket_id(socket_id)?;
        validate_channel_name(channel_name)?;

        let channel_type = ChannelType::from_name(channel_name);
        if !channel_type.is_guarded() {
            return Err(AppError::AccessDenied(
                "public channels do not take subscription auth".to_string(),
            ));
        }

        let user = user.ok_or_else(|| {
            AppError::AccessDenied("no authenticated user for guarded channel".to_string())
        })?;

        let info = match self.authorizer.authorize(normalize_channel_name(channel_name), user) {
            ChannelGrant::Deny => {
                info!(channel = %channel_name, "channel access denied");
                return Err(AppError::AccessDenied(format!(
                    "user may not access {}",
                    channel_name
                )));
            }
            ChannelGrant::Allow => user.info.clone(),
            ChannelGrant::AllowWithInfo(info) => Some(info),
        };

        let response = match channel_type {
            ChannelType::Presence => {
                let member = PresenceUser::new(user.id.clone(), info);
                let channel_data = serde_json::to_string(&member)?;
                self.socket_auth(channel_name, socket_id, Some(&channel_data))?
            }
            _ => self.socket_auth(channel_name, socket_id, None)?,
        };
        debug!(channel = %channel_name, "subscription signed");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::authorizer::ChannelParams;
    use serde_json::json;

    fn service() -> AuthService {
        let authorizer = ChannelAuthorizer::new()
            .channel("user.{id}", |user: &AuthenticatedUser, params: &ChannelParams| {
                params.get("id") == Some(&user.id)
            })
            .channel("room.{id}", |user: &AuthenticatedUser, _: &ChannelParams| {
                ChannelGrant::AllowWithInfo(json!({ "name": format!("user {}", user.id) }))
            })
            .channel("lobby", |_: &AuthenticatedUser, _: &ChannelParams| true);
        AuthService::new("key".to_string(), "secret".to_string(), authorizer)
    }

    fn independent_hmac(secret: &str, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn signature_is_deterministic_and_reproducible() {
        let auth = service();
        let first = auth.sign("123.456", "private-foo", None).unwrap();
        let second = auth.sign("123.456", "private-foo", None).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, independent_hmac("secret", "123.456:private-foo"));
        assert_eq!(
            auth.sign("123.456", "presence-foo", Some(r#"{"user_id":"1"}"#)).unwrap(),
            independent_hmac("secret", r#"123.456:presence-foo:{"user_id":"1"}"#)
        );
    }

    #[test]
    fn socket_auth_prefixes_app_key() {
        let response = service().socket_auth("private-foo", "123.456", None).unwrap();
        assert_eq!(
            response.auth,
            format!("key:{}", independent_hmac("secret", "123.456:private-foo"))
        );
        assert!(response.channel_data.is_none());
    }

    #[test]
    fn test_verify_private_channel_auth() {
        let auth = service();
        let signed = auth.socket_auth("private-foo", "123.456", None).unwrap();
        assert!(auth
            .verify("private-foo", "123.456", Some(&signed.auth), None)
            .is_ok());
        let bare = auth.sign("123.456", "private-foo", None).unwrap();
        assert!(auth.verify("private-foo", "123.456", Some(&bare), None).is_ok());
    }

    #[test]
    fn test_verify_private_channel_auth_fail_wrong_sig() {
        let auth = service();
        assert!(matches!(
            auth.verify("private-foo", "123.456", Some("wrong"), None),
            Err(AppError::AccessDenied(_))
        ));
        let other_socket = auth.sign("999.1", "private-foo", None).unwrap();
        assert!(auth
            .verify("private-foo", "123.456", Some(&other_socket), None)
            .is_err());
        let signed = auth.sign("123.456", "private-foo", None).unwrap();
        assert!(auth
            .verify("private-foo", "123.456", Some(&format!("other:{}", signed)), None)
            .is_err());
        assert!(auth.verify("private-foo", "123.456", None, None).is_err());
    }

    #[test]
    fn test_public_channel_no_auth_required() {
        assert!(service().verify("public-foo", "123.456", None, None).is_ok());
    }

    #[test]
    fn authenticate_private_channel_for_owner() {
        let auth = service();
        let user = AuthenticatedUser::new("7");
        let response = auth
            .authenticate("private-user.7", "1.2", Some(&user))
            .unwrap();
        assert!(auth
            .verify("private-user.7", "1.2", Some(&response.auth), None)
            .is_ok());
        assert!(matches!(
            auth.authenticate("private-user.8", "1.2", Some(&user)),
            Err(AppError::AccessDenied(_))
        ));
    }

    #[test]
    fn authenticate_requires_user_for_guarded_channels() {
        assert!(matches!(
            service().authenticate("private-lobby", "1.2", None),
            Err(AppError::AccessDenied(_))
        ));
    }

    #[test]
    fn authenticate_refuses_public_and_malformed_input() {
        let auth = service();
        let user = AuthenticatedUser::new("7");
        assert!(matches!(
            auth.authenticate("lobby", "1.2", Some(&user)),
            Err(AppError::AccessDenied(_))
        ));
        assert!(matches!(
            auth.authenticate("private-lobby", "not-a-socket", Some(&user)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            auth.authenticate("private-lob by", "1.2", Some(&user)),
            Err(AppError::InvalidChannel(_))
        ));
    }

    #[test]
    fn authenticate_presence_signs_channel_data() {
        let auth = service();
        let user = AuthenticatedUser::new("7");
        let response = auth
            .authenticate("presence-room.1", "1.2", Some(&user))
            .unwrap();
        let channel_data = response.channel_data.clone().unwrap();
        let member: PresenceUser = serde_json::from_str(&channel_data).unwrap();
        assert_eq!(member.user_id, "7");
        assert_eq!(member.user_info, Some(json!({ "name": "user 7" })));
        assert!(auth
            .verify("presence-room.1", "1.2", Some(&response.auth), Some(&channel_data))
            .is_ok());
    }

    #[test]
    fn presence_verify_rejects_tampered_or_missing_channel_data() {
        let auth = service();
        let user = AuthenticatedUser::new("7");
        let response = auth
            .authenticate("presence-room.1", "1.2", Some(&user))
            .unwrap();
        assert!(matches!(
            auth.verify(
                "presence-room.1",
                "1.2",
                Some(&response.auth),
                Some(r#"{"user_id":"8"}"#)
            ),
            Err(AppError::AccessDenied(_))
        ));
        assert!(matches!(
            auth.verify("presence-room.1", "1.2", Some(&response.auth), None),
            Err(AppError::AccessDenied(_))
        ));
    }

    #[test]
    fn presence_falls_back_to_token_info() {
        let auth = service();
        let user = AuthenticatedUser::new("7").with_info(json!({ "name": "Ada" }));
        let response = auth.authenticate("presence-lobby", "1.2", Some(&user)).unwrap();
        assert_eq!(
            response.channel_data.as_deref(),
            Some(r#"{"user_id":"7","user_info":{"name":"Ada"}}"#)
        );
    }
}
