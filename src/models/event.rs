//! Event and message models for the relay API and the HTTP surface.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body of one publish call to the relay (`POST /apps/<key>/events`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishEvent {
    pub channel: String,
    pub name: String,
    /// JSON-encoded payload.
    pub data: String,
    /// Connection excluded from delivery, usually the sender.
    pub connection_id: Option<String>,
}

/// Raw relay answer for one publish call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    /// 2xx with a non-empty JSON body.
    pub fn acknowledgement(&self) -> Option<serde_json::Value> {
        if !(200..=299).contains(&self.status) {
            return None;
        }
        let value: serde_json::Value = serde_json::from_str(&self.body).ok()?;
        let empty = match &value {
            serde_json::Value::Null => true,
            serde_json::Value::Bool(b) => !b,
            serde_json::Value::String(s) => s.is_empty(),
            serde_json::Value::Array(a) => a.is_empty(),
            serde_json::Value::Object(o) => o.is_empty(),
            serde_json::Value::Number(_) => false,
        };
        (!empty).then_some(value)
    }
}

/// Relay acknowledgement for one channel.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelAck {
    pub channel: String,
    pub response: serde_json::Value,
}

/// Outcome of a fully acknowledged broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastReport {
    pub event: String,
    pub acks: Vec<ChannelAck>,
}

/// Payload for the HTTP API to trigger a broadcast.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BroadcastRequest {
    #[validate(length(min = 1, message = "at least one channel is required"))]
    pub channels: Vec<String>,
    #[validate(length(min = 1, max = 200))]
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    /// Socket id to exclude; merged into `data` as `socket`.
    #[serde(default)]
    pub socket: Option<String>,
}

/// Subscriber auth request as sent by Pusher clients (form encoded).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthRequest {
    #[validate(length(min = 1))]
    pub socket_id: String,
    #[validate(length(min = 1, max = 200))]
    pub channel_name: String,
}

/// Signed subscription, returned to the subscriber and presented to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// `<app_key>:<hex signature>`.
    pub auth: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<String>,
}
