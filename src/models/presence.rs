//! Presence channel identity signed into the subscription.

use serde::{Deserialize, Serialize};

/// `channel_data` for presence subscriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceUser {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<serde_json::Value>,
}

impl PresenceUser {
    pub fn new(user_id: impl Into<String>, user_info: Option<serde_json::Value>) -> Self {
        Self {
            user_id: user_id.into(),
            user_info,
        }
    }
}
