//! Channel types and naming conventions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, AppResult};

/// Longest channel or event name the relay accepts.
pub const MAX_NAME_LEN: usize = 200;

const PRIVATE_PREFIX: &str = "private-";
const PRESENCE_PREFIX: &str = "presence-";
/// Stripped first so that `private-encrypted-x` normalizes to `x`.
const NORMALIZE_PREFIXES: [&str; 3] = ["private-encrypted-", PRIVATE_PREFIX, PRESENCE_PREFIX];

/// Channel type based on prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// Public channel: no auth required.
    Public,
    /// Private channel: requires a signed subscription.
    Private,
    /// Presence channel: signed subscription carrying user identity.
    Presence,
}

impl ChannelType {
    /// Derive channel type from name. Pusher-style: `private-*`, `presence-*`.
    pub fn from_name(name: &str) -> Self {
        if name.starts_with(PRESENCE_PREFIX) {
            ChannelType::Presence
        } else if name.starts_with(PRIVATE_PREFIX) {
            ChannelType::Private
        } else {
            ChannelType::Public
        }
    }

    /// Private and presence channels are guarded.
    pub fn is_guarded(&self) -> bool {
        matches!(self, ChannelType::Private | ChannelType::Presence)
    }

    fn prefix(&self) -> &'static str {
        match self {
            ChannelType::Public => "",
            ChannelType::Private => PRIVATE_PREFIX,
            ChannelType::Presence => PRESENCE_PREFIX,
        }
    }
}

/// Strip the kind prefix, e.g. `private-orders.1` -> `orders.1`.
pub fn normalize_channel_name(name: &str) -> &str {
    NORMALIZE_PREFIXES
        .iter()
        .find_map(|prefix| name.strip_prefix(*prefix))
        .unwrap_or(name)
}

/// A broadcast target. Displays as the wire name the relay expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    kind: ChannelType,
    name: String,
}

impl Channel {
    pub fn public(name: impl Into<String>) -> Self {
        Self::with_kind(ChannelType::Public, name)
    }

    pub fn private(name: impl Into<String>) -> Self {
        Self::with_kind(ChannelType::Private, name)
    }

    pub fn presence(name: impl Into<String>) -> Self {
        Self::with_kind(ChannelType::Presence, name)
    }

    /// Build from a bare name; a kind prefix already present is not repeated.
    fn with_kind(kind: ChannelType, name: impl Into<String>) -> Self {
        let mut name = name.into();
        if kind.is_guarded() {
            if let Some(bare) = name.strip_prefix(kind.prefix()) {
                name = bare.to_string();
            }
        }
        Self { kind, name }
    }

    pub fn kind(&self) -> ChannelType {
        self.kind
    }

    /// Name without kind prefix.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for Channel {
    /// Parse a wire name; the kind comes from its prefix.
    fn from(wire: &str) -> Self {
        let kind = ChannelType::from_name(wire);
        Self::with_kind(kind, wire)
    }
}

impl From<String> for Channel {
    fn from(wire: String) -> Self {
        Channel::from(wire.as_str())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.name)
    }
}

/// Wire names for a list of channels.
pub fn format_channels(channels: &[Channel]) -> Vec<String> {
    channels.iter().map(Channel::to_string).collect()
}

/// Channel names: 1..=200 chars of `[-a-zA-Z0-9_=@,.;]`.
pub fn validate_channel_name(name: &str) -> AppResult<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(AppError::InvalidChannel(format!(
            "channel name must be 1 to {} characters",
            MAX_NAME_LEN
        )));
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_=@,.;".contains(c));
    if !valid {
        return Err(AppError::InvalidChannel(name.to_string()));
    }
    Ok(())
}

/// Socket ids are `<digits>.<digits>`.
pub fn validate_socket_id(socket_id: &str) -> AppResult<()> {
    let valid = socket_id
        .split_once('.')
        .map(|(a, b)| is_digits(a) && is_digits(b))
        .unwrap_or(false);
    if !valid {
        return Err(AppError::Validation(format!("invalid socket id: {}", socket_id)));
    }
    Ok(())
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
