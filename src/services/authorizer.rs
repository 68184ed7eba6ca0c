//! Channel access callbacks, matched on normalized channel names such as `orders.{id}`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::auth::AuthenticatedUser;

/// Placeholder values captured from a channel name.
pub type ChannelParams = HashMap<String, String>;

/// Answer of a channel callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelGrant {
    Deny,
    Allow,
    /// Allow, with the user info presence members will see.
    AllowWithInfo(serde_json::Value),
}

impl From<bool> for ChannelGrant {
    fn from(allowed: bool) -> Self {
        if allowed {
            ChannelGrant::Allow
        } else {
            ChannelGrant::Deny
        }
    }
}

type Callback = Arc<dyn Fn(&AuthenticatedUser, &ChannelParams) -> ChannelGrant + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    Param(String),
}

/// Parsed channel pattern. `{name}` matches one or more characters other than `.`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPattern {
    source: String,
    tokens: Vec<Token>,
}

impl ChannelPattern {
    pub fn parse(source: &str) -> Self {
        let mut tokens = Vec::new();
        let mut rest = source;
        while !rest.is_empty() {
            match rest.find('{') {
                Some(open) => {
                    let Some(close) = rest[open..].find('}').map(|c| open + c) else {
                        tokens.push(Token::Literal(rest.to_string()));
                        break;
                    };
                    if open > 0 {
                        tokens.push(Token::Literal(rest[..open].to_string()));
                    }
                    tokens.push(Token::Param(rest[open + 1..close].to_string()));
                    rest = &rest[close + 1..];
                }
                None => {
                    tokens.push(Token::Literal(rest.to_string()));
                    break;
                }
            }
        }
        Self {
            source: source.to_string(),
            tokens,
        }
    }

    /// Captured params when `channel` matches the whole pattern.
    pub fn matches(&self, channel: &str) -> Option<ChannelParams> {
        let mut params = ChannelParams::new();
        match_tokens(&self.tokens, channel, &mut params).then_some(params)
    }
}

fn match_tokens(tokens: &[Token], input: &str, params: &mut ChannelParams) -> bool {
    match tokens.split_first() {
        None => input.is_empty(),
        Some((Token::Literal(lit), rest)) => input
            .strip_prefix(lit.as_str())
            .map_or(false, |tail| match_tokens(rest, tail, params)),
        Some((Token::Param(name), rest)) => {
            let segment_end = input.find('.').unwrap_or(input.len());
            // Longest capture first, backtracking toward one character.
            for end in (1..=segment_end).rev() {
                if !input.is_char_boundary(end) {
                    continue;
                }
                if match_tokens(rest, &input[end..], params) {
                    params.insert(name.clone(), input[..end].to_string());
                    return true;
                }
            }
            false
        }
    }
}

/// Ordered channel callbacks; first matching pattern decides.
#[derive(Clone, Default)]
pub struct ChannelAuthorizer {
    routes: Vec<(ChannelPattern, Callback)>,
    fallback: Option<Callback>,
}

impl ChannelAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for a normalized channel pattern.
    pub fn channel<F, G>(mut self, pattern: &str, callback: F) -> Self
    where
        F: Fn(&AuthenticatedUser, &ChannelParams) -> G + Send + Sync + 'static,
        G: Into<ChannelGrant>,
    {
        let wrapped: Callback = Arc::new(
            move |user: &AuthenticatedUser, params: &ChannelParams| -> ChannelGrant {
                callback(user, params).into()
            },
        );
        self.routes.push((ChannelPattern::parse(pattern), wrapped));
        self
    }

    /// Callback used when no pattern matches. Without one, unmatched channels are denied.
    pub fn fallback<F, G>(mut self, callback: F) -> Self
    where
        F: Fn(&AuthenticatedUser, &ChannelParams) -> G + Send + Sync + 'static,
        G: Into<ChannelGrant>,
    {
        let wrapped: Callback = Arc::new(
            move |user: &AuthenticatedUser, params: &ChannelParams| -> ChannelGrant {
                callback(user, params).into()
            },
        );
        self.fallback = Some(wrapped);
        self
    }

    /// Decide access for `user` on a normalized channel name.
    pub fn authorize(&self, channel: &str, user: &AuthenticatedUser) -> ChannelGrant {
        for (pattern, callback) in &self.routes {
            if let Some(params) = pattern.matches(channel) {
                let grant = callback(user, &params);
                debug!(channel = %channel, pattern = %pattern.source, ?grant, "channel callback");
                return grant;
            }
        }
        match &self.fallback {
            Some(callback) => callback(user, &ChannelParams::new()),
            None => {
                debug!(channel = %channel, "no channel callback matched");
                ChannelGrant::Deny
            }
        }
    }
}

impl fmt::Debug for ChannelAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let patterns: Vec<&str> = self.routes.iter().map(|(p, _)| p.source.as_str()).collect();
        f.debug_struct("ChannelAuthorizer")
            .field("patterns", &patterns)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
