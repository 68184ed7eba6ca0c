//! Publish gateway: one relay call per channel, failures aggregated across the batch.

use reqwest::Url;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::{AppError, AppResult, BroadcastFailure, ChannelFailure};
use crate::models::channel::{format_channels, validate_channel_name, Channel, MAX_NAME_LEN};
use crate::models::event::{BroadcastReport, ChannelAck, PublishEvent, UpstreamResponse};
use crate::relay::RelayTransport;

/// Payload key holding the socket id to exclude from delivery.
pub const SOCKET_KEY: &str = "socket";

/// Forwards events to `<host>/apps/<app_key>/events?auth_key=<app_secret>`.
#[derive(Clone)]
pub struct Broadcaster {
    transport: Arc<dyn RelayTransport>,
    events_url: Url,
}

impl Broadcaster {
    pub fn new(
        host: &str,
        app_key: &str,
        app_secret: &str,
        transport: Arc<dyn RelayTransport>,
    ) -> AppResult<Self> {
        let base = format!("{}/apps/{}/events", host.trim_end_matches('/'), app_key);
        let events_url = Url::parse_with_params(&base, &[("auth_key", app_secret)])
            .map_err(|e| AppError::Config(format!("invalid relay host {}: {}", host, e)))?;
        Ok(Self {
            transport,
            events_url,
        })
    }

    /// Full events endpoint, including the secret in its query.
    pub fn events_url(&self) -> &Url {
        &self.events_url
    }

    /// Publish `data` on every channel in order and return each raw outcome.
    pub async fn trigger(
        &self,
        channels: &[String],
        event: &str,
        data: &str,
        connection_id: Option<&str>,
    ) -> Vec<(String, AppResult<UpstreamResponse>)> {
        let mut outcomes = Vec::with_capacity(channels.len());
        for channel in channels {
            let publish = PublishEvent {
                channel: channel.clone(),
                name: event.to_string(),
                data: data.to_string(),
                connection_id: connection_id.map(str::to_string),
            };
            let outcome = self.transport.publish(&self.events_url, &publish).await;
            outcomes.push((channel.clone(), outcome));
        }
        outcomes
    }

    /// Broadcast `event` with `payload` to `channels`.
    ///
    /// A string `socket` entry is removed from the payload and sent as the
    /// excluded connection; any other `socket` value stays in the payload.
    /// Every channel is attempted; if any of them is not acknowledged the
    /// call fails with all failing channels and their upstream responses.
    #[instrument(skip(self, channels, payload), fields(channel_count = channels.len()))]
    pub async fn broadcast(
        &self,
        channels: &[Channel],
        event: &str,
        mut payload: Map<String, Value>,
    ) -> AppResult<BroadcastReport> {
        if channels.is_empty() {
            return Err(AppError::Validation("at least one channel is required".to_string()));
        }
        if event.is_empty() || event.chars().count() > MAX_NAME_LEN {
            return Err(AppError::Validation(format!(
                "event name must be 1 to {} characters",
                MAX_NAME_LEN
            )));
        }
        let names = format_channels(channels);
        for name in &names {
            validate_channel_name(name)?;
        }

        let connection_id = match payload.remove(SOCKET_KEY) {
            Some(Value::String(socket)) if !socket.is_empty() => Some(socket),
            Some(Value::String(_)) | None => None,
            Some(other) => {
                warn!(socket = %other, "non-string socket left in payload");
                payload.insert(SOCKET_KEY.to_string(), other);
                None
            }
        };
        let data = serde_json::to_string(&payload)?;

        let outcomes = self
            .trigger(&names, event, &data, connection_id.as_deref())
            .await;

        let mut acks = Vec::new();
        let mut failures = Vec::new();
        for (channel, outcome) in outcomes {
            match outcome {
                Ok(response) => match response.acknowledgement() {
                    Some(ack) => acks.push(ChannelAck {
                        channel,
                        response: ack,
                    }),
                    None => {
                        warn!(channel = %channel, status = response.status, "relay rejected event");
                        failures.push(ChannelFailure {
                            channel,
                            status: Some(response.status),
                            body: response.body,
                        });
                    }
                },
                Err(e) => {
                    warn!(channel = %channel, error = %e, "failed to connect to relay");
                    failures.push(ChannelFailure {
                        channel,
                        status: None,
                        body: format!("failed to connect to relay: {}", e),
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(AppError::BroadcastFailed(BroadcastFailure {
                event: event.to_string(),
                delivered: acks.len(),
                failures,
            }));
        }

        info!(event = %event, delivered = acks.len(), "broadcast");
        Ok(BroadcastReport {
            event: event.to_string(),
            acks,
        })
    }
}
