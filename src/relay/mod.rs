//! Outbound connection to the Multimirror relay.

mod http;

pub use http::HttpRelay;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::event::{PublishEvent, UpstreamResponse};

/// Posts one event to the relay. `Err` means the relay could not be reached;
/// any HTTP answer, including error statuses, is an `Ok` response.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn publish(&self, url: &reqwest::Url, event: &PublishEvent) -> AppResult<UpstreamResponse>;
}
