//! `reqwest` transport for the relay events API.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::{debug, warn};

use super::RelayTransport;
use crate::error::AppResult;
use crate::models::event::{PublishEvent, UpstreamResponse};

#[derive(Clone, Default)]
pub struct HttpRelay {
    client: Client,
}

impl HttpRelay {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl RelayTransport for HttpRelay {
    async fn publish(&self, url: &reqwest::Url, event: &PublishEvent) -> AppResult<UpstreamResponse> {
        let response = self
            .client
            .post(url.clone())
            .header(ACCEPT, "application/json")
            .json(event)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(channel = %event.channel, status, error = %e, "relay body unreadable");
                format!("failed to read relay response: {}", e)
            }
        };
        debug!(channel = %event.channel, status, "relay answered");
        Ok(UpstreamResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one request, answering with `head` and then `body`, and closes.
    async fn serve_once(head: &'static str, body: &'static str) -> reqwest::Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            let header_end = loop {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed before sending headers");
                request.extend_from_slice(&buf[..n]);
                if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
            let length: usize = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);
            while request.len() < header_end + length {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}/apps/k/events?auth_key=s", addr).parse().unwrap()
    }

    fn event() -> PublishEvent {
        PublishEvent {
            channel: "news".to_string(),
            name: "Tick".to_string(),
            data: "{}".to_string(),
            connection_id: None,
        }
    }

    #[tokio::test]
    async fn returns_status_and_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 11\r\nConnection: close\r\n\r\n",
            r#"{"ok":true}"#,
        )
        .await;
        let response = HttpRelay::new().publish(&url, &event()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn truncated_body_keeps_status() {
        let url = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 100\r\nConnection: close\r\n\r\n",
            "short",
        )
        .await;
        let response = HttpRelay::new().publish(&url, &event()).await.unwrap();
        assert_eq!(response.status, 503);
        assert!(response.body.starts_with("failed to read relay response"));
        assert!(response.acknowledgement().is_none());
    }
}
