//! Webhook unknown-queue sink
//!
//! Events are queued on a bounded channel and POSTed by a background task that
//! runs on its own worker thread, so a slow or unreachable receiver never
//! delays normalization. Each request is bounded by the configured timeout;
//! failures are logged and dropped (no retry).

use super::{UnknownQueueEvent, UnknownQueueSink};
use std::sync::mpsc as std_mpsc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Pending deliveries held before new events are dropped
pub const WEBHOOK_QUEUE_CAPACITY: usize = 256;
/// Shared-secret header understood by the unknown-queue receiver
pub const TOKEN_HEADER: &str = "X-Webhook-Token";

const USER_AGENT: &str = concat!("beanlens-norm/", env!("CARGO_PKG_VERSION"));

/// Webhook sink errors
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Receiver returned status {0}")]
    Status(u16),

    #[error("Worker unavailable: {0}")]
    Worker(String),
}

#[derive(Debug)]
enum Message {
    Deliver(Box<UnknownQueueEvent>),
    /// Acknowledged once every earlier message has been handled
    Flush(std_mpsc::Sender<()>),
}

/// Handle to the background delivery worker
#[derive(Debug)]
pub struct WebhookSink {
    url: String,
    tx: mpsc::Sender<Message>,
}

impl WebhookSink {
    /// Start the delivery worker
    pub fn spawn(url: &str, token: Option<String>, timeout: Duration) -> Result<Self, WebhookError> {
        let client = WebhookClient::new(url, token, timeout)?;
        let (tx, rx) = mpsc::channel(WEBHOOK_QUEUE_CAPACITY);

        std::thread::Builder::new()
            .name("unknown-queue-webhook".to_string())
            .spawn(move || run_worker(client, rx))
            .map_err(|e| WebhookError::Worker(e.to_string()))?;

        debug!(url = %url, timeout_ms = timeout.as_millis() as u64, "Webhook sink started");
        Ok(Self {
            url: url.to_string(),
            tx,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl UnknownQueueSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn deliver(&self, event: &UnknownQueueEvent) {
        match self.tx.try_send(Message::Deliver(Box::new(event.clone()))) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(url = %self.url, raw = %event.raw, "Webhook queue full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(url = %self.url, "Webhook worker stopped, dropping event");
            }
        }
    }

    fn flush(&self, timeout: Duration) -> bool {
        let (ack_tx, ack_rx) = std_mpsc::channel();
        if self.tx.try_send(Message::Flush(ack_tx)).is_err() {
            return false;
        }
        ack_rx.recv_timeout(timeout).is_ok()
    }
}

fn run_worker(client: WebhookClient, mut rx: mpsc::Receiver<Message>) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            warn!(error = %e, "Failed to start webhook runtime, events will be dropped");
            return;
        }
    };

    runtime.block_on(async move {
        while let Some(message) = rx.recv().await {
            match message {
                Message::Deliver(event) => {
                    if let Err(e) = client.post(&event).await {
                        warn!(
                            url = %client.url,
                            domain = %event.domain,
                            raw = %event.raw,
                            error = %e,
                            "Webhook delivery failed"
                        );
                    }
                }
                Message::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
        debug!(url = %client.url, "Webhook worker stopped");
    });
}

struct WebhookClient {
    http_client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl WebhookClient {
    fn new(url: &str, token: Option<String>, timeout: Duration) -> Result<Self, WebhookError> {
        reqwest::Url::parse(url).map_err(|e| WebhookError::Client(format!("invalid URL '{}': {}", url, e)))?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| WebhookError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    async fn post(&self, event: &UnknownQueueEvent) -> Result<(), WebhookError> {
        let mut request = self.http_client.post(&self.url).json(event);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token).header(TOKEN_HEADER, token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| WebhookError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::Status(status.as_u16()));
        }

        debug!(url = %self.url, raw = %event.raw, "Webhook delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_rejected() {
        let result = WebhookSink::spawn("not a url", None, Duration::from_secs(1));
        assert!(matches!(result, Err(WebhookError::Client(_))));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(WebhookError::Status(503).to_string(), "Receiver returned status 503");
    }

    #[test]
    fn test_flush_with_no_pending_events() {
        let sink = WebhookSink::spawn("http://127.0.0.1:9/unknown", None, Duration::from_millis(200)).unwrap();
        assert!(sink.flush(Duration::from_secs(5)));
        assert_eq!(sink.name(), "webhook");
    }
}
