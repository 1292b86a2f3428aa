//! Event delivery

use async_trait::async_trait;
use obs_core::{Event, API_KEY_HEADER, INGEST_PATH};

use crate::dsn::Dsn;
use crate::error::TransportError;

/// Sends one event to the ingestion gateway
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, event: &Event) -> Result<(), TransportError>;
}

/// Outcome of a single delivery inside a flush
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    pub event_id: String,
    pub success: bool,
    pub error_message: Option<String>,
}

/// HTTP transport posting JSON to `{endpoint}/api/events`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(dsn: &Dsn) -> Self {
        // No request timeout: a flush's time budget is the only cancellation.
        // Idle connections are not pooled because the final flush may run on a
        // different runtime than the one that opened them.
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("obs-sdk/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(0)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to configure HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            });

        Self {
            http_client,
            url: format!("{}{}", dsn.endpoint(), INGEST_PATH),
            api_key: dsn.api_key().to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, event: &Event) -> Result<(), TransportError> {
        let payload = serde_json::to_vec(event)?;

        let response = self
            .http_client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        tracing::debug!("Event {} delivered to {}", event.event_id, self.url);
        Ok(())
    }
}
