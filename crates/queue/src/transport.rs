//! Payload transport.
//!
//! The delivery queue only needs "deliver this batch, report success or
//! failure once". [`HttpTransport`] is the default, POSTing the batch as a
//! JSON array to the collection endpoint.

use std::time::Duration;

use async_trait::async_trait;
use pulse_activity::Activity;
use reqwest::Client;
use tracing::{debug, error};
use url::Url;

use crate::error::TransportError;

/// Delivers batches of payloads to a collection endpoint.
///
/// Called with a non-empty batch. Must report exactly one outcome per call.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `payloads` to `url` as one batch.
    ///
    /// `Ok` means the endpoint accepted the whole batch; any error means
    /// none of it counts as delivered.
    async fn deliver(&self, url: &str, payloads: &[Activity]) -> Result<(), TransportError>;
}

/// HTTP transport posting JSON arrays.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    user_agent: String,
}

impl HttpTransport {
    /// Create a transport with default timeouts.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self::with_client(client))
    }

    /// Create a transport around an existing client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            user_agent: format!("pulse-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn deliver(&self, url: &str, payloads: &[Activity]) -> Result<(), TransportError> {
        let url = Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        let body = serde_json::to_vec(payloads)?;

        debug!(url = %url, batch_size = payloads.len(), "Posting payload batch");

        let response = self
            .client
            .post(url.clone())
            .header("User-Agent", &self.user_agent)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            debug!(url = %url, status = %status, "Payload batch delivered");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            error!(url = %url, status = %status, body = %body, "Payload batch rejected");
            Err(TransportError::DeliveryFailed {
                status: status.as_u16(),
                body,
            })
        }
    }
}
