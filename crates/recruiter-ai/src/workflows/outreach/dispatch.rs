use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use super::safety::{UnsafeUrl, WebhookUrlPolicy};
use super::script::WebhookPayload;

/// Single fixed deadline for the whole POST. There is no retry queue; a
/// timeout surfaces immediately as a failed dispatch.
pub const DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One named destination for a dispatch. Built fresh per batch; the URL is
/// re-validated on every call because verdicts must not outlive DNS state.
#[derive(Debug, Clone)]
pub struct WebhookTarget {
    pub tool: String,
    pub url: Url,
}

/// Raw HTTP reply as seen by the dispatcher, before 2xx classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReply {
    pub status: u16,
    pub body: String,
}

/// Failures below the HTTP layer: timeouts, refused connections, TLS trouble.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("transport failure: {0}")]
    Other(String),
}

/// Wire seam so the dispatcher can be exercised without real sockets.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<TransportReply, TransportError>;
}

/// Production transport backed by a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(DISPATCH_TIMEOUT)
            .build()
            .map_err(|err| TransportError::Other(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<TransportReply, TransportError> {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    TransportError::Timeout(DISPATCH_TIMEOUT)
                } else if err.is_connect() {
                    TransportError::Connect(err.to_string())
                } else {
                    TransportError::Other(err.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::Other(err.to_string()))?;

        Ok(TransportReply { status, body })
    }
}

/// A 2xx reply, with the platform's response body when one was returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSuccess {
    pub status: u16,
    pub body: Value,
}

/// Everything that can go wrong for a single dispatch. None of these variants
/// escape the per-candidate boundary in the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unsafe webhook URL: {0}")]
    UnsafeUrl(#[from] UnsafeUrl),
    #[error("webhook returned HTTP {status}")]
    Http { status: u16, body: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to encode webhook payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Performs one validated POST per call. No retries, no verdict caching.
pub struct WebhookDispatcher<T> {
    policy: WebhookUrlPolicy,
    transport: T,
}

impl<T> WebhookDispatcher<T>
where
    T: WebhookTransport,
{
    pub fn new(policy: WebhookUrlPolicy, transport: T) -> Self {
        Self { policy, transport }
    }

    /// Validates `target`, POSTs `payload` as JSON, and normalizes the reply.
    ///
    /// A validation failure returns before any network I/O. An empty 2xx body
    /// is reported as `{"status": "success"}` so callers always see a JSON
    /// value; a non-JSON 2xx body is carried through as a JSON string.
    pub async fn dispatch(
        &self,
        target: &WebhookTarget,
        payload: &WebhookPayload,
    ) -> Result<DispatchSuccess, DispatchError> {
        self.policy.validate(&target.url)?;

        let body = serde_json::to_value(payload)?;
        debug!(tool = %target.tool, url = %target.url, "dispatching webhook payload");

        let reply = self.transport.post_json(&target.url, &body).await?;

        if !(200..300).contains(&reply.status) {
            return Err(DispatchError::Http {
                status: reply.status,
                body: reply.body,
            });
        }

        info!(tool = %target.tool, status = reply.status, "webhook accepted payload");

        let body = if reply.body.trim().is_empty() {
            serde_json::json!({ "status": "success" })
        } else {
            serde_json::from_str(&reply.body).unwrap_or(Value::String(reply.body))
        };

        Ok(DispatchSuccess {
            status: reply.status,
            body,
        })
    }
}
