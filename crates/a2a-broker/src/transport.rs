//! Transport seam for calling remote agents.
//!
//! A failure is a single terminal error, never a partial result. No
//! timeout, retry, or circuit breaker lives at this layer.

use crate::error::TransportError;
use a2a_protocol::{SendMessageRequest, SendMessageResponse, StreamEvent};
use async_trait::async_trait;
use tracing::{debug, error};

/// Contract the remote message transport must satisfy.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn send_message(
        &self,
        agent_url: &str,
        request: SendMessageRequest,
    ) -> Result<SendMessageResponse, TransportError>;

    /// Ordered, finite event sequence: a status update followed by the
    /// result message (or their error counterparts).
    async fn send_streaming_message(
        &self,
        agent_url: &str,
        request: SendMessageRequest,
    ) -> Result<Vec<StreamEvent>, TransportError>;
}

/// JSON-over-HTTP transport against the peer's `/agent/*` endpoints.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        request: &SendMessageRequest,
    ) -> Result<T, TransportError> {
        debug!(%url, request_id = %request.id, "sending message to agent");
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|err| {
                error!(%url, error = %err, "agent call failed");
                TransportError::Http(err.to_string())
            })?;

        let response = response.error_for_status().map_err(|err| {
            error!(%url, error = %err, "agent returned error status");
            TransportError::Http(err.to_string())
        })?;

        response
            .json::<T>()
            .await
            .map_err(|err| TransportError::InvalidResponse(err.to_string()))
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentTransport for HttpTransport {
    async fn send_message(
        &self,
        agent_url: &str,
        request: SendMessageRequest,
    ) -> Result<SendMessageResponse, TransportError> {
        self.post_json(format!("{agent_url}/agent/message"), &request)
            .await
    }

    async fn send_streaming_message(
        &self,
        agent_url: &str,
        request: SendMessageRequest,
    ) -> Result<Vec<StreamEvent>, TransportError> {
        self.post_json(format!("{agent_url}/agent/stream"), &request)
            .await
    }
}
