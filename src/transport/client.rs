use std::convert::Infallible;
use std::sync::Arc;

use futures_util::stream::{AbortHandle, Abortable, BoxStream};
use futures_util::StreamExt;
use serde_json::{Map, Value};

use crate::error::BridgeError;
use crate::protocol::chunk::ParseResult;
use crate::protocol::message::{convert_to_outbound_parts, AgentMessage, QueryBody};
use crate::protocol::prompt::ConversationMessage;
use crate::stream::{agent_chunk_stream, CancelPolicy, TranslatedStream};

use super::capability::SupportedUrls;

/// Provider identifier reported by [`AgentClient::provider`].
pub const PROVIDER_ID: &str = "agent-gateway";

/// Normalized event stream returned by [`AgentClient::stream`].
pub type AgentEventStream = TranslatedStream<Abortable<BoxStream<'static, ParseResult>>>;

/// Per-call inputs.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub prompt: Vec<ConversationMessage>,
    /// Extra `kwargs` merged over the reserved agent-name key.
    pub overrides: Option<Map<String, Value>>,
}

impl CallOptions {
    #[must_use]
    pub fn new(prompt: Vec<ConversationMessage>) -> Self {
        Self {
            prompt,
            overrides: None,
        }
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: Map<String, Value>) -> Self {
        self.overrides = Some(overrides);
        self
    }
}

/// A running generation.
pub struct StreamResponse {
    pub events: AgentEventStream,
    /// Aborting ends `events` according to the client's [`CancelPolicy`].
    pub abort_handle: AbortHandle,
    pub request_body: QueryBody,
    pub response_headers: http::HeaderMap,
}

/// Model handle bound to one agent on the gateway.
#[derive(Debug, Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    query_url: url::Url,
    headers: Arc<http::HeaderMap>,
    agent_name: String,
    cancel_policy: CancelPolicy,
    supported_urls: Arc<SupportedUrls>,
}

impl AgentClient {
    pub(crate) fn new(
        http: reqwest::Client,
        query_url: url::Url,
        headers: Arc<http::HeaderMap>,
        agent_name: String,
        cancel_policy: CancelPolicy,
        supported_urls: Arc<SupportedUrls>,
    ) -> Self {
        Self {
            http,
            query_url,
            headers,
            agent_name,
            cancel_policy,
            supported_urls,
        }
    }

    #[must_use]
    pub fn provider(&self) -> &'static str {
        PROVIDER_ID
    }

    #[must_use]
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    #[must_use]
    pub fn query_url(&self) -> &url::Url {
        &self.query_url
    }

    #[must_use]
    pub fn cancel_policy(&self) -> CancelPolicy {
        self.cancel_policy
    }

    #[must_use]
    pub fn supported_urls(&self) -> &SupportedUrls {
        &self.supported_urls
    }

    /// Build the request body without sending it.
    ///
    /// # Errors
    ///
    /// Propagates conversion failures from
    /// [`convert_to_outbound_parts`].
    pub fn build_query_body(&self, options: &CallOptions) -> Result<QueryBody, BridgeError> {
        let parts = convert_to_outbound_parts(&options.prompt)?;
        let message = AgentMessage::new(&self.agent_name, options.overrides.as_ref(), parts);
        QueryBody::new(message)
    }

    /// Non-streaming generation is not offered by the gateway.
    ///
    /// # Errors
    ///
    /// Always returns [`BridgeError::CapabilityNotSupported`]; nothing is sent.
    pub async fn generate(&self, _options: CallOptions) -> Result<Infallible, BridgeError> {
        Err(BridgeError::CapabilityNotSupported(
            "Non-streaming output".to_string(),
        ))
    }

    /// Send the last user message to the agent and stream the reply.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Prompt`] or [`BridgeError::CapabilityNotSupported`]
    /// before any request is made, [`BridgeError::Transport`] when the request
    /// cannot be sent, and [`BridgeError::Upstream`] for a non-success status.
    pub async fn stream(&self, options: CallOptions) -> Result<StreamResponse, BridgeError> {
        let request_body = self.build_query_body(&options)?;
        let payload = serde_json::to_vec(&request_body)
            .map_err(|err| BridgeError::Internal(format!("failed to encode request: {err}")))?;

        tracing::debug!(
            agent = %self.agent_name,
            parts = request_body.values.parts.len(),
            url = %self.query_url,
            "sending agent query"
        );

        let response = self
            .http
            .post(self.query_url.clone())
            .headers((*self.headers).clone())
            .body(payload)
            .send()
            .await
            .map_err(|err| BridgeError::Transport(format!("Request failed: {err}")))?;

        let status = response.status();
        let response_headers = response.headers().clone();
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "agent gateway rejected query");
            return Err(upstream_error(status.as_u16(), response.text().await));
        }

        let (abort_handle, registration) = AbortHandle::new_pair();
        let chunks = agent_chunk_stream(response.bytes_stream()).boxed();
        let events = TranslatedStream::new(Abortable::new(chunks, registration))
            .with_cancellation(abort_handle.clone(), self.cancel_policy);

        Ok(StreamResponse {
            events,
            abort_handle,
            request_body,
            response_headers,
        })
    }
}

fn upstream_error<E: std::fmt::Display>(status: u16, body: Result<String, E>) -> BridgeError {
    let message = match body {
        Ok(body) => body,
        Err(err) => {
            tracing::debug!(status, error = %err, "failed to read gateway error body");
            format!("failed to read response body: {err}")
        }
    };
    BridgeError::Upstream { status, message }
}
