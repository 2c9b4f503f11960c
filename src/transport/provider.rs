use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{default_supported_urls, AgentConfig};
use crate::error::BridgeError;
use crate::stream::CancelPolicy;
use crate::util::without_trailing_slash;

use super::capability::SupportedUrls;
use super::client::AgentClient;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const POOL_MAX_IDLE_PER_HOST: usize = 8;
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Settings for a [`Provider`].
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: String,
    /// Longest gap allowed between two reads of the event stream.
    pub read_timeout: Duration,
    pub cancel_policy: CancelPolicy,
    pub supported_urls: BTreeMap<String, Vec<String>>,
}

impl ProviderSettings {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            read_timeout: Duration::from_secs(180),
            cancel_policy: CancelPolicy::default(),
            supported_urls: default_supported_urls(),
        }
    }

    #[must_use]
    pub fn from_config(agent: &AgentConfig) -> Self {
        Self {
            base_url: agent.base_url.clone(),
            api_key: agent.api_key.clone(),
            read_timeout: Duration::from_secs(agent.timeout),
            cancel_policy: agent.on_cancel,
            supported_urls: agent.supported_urls.clone(),
        }
    }
}

fn build_reqwest_client(read_timeout: Duration) -> Result<reqwest::Client, BridgeError> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .tcp_nodelay(true)
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .read_timeout(read_timeout)
        .build()
        .map_err(|err| BridgeError::Transport(format!("Failed to build HTTP client: {err}")))
}

fn build_headers(api_key: &str) -> Result<http::HeaderMap, BridgeError> {
    let mut headers = http::HeaderMap::new();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    let mut bearer = http::HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|_| BridgeError::Config("api key contains invalid header characters".to_string()))?;
    bearer.set_sensitive(true);
    headers.insert(http::header::AUTHORIZATION, bearer);
    Ok(headers)
}

/// Entry point for talking to one agent gateway.
///
/// Holds the shared HTTP client; cheap to clone.
#[derive(Debug, Clone)]
pub struct Provider {
    http: reqwest::Client,
    base_url: Arc<str>,
    query_url: url::Url,
    headers: Arc<http::HeaderMap>,
    cancel_policy: CancelPolicy,
    supported_urls: Arc<SupportedUrls>,
}

impl Provider {
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] for an unusable base URL, API key or
    /// URL pattern, and [`BridgeError::Transport`] if the HTTP client cannot
    /// be built.
    pub fn new(settings: ProviderSettings) -> Result<Self, BridgeError> {
        let base_url = without_trailing_slash(settings.base_url.trim());
        let query_url = url::Url::parse(&format!("{base_url}/query"))
            .map_err(|err| BridgeError::Config(format!("invalid base URL '{base_url}': {err}")))?;
        let headers = build_headers(&settings.api_key)?;
        let supported_urls = SupportedUrls::from_patterns(&settings.supported_urls)?;
        let http = build_reqwest_client(settings.read_timeout)?;

        Ok(Self {
            http,
            base_url: Arc::from(base_url),
            query_url,
            headers: Arc::new(headers),
            cancel_policy: settings.cancel_policy,
            supported_urls: Arc::new(supported_urls),
        })
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A model handle that addresses every request to `agent_name`.
    #[must_use]
    pub fn language_model(&self, agent_name: impl Into<String>) -> AgentClient {
        AgentClient::new(
            self.http.clone(),
            self.query_url.clone(),
            Arc::clone(&self.headers),
            agent_name.into(),
            self.cancel_policy,
            Arc::clone(&self.supported_urls),
        )
    }

    /// The gateway only serves language models.
    ///
    /// # Errors
    ///
    /// Always returns [`BridgeError::NoSuchModel`].
    pub fn image_model(&self, model_id: &str) -> Result<AgentClient, BridgeError> {
        Err(no_such_model(model_id, "imageModel"))
    }

    /// The gateway only serves language models.
    ///
    /// # Errors
    ///
    /// Always returns [`BridgeError::NoSuchModel`].
    pub fn text_embedding_model(&self, model_id: &str) -> Result<AgentClient, BridgeError> {
        Err(no_such_model(model_id, "textEmbeddingModel"))
    }
}

fn no_such_model(model_id: &str, model_type: &str) -> BridgeError {
    BridgeError::NoSuchModel {
        model_id: model_id.to_string(),
        model_type: model_type.to_string(),
    }
}
