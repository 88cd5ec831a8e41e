//! IPTU API client: shared handle, builder and request pipeline.

pub mod config;
pub mod error;
pub mod headers;
pub mod network;
pub mod pipeline;
pub mod rate_limit;
pub mod retry;

pub use config::{
    ClientConfig, ConfigError, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, MAX_TIMEOUT, TimeoutScope,
};
pub use error::{Error, ErrorKind, FieldErrors, Result};
pub use network::{NetworkConfig, PoolConfig, ProxyConfig};
pub use pipeline::{ApiRequest, RequestContext};
pub use rate_limit::{RateLimitSnapshot, RateLimitTracker};
pub use retry::{ExponentialBackoff, Jitter, RetryConfig, RetryDecision};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

/// Client for the IPTU API.
///
/// Cheap to clone: clones share one connection pool, one rate-limit tracker
/// and one attempt counter. The pool is released by [`Client::close`] or when
/// the last clone is dropped.
///
/// ```no_run
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = iptu_api::Client::new("sua_api_key")?;
/// let imoveis = client.consulta_endereco("Avenida Paulista", "1000", "sp").await?;
/// println!("{} imoveis", imoveis.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    auth_header: HeaderValue,
    config: ClientConfig,
    base_url: Url,
    http: RwLock<Option<reqwest::Client>>,
    rate_limit: RateLimitTracker,
    last_request_id: RwLock<Option<String>>,
    attempts: AtomicU64,
}

impl Client {
    /// Client with default configuration.
    pub fn new(api_key: impl Into<String>) -> std::result::Result<Self, ConfigError> {
        Self::builder(api_key).build()
    }

    pub fn with_config(
        api_key: impl Into<String>,
        config: ClientConfig,
    ) -> std::result::Result<Self, ConfigError> {
        Self::builder(api_key).config(config).build()
    }

    /// Client configured from `IPTU_API_*` environment variables.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        ClientBuilder::from_env()?.build()
    }

    pub fn builder(api_key: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(api_key)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Most recent rate-limit report from the service.
    pub fn rate_limit(&self) -> Option<RateLimitSnapshot> {
        self.inner.rate_limit.latest()
    }

    /// Request id of the most recent response that carried one.
    pub fn last_request_id(&self) -> Option<String> {
        self.inner
            .last_request_id
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Attempts sent over this client's lifetime, retries included.
    pub fn attempts(&self) -> u64 {
        self.inner.attempts.load(Ordering::Relaxed)
    }

    /// Releases the connection pool. Later calls fail with a generic error.
    pub fn close(&self) {
        let released = self
            .inner
            .http
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if released.is_some() {
            tracing::info!(attempts = self.attempts(), "IPTU API client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .http
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    pub(crate) fn transport(&self) -> Result<reqwest::Client> {
        self.inner
            .http
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(Error::closed)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("closed", &self.is_closed())
            .finish()
    }
}

pub struct ClientBuilder {
    api_key: SecretString,
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            config: ClientConfig::default(),
        }
    }

    /// Reads `IPTU_API_KEY` (required) and the optional overrides of
    /// [`ClientConfig::from_env`].
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            api_key: SecretString::from(config::api_key_from_env()?),
            config: ClientConfig::from_env()?,
        })
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn timeout_scope(mut self, scope: TimeoutScope) -> Self {
        self.config.timeout_scope = scope;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = Arc::new(retry);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        let retry = RetryConfig::clone(&self.config.retry).with_max_retries(max_retries);
        self.config.retry = Arc::new(retry);
        self
    }

    pub fn network(mut self, network: NetworkConfig) -> Self {
        self.config.network = network;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn dispatch(mut self, dispatch: impl Into<tracing::Dispatch>) -> Self {
        self.config.dispatch = Some(dispatch.into());
        self
    }

    pub fn build(self) -> std::result::Result<Client, ConfigError> {
        let base_url = self.config.validate()?;

        let key = self.api_key.expose_secret().trim();
        if key.is_empty() {
            return Err(ConfigError::invalid("api_key", "must not be empty"));
        }
        let mut auth_header = HeaderValue::from_str(key)
            .map_err(|_| ConfigError::invalid("api_key", "contains invalid header characters"))?;
        auth_header.set_sensitive(true);

        let builder = reqwest::Client::builder().user_agent(self.config.user_agent.as_str());
        let http = self.config.network.apply_to_builder(builder)?.build()?;

        tracing::debug!(
            base_url = %base_url,
            timeout_ms = self.config.timeout.as_millis() as u64,
            max_retries = self.config.retry.max_retries,
            "IPTU API client created"
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                auth_header,
                config: self.config,
                base_url,
                http: RwLock::new(Some(http)),
                rate_limit: RateLimitTracker::new(),
                last_request_id: RwLock::new(None),
                attempts: AtomicU64::new(0),
            }),
        })
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("api_key", &"[REDACTED]")
            .field("config", &self.config)
            .finish()
    }
}
