//! Client configuration.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use super::network::NetworkConfig;
use super::retry::RetryConfig;

/// Default IPTU API base URL, including the versioned prefix.
pub const DEFAULT_BASE_URL: &str = "https://iptuapi.com.br/api/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Longest accepted timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
pub const USER_AGENT: &str = concat!("iptuapi-rust/", env!("CARGO_PKG_VERSION"));

pub const ENV_API_KEY: &str = "IPTU_API_KEY";
pub const ENV_BASE_URL: &str = "IPTU_API_BASE_URL";
pub const ENV_TIMEOUT: &str = "IPTU_API_TIMEOUT";
pub const ENV_MAX_RETRIES: &str = "IPTU_API_MAX_RETRIES";

/// Errors raised while building a client.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Missing environment variable: {key}")]
    MissingEnv { key: String },

    #[error("Failed to build HTTP transport: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// What the configured timeout bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeoutScope {
    /// The whole call, every attempt and backoff sleep included.
    #[default]
    Call,
    /// Each attempt separately; backoff sleeps are not counted.
    Attempt,
}

/// Client configuration. Immutable once the client is built.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub timeout_scope: TimeoutScope,
    pub retry: Arc<RetryConfig>,
    pub network: NetworkConfig,
    pub user_agent: String,
    /// Diagnostic sink for this client's calls; the global subscriber when unset.
    pub dispatch: Option<tracing::Dispatch>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            timeout_scope: TimeoutScope::default(),
            retry: Arc::new(RetryConfig::default()),
            network: NetworkConfig::default(),
            user_agent: USER_AGENT.to_string(),
            dispatch: None,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `IPTU_API_BASE_URL`, `IPTU_API_TIMEOUT` (seconds)
    /// and `IPTU_API_MAX_RETRIES`, with proxies from the standard variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            network: NetworkConfig::from_env(),
            ..Self::default()
        };

        if let Some(url) = env_var(ENV_BASE_URL) {
            config.base_url = url;
        }
        if let Some(raw) = env_var(ENV_TIMEOUT) {
            let secs: f64 = raw.parse().map_err(|_| {
                ConfigError::invalid(ENV_TIMEOUT, format!("'{raw}' is not a number"))
            })?;
            config.timeout = super::headers::seconds(secs).ok_or_else(|| {
                ConfigError::invalid(ENV_TIMEOUT, "must be a positive number of seconds")
            })?;
        }
        if let Some(raw) = env_var(ENV_MAX_RETRIES) {
            let max_retries: u32 = raw.parse().map_err(|_| {
                ConfigError::invalid(ENV_MAX_RETRIES, format!("'{raw}' is not a retry count"))
            })?;
            let retry = RetryConfig::clone(&config.retry).with_max_retries(max_retries);
            config.retry = Arc::new(retry);
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_timeout_scope(mut self, scope: TimeoutScope) -> Self {
        self.timeout_scope = scope;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Arc::new(retry);
        self
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_dispatch(mut self, dispatch: impl Into<tracing::Dispatch>) -> Self {
        self.dispatch = Some(dispatch.into());
        self
    }

    /// Checks every setting and returns the parsed base URL.
    pub fn validate(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::invalid("base_url", format!("'{}': {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "base_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if url.cannot_be_a_base() {
            return Err(ConfigError::invalid("base_url", "must be an absolute URL"));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::invalid("timeout", "must be greater than zero"));
        }
        if self.timeout > MAX_TIMEOUT {
            return Err(ConfigError::invalid(
                "timeout",
                format!("{:?} exceeds the {:?} ceiling", self.timeout, MAX_TIMEOUT),
            ));
        }
        self.retry.validate()?;
        Ok(url)
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn api_key_from_env() -> Result<String, ConfigError> {
    env_var(ENV_API_KEY).ok_or_else(|| ConfigError::MissingEnv {
        key: ENV_API_KEY.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://iptuapi.com.br/api/v1");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.timeout_scope, TimeoutScope::Call);
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.user_agent.starts_with("iptuapi-rust/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        for url in ["not a url", "ftp://iptuapi.com.br", "mailto:dev@iptuapi.com.br"] {
            let err = ClientConfig::new().with_base_url(url).validate().unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "base_url"),
                "{url}: {err}"
            );
        }
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let err = ClientConfig::new()
            .with_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_validate_rejects_oversized_timeout() {
        for timeout in [Duration::MAX, MAX_TIMEOUT + Duration::from_secs(1)] {
            let err = ClientConfig::new()
                .with_timeout(timeout)
                .validate()
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "timeout"),
                "{timeout:?}: {err}"
            );
        }
        assert!(ClientConfig::new().with_timeout(MAX_TIMEOUT).validate().is_ok());
    }

    // The only test touching IPTU_* variables.
    #[test]
    fn test_from_env() {
        // SAFETY: no other test reads or writes these variables.
        unsafe {
            std::env::remove_var(ENV_API_KEY);
            std::env::set_var(ENV_BASE_URL, "http://localhost:9000/api/v1");
            std::env::set_var(ENV_TIMEOUT, "2.5");
            std::env::set_var(ENV_MAX_RETRIES, "5");
        }

        assert!(matches!(
            api_key_from_env().unwrap_err(),
            ConfigError::MissingEnv { ref key } if key == ENV_API_KEY
        ));
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.base_url, "http://localhost:9000/api/v1");
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.retry.max_retries, 5);

        unsafe {
            std::env::set_var(ENV_API_KEY, "env-key");
            std::env::set_var(ENV_TIMEOUT, "soon");
        }
        assert_eq!(api_key_from_env().unwrap(), "env-key");
        assert!(ClientConfig::from_env().is_err());

        unsafe {
            std::env::set_var(ENV_TIMEOUT, "1e300");
        }
        assert!(matches!(
            ClientConfig::from_env().unwrap_err(),
            ConfigError::InvalidValue { ref key, .. } if key == ENV_TIMEOUT
        ));

        unsafe {
            for key in [ENV_API_KEY, ENV_BASE_URL, ENV_TIMEOUT, ENV_MAX_RETRIES] {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_validate_checks_retry_config() {
        let err = ClientConfig::new()
            .with_retry(RetryConfig::default().with_backoff_factor(0.5))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("backoff_factor"));
    }
}
