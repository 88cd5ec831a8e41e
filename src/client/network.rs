//! Network configuration for proxy and connection pool settings.

use std::env;
use std::time::Duration;

use super::config::ConfigError;

/// Connection pool configuration.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub idle_timeout: Duration,
    pub max_idle_per_host: usize,
    pub tcp_keepalive: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(90),
            max_idle_per_host: 16,
            tcp_keepalive: Some(Duration::from_secs(60)),
        }
    }
}

impl PoolConfig {
    pub fn minimal() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
            max_idle_per_host: 2,
            tcp_keepalive: None,
        }
    }
}

/// Proxy server configuration.
#[derive(Clone, Debug, Default)]
pub struct ProxyConfig {
    /// HTTPS proxy URL
    pub https: Option<String>,
    /// HTTP proxy URL
    pub http: Option<String>,
    /// Hosts that bypass the proxy
    pub no_proxy: Vec<String>,
}

impl ProxyConfig {
    /// Create from `HTTPS_PROXY` / `HTTP_PROXY` / `NO_PROXY` (either case).
    pub fn from_env() -> Option<Self> {
        let var = |upper: &str, lower: &str| env::var(upper).or_else(|_| env::var(lower)).ok();

        let https = var("HTTPS_PROXY", "https_proxy");
        let http = var("HTTP_PROXY", "http_proxy");
        if https.is_none() && http.is_none() {
            return None;
        }

        let no_proxy = var("NO_PROXY", "no_proxy")
            .map(|s| {
                s.split([',', ' '])
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            https,
            http,
            no_proxy,
        })
    }

    pub fn https(url: impl Into<String>) -> Self {
        Self {
            https: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn http(mut self, url: impl Into<String>) -> Self {
        self.http = Some(url.into());
        self
    }

    pub fn no_proxy(mut self, patterns: impl IntoIterator<Item = String>) -> Self {
        self.no_proxy.extend(patterns);
        self
    }

    fn apply_to_builder(
        &self,
        mut builder: reqwest::ClientBuilder,
    ) -> Result<reqwest::ClientBuilder, ConfigError> {
        let no_proxy = reqwest::NoProxy::from_string(&self.no_proxy.join(","));

        if let Some(ref url) = self.https {
            let proxy = reqwest::Proxy::https(url)
                .map_err(|e| ConfigError::invalid("proxy.https", e.to_string()))?;
            builder = builder.proxy(proxy.no_proxy(no_proxy.clone()));
        }
        if let Some(ref url) = self.http {
            let proxy = reqwest::Proxy::http(url)
                .map_err(|e| ConfigError::invalid("proxy.http", e.to_string()))?;
            builder = builder.proxy(proxy.no_proxy(no_proxy));
        }
        Ok(builder)
    }
}

/// Transport settings applied when the client opens its connection pool.
#[derive(Clone, Debug, Default)]
pub struct NetworkConfig {
    pub proxy: Option<ProxyConfig>,
    pub pool: PoolConfig,
    pub connect_timeout: Option<Duration>,
}

impl NetworkConfig {
    pub fn from_env() -> Self {
        Self {
            proxy: ProxyConfig::from_env(),
            ..Default::default()
        }
    }

    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub(crate) fn apply_to_builder(
        &self,
        mut builder: reqwest::ClientBuilder,
    ) -> Result<reqwest::ClientBuilder, ConfigError> {
        if let Some(ref proxy) = self.proxy {
            builder = proxy.apply_to_builder(builder)?;
        }

        builder = builder
            .pool_idle_timeout(self.pool.idle_timeout)
            .pool_max_idle_per_host(self.pool.max_idle_per_host)
            .tcp_keepalive(self.pool.tcp_keepalive);

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_config_builder() {
        let proxy = ProxyConfig::https("https://proxy.example.com:8080")
            .http("http://proxy.example.com:8080")
            .no_proxy(vec!["localhost".to_string(), "*.internal".to_string()]);

        assert!(proxy.https.is_some());
        assert!(proxy.http.is_some());
        assert_eq!(proxy.no_proxy.len(), 2);
    }

    #[test]
    fn test_network_config_applies() {
        let config = NetworkConfig::default()
            .proxy(ProxyConfig::https("https://proxy.example.com:8080"))
            .pool(PoolConfig::minimal())
            .connect_timeout(Duration::from_secs(5));

        let builder = config.apply_to_builder(reqwest::Client::builder()).unwrap();
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_invalid_proxy_url_is_config_error() {
        let config = NetworkConfig::default().proxy(ProxyConfig::https("not a url"));
        let err = config
            .apply_to_builder(reqwest::Client::builder())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
