//! # iptu-api
//!
//! Rust client for the IPTU API: property tax records, zoning, market
//! valuation and ITBI (transfer tax) data for Sao Paulo, Belo Horizonte and
//! Recife.
//!
//! Every call runs through one pipeline that authenticates, retries transient
//! failures with capped exponential backoff, tracks the rate-limit quota and
//! turns failures into a single [`Error`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use iptu_api::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new("sua_api_key")?;
//!
//!     let imoveis = client
//!         .consulta_endereco("Avenida Paulista", "1000", "sp")
//!         .await?;
//!     for imovel in &imoveis {
//!         println!("{} - {:?}", imovel.sql, imovel.valor_venal);
//!     }
//!
//!     if let Some(quota) = client.rate_limit() {
//!         println!("{}/{} requests left", quota.remaining, quota.limit);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error handling
//!
//! ```rust,no_run
//! use iptu_api::{Client, Error};
//!
//! # async fn run(client: Client) {
//! match client.consulta_sql("008.045.0123-4", "sp").await {
//!     Ok(imoveis) => println!("{imoveis:?}"),
//!     Err(Error::RateLimit { retry_after, .. }) => println!("retry in {retry_after:?}"),
//!     Err(e) if e.is_retryable() => println!("transient: {e}"),
//!     Err(e) => println!("{}: {e}", e.kind()),
//! }
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod api;
pub mod client;
pub mod prelude;
pub mod types;

pub use client::{
    ApiRequest, Client, ClientBuilder, ClientConfig, ConfigError, Error, ErrorKind, FieldErrors,
    NetworkConfig, PoolConfig, ProxyConfig, RateLimitSnapshot, RequestContext, Result,
    RetryConfig, RetryDecision, TimeoutScope,
};
pub use types::Cidade;
