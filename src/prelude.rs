//! Prelude module for convenient imports.
//!
//! ```rust
//! use iptu_api::prelude::*;
//! ```

// Client
pub use crate::Client;
pub use crate::ClientBuilder;
pub use crate::ClientConfig;
pub use crate::RetryConfig;
pub use crate::TimeoutScope;

// Errors
pub use crate::ConfigError;
pub use crate::Error;
pub use crate::ErrorKind;
pub use crate::Result;

pub use crate::RateLimitSnapshot;

// Types
pub use crate::types::{
    Cidade, ComparablesRequest, EstimateRequest, GuiaRequest, Imovel, Parte, SimulacaoRequest,
};
