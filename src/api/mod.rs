//! Typed endpoints, one `impl Client` block per API area.
//!
//! Every method builds an [`ApiRequest`](crate::client::ApiRequest) and hands it
//! to the pipeline; errors and retries are handled there.

mod consulta;
mod itbi;
mod valuation;
