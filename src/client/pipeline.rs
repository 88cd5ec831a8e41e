//! Request execution pipeline.
//!
//! One logical call runs a retry loop: send, classify, consult the retry
//! policy, sleep, repeat. The loop is bounded by the configured timeout,
//! either as a whole-call deadline ([`TimeoutScope::Call`]) or per attempt.

use std::sync::atomic::Ordering;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::Instrument;
use tracing::instrument::WithSubscriber;
use url::Url;
use uuid::Uuid;

use super::Client;
use super::config::TimeoutScope;
use super::error::{Error, Result};
use super::headers;
use super::retry::RetryDecision;

/// One logical operation: method, path below the base URL, query and body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Adds the parameter only when a value is present.
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Serializes `body` as the JSON payload.
    pub fn json(mut self, body: &impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| Error::invalid_request(format!("Failed to encode request body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// Per-call state. Never shared between calls.
#[derive(Debug)]
pub struct RequestContext {
    /// Client-assigned call id, recorded on the `iptu.request` span.
    pub id: Uuid,
    /// Attempts made so far, starting at 1 once the first request is sent.
    pub attempt: u32,
    pub started: Instant,
    pub last_error: Option<Error>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            attempt: 0,
            started: Instant::now(),
            last_error: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A response read to completion.
struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: bytes::Bytes,
    json: Option<Value>,
}

/// `{"success": true, "data": {...}}`
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Bare(Vec<T>),
    Envelope {
        #[serde(default = "Vec::new")]
        data: Vec<T>,
    },
}

impl Client {
    /// Runs one logical call through the retry loop and decodes the body as `T`.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let call = async {
            let mut ctx = RequestContext::new();
            let span = tracing::debug_span!(
                "iptu.request",
                call_id = %ctx.id,
                method = %request.method,
                path = %request.path,
            );
            self.run(&request, &mut ctx).instrument(span).await
        };

        match self.inner.config.dispatch.clone() {
            Some(dispatch) => call.with_subscriber(dispatch).await,
            None => call.await,
        }
    }

    /// Single-record endpoint: decodes the `data` field of the envelope.
    pub(crate) async fn fetch_one<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.execute::<Envelope<T>>(request).await.map(|e| e.data)
    }

    /// List endpoint: a bare array or an envelope whose missing `data` means empty.
    pub(crate) async fn fetch_list<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Vec<T>> {
        Ok(match self.execute::<ListBody<T>>(request).await? {
            ListBody::Bare(items) | ListBody::Envelope { data: items } => items,
        })
    }

    async fn run<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        ctx: &mut RequestContext,
    ) -> Result<T> {
        let config = &self.inner.config;
        let url = self.endpoint_url(request);
        // `None` for per-attempt timeouts or a deadline beyond the `Instant` range.
        let deadline = match config.timeout_scope {
            TimeoutScope::Call => ctx.started.checked_add(config.timeout),
            TimeoutScope::Attempt => None,
        };

        loop {
            let http = match self.transport() {
                Ok(http) => http,
                Err(closed) => {
                    // Closed mid-call: surface the last concrete failure.
                    return Err(ctx.last_error.take().unwrap_or(closed));
                }
            };
            ctx.attempt += 1;
            self.inner.attempts.fetch_add(1, Ordering::Relaxed);

            let attempt_deadline = deadline.or_else(|| Instant::now().checked_add(config.timeout));
            let send = self.send_once(&http, &url, request);
            let outcome = match attempt_deadline {
                Some(at) => match timeout_at(at, send).await {
                    Ok(outcome) => outcome,
                    Err(_) if deadline.is_some() => {
                        tracing::debug!(attempt = ctx.attempt, "Call deadline reached");
                        return Err(Error::timeout(config.timeout, ctx.last_error.take()));
                    }
                    Err(_) => Err(Error::timeout(config.timeout, None)),
                },
                None => send.await,
            };

            let error = match outcome {
                Ok(reply) if reply.status.is_success() => return self.decode(reply),
                Ok(reply) => Error::from_response(reply.status, &reply.headers, &reply.body),
                Err(e) => e,
            };

            let delay = match config.retry.decide(ctx.attempt, &error) {
                RetryDecision::Retry(delay) => delay,
                RetryDecision::GiveUp => return Err(error),
            };

            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if delay >= remaining {
                    tracing::debug!(
                        attempt = ctx.attempt,
                        delay_ms = delay.as_millis() as u64,
                        remaining_ms = remaining.as_millis() as u64,
                        "Backoff exceeds remaining budget"
                    );
                    return Err(Error::timeout(config.timeout, Some(error)));
                }
            }

            tracing::warn!(
                error = %error,
                attempt = ctx.attempt,
                max_retries = config.retry.max_retries,
                delay_ms = delay.as_millis() as u64,
                "Request failed, retrying"
            );
            ctx.last_error = Some(error);
            sleep(delay).await;
        }
    }

    async fn send_once(
        &self,
        http: &reqwest::Client,
        url: &Url,
        request: &ApiRequest,
    ) -> Result<Reply> {
        let timeout = self.inner.config.timeout;
        let mut builder = http
            .request(request.method.clone(), url.clone())
            .header(headers::API_KEY, self.inner.auth_header.clone())
            .header(ACCEPT, "application/json");
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::from_transport(e, timeout))?;
        let status = response.status();
        let header_map = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::from_transport(e, timeout))?;

        let json = if body.is_empty() {
            Some(Value::Null)
        } else {
            serde_json::from_slice(&body).ok()
        };
        self.observe(&header_map, json.as_ref());

        tracing::debug!(
            status = status.as_u16(),
            request_id = headers::header_str(&header_map, headers::REQUEST_ID),
            bytes = body.len(),
            "Response received"
        );

        Ok(Reply {
            status,
            headers: header_map,
            body,
            json,
        })
    }

    /// Records the request id and rate-limit snapshot carried by a response.
    fn observe(&self, response_headers: &HeaderMap, json: Option<&Value>) {
        if let Some(id) = headers::request_id(response_headers, json) {
            *self
                .inner
                .last_request_id
                .write()
                .unwrap_or_else(|e| e.into_inner()) = Some(id);
        }
        self.inner.rate_limit.observe(response_headers, json);
    }

    fn decode<T: DeserializeOwned>(&self, reply: Reply) -> Result<T> {
        let request_id = headers::request_id(&reply.headers, reply.json.as_ref());
        let Some(json) = reply.json else {
            return Err(Error::decode(
                "body is not valid JSON",
                reply.status,
                request_id,
            ));
        };
        serde_json::from_value(json).map_err(|e| Error::decode(e, reply.status, request_id))
    }

    fn endpoint_url(&self, request: &ApiRequest) -> Url {
        let mut url = self.inner.base_url.clone();
        let path = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            request.path.trim_start_matches('/')
        );
        url.set_path(&path);
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        url
    }
}
