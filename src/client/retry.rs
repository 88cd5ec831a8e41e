//! Retry policy: capped exponential backoff with full jitter.
//!
//! The policy is a pure function of the retry number, the failed outcome and
//! the configuration, so one [`RetryConfig`] can be shared by any number of
//! concurrent calls.

use std::collections::BTreeSet;
use std::time::Duration;

use super::config::ConfigError;
use super::error::Error;

pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub retryable_status_codes: BTreeSet<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
        }
    }
}

/// Outcome of consulting the policy after a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp,
}

impl RetryConfig {
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_delay = initial;
        self.max_delay = max;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.initial_delay, self.max_delay, self.backoff_factor)
    }

    /// Responses are retried only when their status is in the configured set;
    /// failures without a status (timeouts, connection errors) fall back to
    /// the error's own transient classification.
    pub fn should_retry(&self, error: &Error) -> bool {
        match error.status_code() {
            Some(status) => self.retryable_status_codes.contains(&status),
            None => error.is_retryable(),
        }
    }

    /// `attempt` is the 1-based number of the retry being considered.
    pub fn decide(&self, attempt: u32, error: &Error) -> RetryDecision {
        if attempt == 0 || attempt > self.max_retries || !self.should_retry(error) {
            return RetryDecision::GiveUp;
        }

        let delay = self.backoff().delay_for(attempt);
        match error.retry_after() {
            Some(hint) => RetryDecision::Retry(delay.max(hint)),
            None => RetryDecision::Retry(delay),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !self.backoff_factor.is_finite() || self.backoff_factor <= 1.0 {
            return Err(ConfigError::invalid(
                "retry_config.backoff_factor",
                format!("must be greater than 1, got {}", self.backoff_factor),
            ));
        }
        if self.max_delay < self.initial_delay {
            return Err(ConfigError::invalid(
                "retry_config.max_delay",
                format!(
                    "{:?} is shorter than initial_delay {:?}",
                    self.max_delay, self.initial_delay
                ),
            ));
        }
        if let Some(code) = self
            .retryable_status_codes
            .iter()
            .find(|c| !(100..=599).contains(*c))
        {
            return Err(ConfigError::invalid(
                "retry_config.retryable_status_codes",
                format!("{code} is not an HTTP status code"),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Jitter {
    /// Uniform in `[0, ceiling]`.
    #[default]
    Full,
    None,
}

#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    factor: f64,
    jitter: Jitter,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            initial,
            max,
            factor,
            jitter: Jitter::Full,
        }
    }

    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// `min(max, initial * factor^(attempt - 1))`.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base = self.initial.as_nanos() as f64 * self.factor.powi(exponent);
        let capped = base.min(self.max.as_nanos() as f64);
        if capped.is_nan() || capped <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(capped as u64)
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt);
        match self.jitter {
            Jitter::Full => {
                let nanos = ceiling.as_nanos() as f64 * rand::random::<f64>();
                Duration::from_nanos(nanos as u64)
            }
            Jitter::None => ceiling,
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        RetryConfig::default().backoff()
    }
}
