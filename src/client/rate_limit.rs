//! Rate-limit bookkeeping.
//!
//! The service reports its quota on every response. The tracker keeps only
//! the most recent complete report; a response with missing or malformed
//! fields leaves the previous snapshot untouched.

use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;

use super::headers::{self, RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitSnapshot {
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitSnapshot {
    /// `reset` is a unix timestamp in seconds.
    pub fn new(limit: u64, remaining: u64, reset: i64) -> Option<Self> {
        Some(Self {
            limit,
            remaining,
            reset_at: DateTime::from_timestamp(reset, 0)?,
        })
    }

    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        Self::new(
            headers::header_str(headers, RATE_LIMIT_LIMIT)?.parse().ok()?,
            headers::header_str(headers, RATE_LIMIT_REMAINING)?.parse().ok()?,
            headers::header_str(headers, RATE_LIMIT_RESET)?.parse().ok()?,
        )
    }

    /// Reads `{"rate_limit": {"limit", "remaining", "reset"}}` from a body.
    pub fn from_body(body: &Value) -> Option<Self> {
        let envelope = body.get("rate_limit")?;
        Self::new(
            envelope.get("limit")?.as_u64()?,
            envelope.get("remaining")?.as_u64()?,
            envelope.get("reset")?.as_i64()?,
        )
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Time left until the quota resets, zero once it has passed.
    pub fn reset_in(&self, now: DateTime<Utc>) -> Duration {
        (self.reset_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Latest-value cell shared by every call of a client.
///
/// Writers replace the whole snapshot under the lock, so readers always see
/// one response's values and never a mix of two.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    latest: RwLock<Option<RateLimitSnapshot>>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, snapshot: RateLimitSnapshot) {
        *self.latest.write().unwrap_or_else(|e| e.into_inner()) = Some(snapshot);
    }

    /// Records the snapshot carried by a response, headers first, then the
    /// body envelope. Returns the recorded snapshot, if any.
    pub fn observe(&self, headers: &HeaderMap, body: Option<&Value>) -> Option<RateLimitSnapshot> {
        let snapshot = RateLimitSnapshot::from_headers(headers)
            .or_else(|| body.and_then(RateLimitSnapshot::from_body))?;
        self.record(snapshot);
        Some(snapshot)
    }

    pub fn latest(&self) -> Option<RateLimitSnapshot> {
        *self.latest.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;
    use std::sync::Arc;

    fn headers(limit: &'static str, remaining: &'static str, reset: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from_static(limit));
        headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from_static(remaining));
        headers.insert(RATE_LIMIT_RESET, HeaderValue::from_static(reset));
        headers
    }

    #[test]
    fn test_snapshot_from_headers() {
        let snapshot =
            RateLimitSnapshot::from_headers(&headers("1000", "998", "1700000000")).unwrap();
        assert_eq!(snapshot.limit, 1000);
        assert_eq!(snapshot.remaining, 998);
        assert_eq!(snapshot.reset_at.timestamp(), 1_700_000_000);
        assert!(!snapshot.is_exhausted());
    }

    #[test]
    fn test_partial_headers_are_ignored() {
        let mut partial = HeaderMap::new();
        partial.insert(RATE_LIMIT_LIMIT, HeaderValue::from_static("1000"));
        assert!(RateLimitSnapshot::from_headers(&partial).is_none());
        assert!(RateLimitSnapshot::from_headers(&headers("1000", "lots", "1700000000")).is_none());
    }

    #[test]
    fn test_snapshot_from_body_envelope() {
        let body = json!({
            "data": [],
            "rate_limit": {"limit": 50, "remaining": 0, "reset": 1700000100}
        });
        let snapshot = RateLimitSnapshot::from_body(&body).unwrap();
        assert_eq!(snapshot.limit, 50);
        assert!(snapshot.is_exhausted());
        assert!(RateLimitSnapshot::from_body(&json!({"data": []})).is_none());
    }

    #[test]
    fn test_reset_in() {
        let snapshot = RateLimitSnapshot::new(10, 5, 1_700_000_060).unwrap();
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(snapshot.reset_in(now), Duration::from_secs(60));

        let later = DateTime::from_timestamp(1_700_001_000, 0).unwrap();
        assert_eq!(snapshot.reset_in(later), Duration::ZERO);
    }

    #[test]
    fn test_tracker_keeps_latest_and_skips_missing() {
        let tracker = RateLimitTracker::new();
        assert!(tracker.latest().is_none());

        tracker.observe(&headers("100", "99", "1700000000"), None);
        tracker.observe(&HeaderMap::new(), Some(&json!({"data": {}})));
        assert_eq!(tracker.latest().unwrap().remaining, 99);

        tracker.observe(&headers("100", "98", "1700000000"), None);
        assert_eq!(tracker.latest().unwrap().remaining, 98);
    }

    #[test]
    fn test_concurrent_writers_never_mix_snapshots() {
        let tracker = Arc::new(RateLimitTracker::new());
        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let v = i * 1000;
                        tracker.record(RateLimitSnapshot::new(v, v, v as i64).unwrap());
                        let seen = tracker.latest().unwrap();
                        assert_eq!(seen.limit, seen.remaining);
                        assert_eq!(seen.limit as i64, seen.reset_at.timestamp());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
