//! Header names and parsers shared by the pipeline, the error taxonomy and
//! the rate-limit tracker.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::Value;

pub const API_KEY: &str = "X-API-Key";
pub const REQUEST_ID: &str = "X-Request-ID";
pub const RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";
pub const RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
pub const RATE_LIMIT_RESET: &str = "X-RateLimit-Reset";

/// Trimmed, non-empty string value of a header.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Request ID from the `X-Request-ID` header, falling back to the
/// `request_id` field of a JSON body.
pub fn request_id(headers: &HeaderMap, body: Option<&Value>) -> Option<String> {
    header_str(headers, REQUEST_ID)
        .map(String::from)
        .or_else(|| {
            body.and_then(|b| b.get("request_id"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
}

pub fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    header_str(headers, RETRY_AFTER.as_str()).and_then(|raw| parse_retry_after(raw, now))
}

/// Parses a `Retry-After` value: delta-seconds (fractions tolerated) or an
/// HTTP-date. Dates in the past yield zero.
pub fn parse_retry_after(raw: &str, now: DateTime<Utc>) -> Option<Duration> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<f64>() {
        return seconds(secs);
    }
    let at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Non-negative, finite seconds as a `Duration`. Values too large for a
/// `Duration` yield `None`.
pub fn seconds(secs: f64) -> Option<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_request_id_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID, HeaderValue::from_static("req_header"));
        let body = json!({"request_id": "req_body"});

        assert_eq!(
            request_id(&headers, Some(&body)).as_deref(),
            Some("req_header")
        );
        assert_eq!(
            request_id(&HeaderMap::new(), Some(&body)).as_deref(),
            Some("req_body")
        );
        assert_eq!(request_id(&HeaderMap::new(), None), None);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("  abc  "));
        assert_eq!(header_str(&headers, REQUEST_ID), Some("abc"));
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let now = Utc::now();
        assert_eq!(parse_retry_after("3", now), Some(Duration::from_secs(3)));
        assert_eq!(
            parse_retry_after("1.5", now),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(parse_retry_after("-1", now), None);
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[test]
    fn test_parse_retry_after_out_of_range() {
        let now = Utc::now();
        assert_eq!(parse_retry_after("1e20", now), None);
        assert_eq!(parse_retry_after("99999999999999999999", now), None);
        assert_eq!(parse_retry_after("NaN", now), None);
        assert_eq!(parse_retry_after("inf", now), None);
        assert_eq!(seconds(f64::MAX), None);
        assert_eq!(seconds(0.0), Some(Duration::ZERO));
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let now = DateTime::parse_from_rfc2822("Wed, 21 Oct 2015 07:28:00 GMT")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:10 GMT", now),
            Some(Duration::from_secs(10))
        );
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:27:00 GMT", now),
            Some(Duration::ZERO)
        );
    }
}
