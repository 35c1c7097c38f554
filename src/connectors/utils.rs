// ABOUTME: Shared utilities for provider connector implementations
// ABOUTME: Response classification, deadlines, lenient JSON field access, and time parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::{ConnectorError, ConnectorResult};
use crate::models::{LatLng, Provider};
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::RETRY_AFTER;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Type conversion utilities for safe float-to-integer conversions
pub mod conversions {
    /// Round and clamp an `f64` into `u64`
    /// Used for durations that some APIs report as floats
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    #[must_use]
    pub fn f64_to_u64(value: f64) -> u64 {
        value.round().max(0.0).min(u64::MAX as f64) as u64
    }

    /// Round and clamp an `f64` into `u32`
    /// Used for heart rate values
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn f64_to_u32(value: f64) -> u32 {
        value.round().max(0.0).min(f64::from(u32::MAX)) as u32
    }
}

/// Lenient accessors over raw provider JSON
///
/// Providers are inconsistent about numbers arriving as strings and about
/// `null` versus absent keys. Every accessor returns `None` instead of failing,
/// which keeps normalization total.
pub mod fields {
    use super::conversions;
    use serde_json::Value;

    /// Non-null value at `key`
    #[must_use]
    pub fn present<'a>(raw: &'a Value, key: &str) -> Option<&'a Value> {
        raw.get(key).filter(|v| !v.is_null())
    }

    /// Number from a JSON number or a numeric string
    #[must_use]
    pub fn as_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite())
    }

    /// Float field
    #[must_use]
    pub fn f64_field(raw: &Value, key: &str) -> Option<f64> {
        present(raw, key).and_then(as_f64)
    }

    /// Non-negative whole-seconds field
    #[must_use]
    pub fn u64_field(raw: &Value, key: &str) -> Option<u64> {
        f64_field(raw, key).map(conversions::f64_to_u64)
    }

    /// Non-negative integer field, e.g. heart rate
    #[must_use]
    pub fn u32_field(raw: &Value, key: &str) -> Option<u32> {
        f64_field(raw, key).map(conversions::f64_to_u32)
    }

    /// Textual form of a string or number field; empty strings count as absent
    #[must_use]
    pub fn string_field(raw: &Value, key: &str) -> Option<String> {
        present(raw, key).and_then(as_string)
    }

    /// Textual form of a string or number value
    #[must_use]
    pub fn as_string(value: &Value) -> Option<String> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Boolean field; accepts `true`/`false` strings and 0/1
    #[must_use]
    pub fn bool_field(raw: &Value, key: &str) -> Option<bool> {
        match present(raw, key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_i64().map(|i| i != 0),
            _ => None,
        }
    }
}

/// Parse a provider timestamp
///
/// Accepts RFC 3339, naive ISO-8601 local times (treated as UTC), and Unix
/// epochs in seconds or milliseconds, as either numbers or strings.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(epoch_to_datetime),
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    s.parse::<i64>().ok().and_then(epoch_to_datetime)
}

fn epoch_to_datetime(epoch: i64) -> Option<DateTime<Utc>> {
    // Anything past year 33658 in seconds is really milliseconds
    if epoch.abs() >= 1_000_000_000_000 {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    }
}

/// Timestamp field, falling back to the Unix epoch when absent or unparseable
#[must_use]
pub fn start_date_or_epoch(raw: &Value, key: &str) -> DateTime<Utc> {
    fields::present(raw, key)
        .and_then(parse_timestamp)
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// `[lat, lng]` array into a pair; empty arrays mean no GPS
#[must_use]
pub fn latlng_field(raw: &Value, key: &str) -> Option<LatLng> {
    let pair = fields::present(raw, key)?.as_array()?;
    match pair.as_slice() {
        [lat, lng] => Some(LatLng(fields::as_f64(lat)?, fields::as_f64(lng)?)),
        _ => None,
    }
}

/// Send a request and classify any failure
///
/// Returns the response only for 2xx statuses. Non-2xx bodies are read in full
/// and carried in the error.
///
/// # Errors
///
/// Returns the classified `ConnectorError` for transport failures and non-2xx statuses
pub async fn send(provider: Provider, request: RequestBuilder) -> ConnectorResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| ConnectorError::from_transport(provider, &e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = retry_after_secs(&response);
    let body = response.text().await.unwrap_or_default();
    warn!(
        provider = %provider,
        status = status.as_u16(),
        "provider API returned an error status"
    );
    Err(ConnectorError::from_status(provider, status, body, retry_after))
}

/// `Retry-After` header in whole seconds
#[must_use]
pub fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Read a response body as JSON; an empty body decodes to `null`
///
/// # Errors
///
/// Returns `TransientNetwork` if the body cannot be read and `MalformedResponse` if it is not JSON
pub async fn read_json(provider: Provider, response: Response) -> ConnectorResult<Value> {
    let body = response
        .text()
        .await
        .map_err(|e| ConnectorError::from_transport(provider, &e))?;
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| {
        debug!(provider = %provider, "undecodable provider body");
        ConnectorError::malformed(provider, format!("invalid JSON ({e}): {body}"))
    })
}

/// Run a connector future under a caller-supplied deadline
///
/// An elapsed deadline is reported as `TransientNetwork` so it follows the
/// same retry path as a timeout inside the HTTP client.
///
/// # Errors
///
/// Returns the future's own error, or `TransientNetwork` when the deadline elapses
pub async fn with_deadline<T, F>(provider: Provider, deadline: Duration, future: F) -> ConnectorResult<T>
where
    F: Future<Output = ConnectorResult<T>> + Send,
{
    tokio::time::timeout(deadline, future)
        .await
        .unwrap_or_else(|_| {
            Err(ConnectorError::TransientNetwork {
                provider,
                reason: format!("deadline of {}ms elapsed", deadline.as_millis()),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_accepted_as_strings() {
        let raw = json!({"distance": "5000.5", "hr": 150.6, "id": 12, "empty": "", "nil": null});
        assert_eq!(fields::f64_field(&raw, "distance"), Some(5000.5));
        assert_eq!(fields::u32_field(&raw, "hr"), Some(151));
        assert_eq!(fields::string_field(&raw, "id").as_deref(), Some("12"));
        assert_eq!(fields::string_field(&raw, "empty"), None);
        assert_eq!(fields::f64_field(&raw, "nil"), None);
        assert_eq!(fields::f64_field(&raw, "missing"), None);
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = DateTime::from_timestamp(1_700_000_000, 0);
        assert_eq!(parse_timestamp(&json!(1_700_000_000)), expected);
        assert_eq!(parse_timestamp(&json!(1_700_000_000_000_i64)), expected);
        assert_eq!(parse_timestamp(&json!("1700000000")), expected);
        assert_eq!(parse_timestamp(&json!("2023-11-14T22:13:20Z")), expected);
        assert_eq!(parse_timestamp(&json!("2023-11-14T22:13:20.000")), expected);
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
    }

    #[test]
    fn test_latlng_requires_two_numbers() {
        let raw = json!({"a": [37.7, -122.4], "b": [], "c": [1.0]});
        assert_eq!(latlng_field(&raw, "a"), Some(LatLng(37.7, -122.4)));
        assert_eq!(latlng_field(&raw, "b"), None);
        assert_eq!(latlng_field(&raw, "c"), None);
    }

    #[tokio::test]
    async fn test_deadline_maps_to_transient() {
        let result: ConnectorResult<()> = with_deadline(
            Provider::Strava,
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await;
        assert!(matches!(
            result,
            Err(ConnectorError::TransientNetwork { .. })
        ));
    }
}
