// ABOUTME: Error taxonomy for provider connector operations
// ABOUTME: Classifies auth, rate-limit, transient and envelope failures so callers can pick a retry policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Connector Errors
//!
//! Connectors do not retry on their own. Their job is to classify each failure
//! precisely enough that the orchestrator can decide what to do next:
//!
//! | Variant | Caller reaction |
//! |---|---|
//! | `AuthExchange` | Surface to the user flow, the authorization artifact is spent |
//! | `TokenExpired` | Refresh credentials and retry once |
//! | `RateLimitExceeded` | Back off for `retry_after_secs` |
//! | `TransientNetwork` | Retry with backoff |
//! | `MalformedResponse` | Log the body, do not retry blindly |
//!
//! Normalization never produces an error; only network and authentication
//! operations do. A capability the provider lacks (Garmin streams, Polar
//! webhooks) is an empty result, not an error.

use crate::models::Provider;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Token endpoint call whose failure is being classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFlow {
    /// One-time authorization code exchange
    Exchange,
    /// Refresh-token renewal
    Refresh,
}

/// Result alias used across all connector operations
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Failure classes produced by connectors
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Authorization code or verifier was rejected, or the token endpoint returned an error envelope
    #[error("{provider} authorization exchange failed: {message}")]
    AuthExchange {
        /// Provider that rejected the exchange
        provider: Provider,
        /// HTTP status, when the failure came from a non-2xx response
        status: Option<u16>,
        /// Raw provider body or envelope message
        message: String,
    },

    /// Resource API answered 401: refresh the token and retry once
    #[error("{provider} access token expired or revoked: {body}")]
    TokenExpired {
        /// Provider that rejected the token
        provider: Provider,
        /// Raw provider body
        body: String,
    },

    /// Provider answered 429
    #[error("{provider} rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded {
        /// Provider that throttled the request
        provider: Provider,
        /// Seconds to wait, from `Retry-After` or the provider's documented window
        retry_after_secs: u64,
        /// Raw provider body
        body: String,
    },

    /// Timeout, connection failure or 5xx
    #[error("{provider} transient failure: {reason}")]
    TransientNetwork {
        /// Provider being called
        provider: Provider,
        /// What went wrong, including the body for 5xx responses
        reason: String,
    },

    /// The provider's envelope signalled failure or the payload could not be decoded
    #[error("{provider} returned a malformed or failed response: {reason}")]
    MalformedResponse {
        /// Provider that produced the response
        provider: Provider,
        /// Envelope message or decode failure
        reason: String,
    },

    /// Non-retryable client error other than 401/429 (e.g. 403, 404)
    #[error("{provider} rejected the request with status {status}: {body}")]
    ProviderRejected {
        /// Provider that rejected the request
        provider: Provider,
        /// HTTP status code
        status: u16,
        /// Raw provider body
        body: String,
    },

    /// OAuth 1.0a request-token secret was not found for the given state (expired or replayed)
    #[error("{provider} has no pending authorization for this state")]
    PendingAuthorization {
        /// Provider whose handshake could not be resumed
        provider: Provider,
    },

    /// Connector could not be built or is not configured
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ConnectorError {
    /// Provider associated with the error, if any
    #[must_use]
    pub const fn provider(&self) -> Option<Provider> {
        match self {
            Self::AuthExchange { provider, .. }
            | Self::TokenExpired { provider, .. }
            | Self::RateLimitExceeded { provider, .. }
            | Self::TransientNetwork { provider, .. }
            | Self::MalformedResponse { provider, .. }
            | Self::ProviderRejected { provider, .. }
            | Self::PendingAuthorization { provider } => Some(*provider),
            Self::Configuration(_) => None,
        }
    }

    /// Whether the same request may succeed if retried later without user action
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded { .. } | Self::TransientNetwork { .. }
        )
    }

    /// Whether the caller should refresh credentials before retrying
    #[must_use]
    pub const fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::TokenExpired { .. })
    }

    /// Minimum delay before a retry, for rate-limited requests
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded {
                retry_after_secs, ..
            } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }

    /// Build an `AuthExchange` error from a non-2xx token endpoint response
    #[must_use]
    pub fn auth_exchange(provider: Provider, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::AuthExchange {
            provider,
            status,
            message: message.into(),
        }
    }

    /// Build a `MalformedResponse` error
    #[must_use]
    pub fn malformed(provider: Provider, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider,
            reason: reason.into(),
        }
    }

    /// Classify a non-success HTTP response from a resource API
    ///
    /// `retry_after` is the parsed `Retry-After` header; when absent the
    /// provider's documented window is used.
    #[must_use]
    pub fn from_status(
        provider: Provider,
        status: StatusCode,
        body: String,
        retry_after: Option<u64>,
    ) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::TokenExpired { provider, body },
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimitExceeded {
                provider,
                retry_after_secs: retry_after.unwrap_or_else(|| provider.rate_limit_window_secs()),
                body,
            },
            StatusCode::REQUEST_TIMEOUT => Self::TransientNetwork {
                provider,
                reason: format!("status {status}: {body}"),
            },
            s if s.is_server_error() => Self::TransientNetwork {
                provider,
                reason: format!("status {status}: {body}"),
            },
            _ => Self::ProviderRejected {
                provider,
                status: status.as_u16(),
                body,
            },
        }
    }

    /// Classify a non-success token endpoint response
    ///
    /// A failed code exchange is always `AuthExchange`. On refresh only 400 and
    /// 401 mean the grant itself was rejected; throttling and outages classify
    /// like any resource call so the refresh can be retried.
    #[must_use]
    pub fn from_token_status(
        provider: Provider,
        flow: TokenFlow,
        status: StatusCode,
        body: String,
        retry_after: Option<u64>,
    ) -> Self {
        match (flow, status) {
            (TokenFlow::Exchange, _)
            | (TokenFlow::Refresh, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) => {
                Self::auth_exchange(provider, Some(status.as_u16()), body)
            }
            (TokenFlow::Refresh, _) => Self::from_status(provider, status, body, retry_after),
        }
    }

    /// Classify a transport-level `reqwest` failure
    #[must_use]
    pub fn from_transport(provider: Provider, error: &reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::malformed(provider, format!("failed to decode response: {error}"));
        }
        let kind = if error.is_timeout() {
            "request timed out"
        } else if error.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        Self::TransientNetwork {
            provider,
            reason: format!("{kind}: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = ConnectorError::from_status(
            Provider::Strava,
            StatusCode::UNAUTHORIZED,
            "{\"message\":\"Authorization Error\"}".to_owned(),
            None,
        );
        assert!(err.requires_reauthentication());
        assert!(!err.is_retryable());

        let err = ConnectorError::from_status(
            Provider::Strava,
            StatusCode::TOO_MANY_REQUESTS,
            String::new(),
            None,
        );
        assert_eq!(err.retry_after(), Some(Duration::from_secs(900)));

        let err = ConnectorError::from_status(
            Provider::Coros,
            StatusCode::TOO_MANY_REQUESTS,
            String::new(),
            Some(12),
        );
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));

        let err = ConnectorError::from_status(
            Provider::Polar,
            StatusCode::BAD_GATEWAY,
            "upstream".to_owned(),
            None,
        );
        assert!(err.is_retryable());

        let err = ConnectorError::from_status(
            Provider::Garmin,
            StatusCode::FORBIDDEN,
            "denied".to_owned(),
            None,
        );
        assert!(matches!(
            err,
            ConnectorError::ProviderRejected { status: 403, .. }
        ));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_token_status_classification_depends_on_flow() {
        let exchange = ConnectorError::from_token_status(
            Provider::Strava,
            TokenFlow::Exchange,
            StatusCode::SERVICE_UNAVAILABLE,
            "down".to_owned(),
            None,
        );
        assert!(matches!(exchange, ConnectorError::AuthExchange { status: Some(503), .. }));

        let refresh = ConnectorError::from_token_status(
            Provider::Strava,
            TokenFlow::Refresh,
            StatusCode::SERVICE_UNAVAILABLE,
            "down".to_owned(),
            None,
        );
        assert!(refresh.is_retryable());

        let invalid_grant = ConnectorError::from_token_status(
            Provider::Coros,
            TokenFlow::Refresh,
            StatusCode::BAD_REQUEST,
            "invalid_grant".to_owned(),
            None,
        );
        assert!(matches!(invalid_grant, ConnectorError::AuthExchange { .. }));
        assert!(!invalid_grant.is_retryable());
    }

    #[test]
    fn test_auth_exchange_message_keeps_raw_body() {
        let err = ConnectorError::auth_exchange(
            Provider::Strava,
            Some(400),
            r#"{"message":"Bad Request","errors":[{"field":"code","code":"invalid"}]}"#,
        );
        assert!(err.to_string().contains("\"field\":\"code\""));
        assert_eq!(err.provider(), Some(Provider::Strava));
    }
}
