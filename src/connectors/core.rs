// ABOUTME: Core connector trait shared by every fitness provider integration
// ABOUTME: Capability flags, activity query parameters, and the uniform connector contract
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::ConnectorResult;
use crate::models::{
    AccessToken, AuthorizationCallback, NormalizedActivity, Provider, TokenGrant, TokenRefresh,
    WebhookEvent,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Provider-native time series keyed by stream type
pub type StreamMap = Map<String, Value>;

bitflags::bitflags! {
    /// What a connector supports beyond the mandatory contract
    ///
    /// A missing flag means the matching operation is a documented no-op
    /// (empty result), not a failure.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ConnectorCapabilities: u8 {
        /// Two-step OAuth 1.0a handshake with signed requests
        const OAUTH1 = 0b0000_0001;
        /// Access tokens expire and can be refreshed
        const REFRESHABLE_TOKENS = 0b0000_0010;
        /// `after`/`before` filters are honored by the activity listing
        const DATE_FILTERS = 0b0000_0100;
        /// Activity listing is paged by `page`/`per_page`
        const OFFSET_PAGINATION = 0b0000_1000;
        /// Time-series streams are available
        const STREAMS = 0b0001_0000;
        /// Push notifications are decoded
        const WEBHOOKS = 0b0010_0000;
        /// A one-time user registration follows the token exchange
        const USER_REGISTRATION = 0b0100_0000;
    }
}

impl ConnectorCapabilities {
    /// Check if refresh performs network I/O
    #[must_use]
    pub const fn supports_refresh(&self) -> bool {
        self.contains(Self::REFRESHABLE_TOKENS)
    }

    /// Check if streams can be fetched
    #[must_use]
    pub const fn supports_streams(&self) -> bool {
        self.contains(Self::STREAMS)
    }

    /// Check if webhooks are decoded
    #[must_use]
    pub const fn supports_webhooks(&self) -> bool {
        self.contains(Self::WEBHOOKS)
    }

    /// Check if the listing can be paged
    #[must_use]
    pub const fn supports_pagination(&self) -> bool {
        self.contains(Self::OFFSET_PAGINATION)
    }
}

/// Activity listing parameters
///
/// Date filters are best-effort: connectors without `DATE_FILTERS` ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityQuery {
    /// Only activities starting after this instant
    pub after: Option<DateTime<Utc>>,
    /// Only activities starting before this instant
    pub before: Option<DateTime<Utc>>,
    /// 1-based page number
    pub page: u32,
    /// Page size; each connector clamps it to the provider maximum
    pub per_page: u32,
}

impl Default for ActivityQuery {
    fn default() -> Self {
        Self {
            after: None,
            before: None,
            page: 1,
            per_page: 30,
        }
    }
}

impl ActivityQuery {
    /// First page with the given size
    #[must_use]
    pub fn with_page_size(per_page: u32) -> Self {
        Self {
            per_page,
            ..Self::default()
        }
    }

    /// Restrict to a time range
    #[must_use]
    pub const fn with_time_range(
        mut self,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
    ) -> Self {
        self.after = after;
        self.before = before;
        self
    }

    /// Same filters, different page
    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
}

/// Uniform contract implemented by every provider connector
///
/// Connectors hold only immutable configuration and a pooled HTTP client;
/// every call is independent and safe to run concurrently. Credentials are
/// passed in on each call and never stored.
///
/// Network operations classify failures into [`crate::errors::ConnectorError`]
/// and never retry on their own. `normalize_activity` and `handle_webhook`
/// are pure and total.
#[async_trait]
pub trait ActivityConnector: Send + Sync {
    /// Provider served by this connector
    fn provider(&self) -> Provider;

    /// Optional features offered by the provider
    fn capabilities(&self) -> ConnectorCapabilities;

    /// Build the provider's authorization entry point
    ///
    /// `state` is returned unchanged on the callback and must be validated by
    /// the caller. Only OAuth 1.0a connectors perform I/O here (request token).
    async fn get_authorization_url(&self, state: &str, redirect_uri: &str)
        -> ConnectorResult<String>;

    /// Exchange a one-time authorization artifact for credentials
    ///
    /// Not safe to retry: the code is consumed by the first attempt.
    async fn exchange_code(&self, callback: &AuthorizationCallback) -> ConnectorResult<TokenGrant>;

    /// Renew an expiring credential
    ///
    /// `Ok(None)` means no refresh is needed because the provider's tokens never expire.
    async fn refresh_access_token(&self, refresh_token: &str)
        -> ConnectorResult<Option<TokenRefresh>>;

    /// Fetch one page of provider-native activity summaries
    async fn get_activities(
        &self,
        token: &AccessToken,
        query: &ActivityQuery,
    ) -> ConnectorResult<Vec<Value>>;

    /// Fetch a single activity at full fidelity
    async fn get_activity_detail(&self, token: &AccessToken, activity_id: &str)
        -> ConnectorResult<Value>;

    /// Fetch time-series data; empty when the provider has none
    async fn get_activity_streams(
        &self,
        token: &AccessToken,
        activity_id: &str,
    ) -> ConnectorResult<StreamMap>;

    /// Map a raw provider record onto the canonical schema
    fn normalize_activity(&self, raw: &Value) -> NormalizedActivity;

    /// Decode a push notification; `None` for events that need no action
    fn handle_webhook(&self, payload: &Value) -> Option<WebhookEvent>;

    /// Revoke the provider-side grant; `Ok(false)` when the provider offers no revocation
    async fn revoke_access(&self, _token: &AccessToken) -> ConnectorResult<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_paging_keeps_filters() {
        let after = DateTime::UNIX_EPOCH;
        let query = ActivityQuery::with_page_size(50).with_time_range(Some(after), None);
        let next = query.page(2);
        assert_eq!(next.page, 2);
        assert_eq!(next.per_page, 50);
        assert_eq!(next.after, Some(after));
    }

    #[test]
    fn test_capability_helpers() {
        let caps = ConnectorCapabilities::OAUTH1 | ConnectorCapabilities::WEBHOOKS;
        assert!(caps.supports_webhooks());
        assert!(!caps.supports_refresh());
        assert!(!caps.supports_streams());
    }
}
