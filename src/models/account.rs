// ABOUTME: Credential records exchanged between connectors and the token-storage layer
// ABOUTME: Authorization callbacks, token grants, refresh results, and the connected-account view
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::Provider;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const REDACTED: &str = "[REDACTED]";

/// Parameters delivered to the OAuth callback
///
/// `code` carries the authorization code for OAuth 2.0 providers and the
/// `oauth_token` for Garmin's OAuth 1.0a handshake.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCallback {
    /// Authorization code, or the OAuth 1.0a request token
    pub code: String,
    /// CSRF state value issued with the authorization URL
    pub state: Option<String>,
    /// Redirect URI used for the authorization request
    pub redirect_uri: Option<String>,
    /// OAuth 1.0a verifier
    pub oauth_verifier: Option<String>,
}

impl AuthorizationCallback {
    /// Callback carrying only an authorization code
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    /// Attach the CSRF state
    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Attach the redirect URI
    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Attach the OAuth 1.0a verifier
    #[must_use]
    pub fn with_verifier(mut self, verifier: impl Into<String>) -> Self {
        self.oauth_verifier = Some(verifier.into());
        self
    }
}

impl fmt::Debug for AuthorizationCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationCallback")
            .field("code", &REDACTED)
            .field("state", &self.state)
            .field("redirect_uri", &self.redirect_uri)
            .field("oauth_verifier", &self.oauth_verifier.as_ref().map(|_| REDACTED))
            .finish()
    }
}

/// Credential used to call a provider's resource API
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Bearer token, or the OAuth 1.0a access token
    pub token: String,
    /// OAuth 1.0a token secret (Garmin only)
    pub secret: Option<String>,
    /// Provider's identifier for the athlete, for APIs that address users by id (Polar)
    pub user_id: Option<String>,
}

impl AccessToken {
    /// Bearer credential for OAuth 2.0 providers
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: None,
            user_id: None,
        }
    }

    /// Token and secret pair for OAuth 1.0a providers
    #[must_use]
    pub fn oauth1(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: Some(secret.into()),
            user_id: None,
        }
    }

    /// Attach the provider user id
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &REDACTED)
            .field("secret", &self.secret.as_ref().map(|_| REDACTED))
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Result of a successful authorization exchange
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenGrant {
    /// Access token
    pub access_token: String,
    /// Refresh token, for providers that issue one
    pub refresh_token: Option<String>,
    /// OAuth 1.0a token secret (Garmin only)
    pub token_secret: Option<String>,
    /// Expiry; `None` for tokens that never expire
    pub expires_at: Option<DateTime<Utc>>,
    /// Provider's identifier for the athlete
    pub provider_user_id: String,
    /// Provider-specific profile details
    pub user_info: serde_json::Value,
}

impl TokenGrant {
    /// Credential to use for resource API calls
    #[must_use]
    pub fn access(&self) -> AccessToken {
        AccessToken {
            token: self.access_token.clone(),
            secret: self.token_secret.clone(),
            user_id: Some(self.provider_user_id.clone()),
        }
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &REDACTED)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| REDACTED))
            .field("token_secret", &self.token_secret.as_ref().map(|_| REDACTED))
            .field("expires_at", &self.expires_at)
            .field("provider_user_id", &self.provider_user_id)
            .field("user_info", &self.user_info)
            .finish()
    }
}

/// Renewed credentials returned by a refresh
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRefresh {
    /// New access token
    pub access_token: String,
    /// New refresh token; providers that rotate tokens always return one
    pub refresh_token: Option<String>,
    /// New expiry
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for TokenRefresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRefresh")
            .field("access_token", &REDACTED)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| REDACTED))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A user's link to one provider, as held by the token-storage layer
///
/// Connectors never read or write this themselves; it is the shape the
/// orchestrator persists after an exchange and mutates after a refresh.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedAccount {
    /// Linked provider
    pub provider: Provider,
    /// Provider's identifier for the athlete
    pub provider_user_id: String,
    /// Access token
    pub access_token: String,
    /// Refresh token
    pub refresh_token: Option<String>,
    /// OAuth 1.0a token secret
    pub token_secret: Option<String>,
    /// Expiry; `None` means the token never expires
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Opaque sync position owned by the orchestrator
    pub sync_cursor: Option<String>,
    /// Cleared on revocation or repeated authentication failure
    pub is_active: bool,
}

impl ConnectedAccount {
    /// Create the account record from a fresh token grant
    #[must_use]
    pub fn from_grant(provider: Provider, grant: &TokenGrant) -> Self {
        Self {
            provider,
            provider_user_id: grant.provider_user_id.clone(),
            access_token: grant.access_token.clone(),
            refresh_token: grant.refresh_token.clone(),
            token_secret: grant.token_secret.clone(),
            token_expires_at: grant.expires_at,
            sync_cursor: None,
            is_active: true,
        }
    }

    /// Apply a refresh result; the last write wins
    pub fn apply_refresh(&mut self, refresh: &TokenRefresh) {
        self.access_token.clone_from(&refresh.access_token);
        if refresh.refresh_token.is_some() {
            self.refresh_token.clone_from(&refresh.refresh_token);
        }
        self.token_expires_at = refresh.expires_at;
    }

    /// Whether the token expires within `margin` of `now`
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.token_expires_at
            .is_some_and(|expires_at| expires_at - margin <= now)
    }

    /// Soft-disable after revocation
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Credential to pass to connector calls
    #[must_use]
    pub fn access(&self) -> AccessToken {
        AccessToken {
            token: self.access_token.clone(),
            secret: self.token_secret.clone(),
            user_id: Some(self.provider_user_id.clone()),
        }
    }
}

impl fmt::Debug for ConnectedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedAccount")
            .field("provider", &self.provider)
            .field("provider_user_id", &self.provider_user_id)
            .field("access_token", &REDACTED)
            .field("token_expires_at", &self.token_expires_at)
            .field("sync_cursor", &self.sync_cursor)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(expires_at: Option<DateTime<Utc>>) -> TokenGrant {
        TokenGrant {
            access_token: "access-1".to_owned(),
            refresh_token: Some("refresh-1".to_owned()),
            token_secret: None,
            expires_at,
            provider_user_id: "42".to_owned(),
            user_info: serde_json::json!({}),
        }
    }

    #[test]
    fn test_debug_never_prints_tokens() {
        let token = AccessToken::oauth1("token-value", "secret-value");
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("token-value"));
        assert!(!rendered.contains("secret-value"));

        let rendered = format!("{:?}", grant(None));
        assert!(!rendered.contains("access-1"));
        assert!(!rendered.contains("refresh-1"));
    }

    #[test]
    fn test_permanent_tokens_never_need_refresh() {
        let account = ConnectedAccount::from_grant(Provider::Polar, &grant(None));
        assert!(!account.needs_refresh(Utc::now(), Duration::minutes(5)));
    }

    #[test]
    fn test_refresh_keeps_old_refresh_token_when_none_returned() {
        let now = Utc::now();
        let mut account = ConnectedAccount::from_grant(Provider::Strava, &grant(Some(now)));
        assert!(account.needs_refresh(now, Duration::minutes(5)));

        account.apply_refresh(&TokenRefresh {
            access_token: "access-2".to_owned(),
            refresh_token: None,
            expires_at: Some(now + Duration::hours(6)),
        });
        assert_eq!(account.access_token, "access-2");
        assert_eq!(account.refresh_token.as_deref(), Some("refresh-1"));
        assert!(!account.needs_refresh(now, Duration::minutes(5)));
    }
}
