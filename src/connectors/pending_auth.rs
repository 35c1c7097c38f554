// ABOUTME: Short-lived server-side store for OAuth 1.0a request-token secrets
// ABOUTME: Keyed by the CSRF state so the secret never travels through the browser
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Pending Authorizations
//!
//! OAuth 1.0a needs the request-token secret again when the verifier is
//! exchanged. The secret is held here between the authorization redirect and
//! the callback, keyed by the caller's CSRF `state`, and removed on first use.
//!
//! Hosts running several processes should implement [`PendingAuthStore`] over
//! a shared cache; [`InMemoryPendingAuthStore`] suits a single process.

use crate::errors::ConnectorResult;
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;
use tracing::debug;

/// Request token issued by the provider, waiting for the user's callback
#[derive(Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    /// Request token sent to the user's browser
    pub request_token: String,
    /// Request-token secret, never sent to the browser
    pub request_token_secret: String,
}

impl PendingAuthorization {
    /// Whether the callback's `oauth_token` is the token this entry was issued for
    ///
    /// Compared in constant time.
    #[must_use]
    pub fn matches_token(&self, oauth_token: &str) -> bool {
        self.request_token
            .as_bytes()
            .ct_eq(oauth_token.as_bytes())
            .into()
    }
}

impl fmt::Debug for PendingAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAuthorization")
            .field("request_token", &self.request_token)
            .field("request_token_secret", &"[REDACTED]")
            .finish()
    }
}

/// Keyed store of pending authorizations
#[async_trait]
pub trait PendingAuthStore: Send + Sync {
    /// Remember a pending authorization under `state` for `ttl`
    async fn put(
        &self,
        state: &str,
        pending: PendingAuthorization,
        ttl: Duration,
    ) -> ConnectorResult<()>;

    /// Remove and return the entry for `state`; `None` if absent or expired
    async fn take(&self, state: &str) -> ConnectorResult<Option<PendingAuthorization>>;
}

struct Entry {
    pending: PendingAuthorization,
    expires_at: Instant,
}

/// Process-local store backed by a concurrent map
#[derive(Default)]
pub struct InMemoryPendingAuthStore {
    entries: DashMap<String, Entry>,
}

impl InMemoryPendingAuthStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Number of entries, expired ones included until purged
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl PendingAuthStore for InMemoryPendingAuthStore {
    async fn put(
        &self,
        state: &str,
        pending: PendingAuthorization,
        ttl: Duration,
    ) -> ConnectorResult<()> {
        let purged = self.purge_expired();
        if purged > 0 {
            debug!(purged, "purged expired pending authorizations");
        }
        self.entries.insert(
            state.to_owned(),
            Entry {
                pending,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn take(&self, state: &str) -> ConnectorResult<Option<PendingAuthorization>> {
        let Some((_, entry)) = self.entries.remove(state) else {
            return Ok(None);
        };
        if entry.expires_at <= Instant::now() {
            debug!("pending authorization expired");
            return Ok(None);
        }
        Ok(Some(entry.pending))
    }
}
