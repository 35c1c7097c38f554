// ABOUTME: Explicit connector configuration passed into every connector constructor
// ABOUTME: Aggregates per-provider settings, HTTP client settings and pending-auth TTL
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Configuration
//!
//! There is no process-wide settings singleton. Build a [`ConnectorConfig`]
//! directly (tests, multi-tenant hosts) or load one with
//! [`ConnectorConfig::from_env`] and hand it to the registry.

/// HTTP client settings
pub mod network;
/// Provider OAuth credentials and endpoints
pub mod oauth;

pub use network::HttpClientConfig;
pub use oauth::{load_provider_settings, parse_scopes, ProviderSettings};

use crate::constants::http;
use crate::errors::{ConnectorError, ConnectorResult};
use crate::models::Provider;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the whole connector layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    /// Strava credentials; connector not registered when absent
    pub strava: Option<ProviderSettings>,
    /// Garmin consumer key/secret
    pub garmin: Option<ProviderSettings>,
    /// Polar credentials
    pub polar: Option<ProviderSettings>,
    /// COROS credentials
    pub coros: Option<ProviderSettings>,
    /// Pooled HTTP client settings
    pub http: HttpClientConfig,
    /// Lifetime of a pending OAuth 1.0a request-token secret
    pub pending_auth_ttl_secs: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            strava: None,
            garmin: None,
            polar: None,
            coros: None,
            http: HttpClientConfig::default(),
            pending_auth_ttl_secs: http::DEFAULT_PENDING_AUTH_TTL_SECS,
        }
    }
}

impl ConnectorConfig {
    /// Load configuration from the environment
    ///
    /// Providers without client credentials are left unconfigured.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when a numeric variable cannot be parsed.
    pub fn from_env() -> ConnectorResult<Self> {
        let http = HttpClientConfig {
            timeout_secs: parse_env("PIERRE_HTTP_TIMEOUT_SECS", http::DEFAULT_TIMEOUT_SECS)?,
            connect_timeout_secs: parse_env(
                "PIERRE_HTTP_CONNECT_TIMEOUT_SECS",
                http::DEFAULT_CONNECT_TIMEOUT_SECS,
            )?,
        };

        Ok(Self {
            strava: load_provider_settings(Provider::Strava),
            garmin: load_provider_settings(Provider::Garmin),
            polar: load_provider_settings(Provider::Polar),
            coros: load_provider_settings(Provider::Coros),
            http,
            pending_auth_ttl_secs: parse_env(
                "PIERRE_PENDING_AUTH_TTL_SECS",
                http::DEFAULT_PENDING_AUTH_TTL_SECS,
            )?,
        })
    }

    /// Settings for one provider, if configured
    #[must_use]
    pub const fn settings(&self, provider: Provider) -> Option<&ProviderSettings> {
        match provider {
            Provider::Strava => self.strava.as_ref(),
            Provider::Garmin => self.garmin.as_ref(),
            Provider::Polar => self.polar.as_ref(),
            Provider::Coros => self.coros.as_ref(),
            Provider::Manual => None,
        }
    }

    /// Replace one provider's settings
    #[must_use]
    pub fn with_provider(mut self, provider: Provider, settings: ProviderSettings) -> Self {
        match provider {
            Provider::Strava => self.strava = Some(settings),
            Provider::Garmin => self.garmin = Some(settings),
            Provider::Polar => self.polar = Some(settings),
            Provider::Coros => self.coros = Some(settings),
            Provider::Manual => {}
        }
        self
    }

    /// Providers with credentials present
    #[must_use]
    pub fn configured_providers(&self) -> Vec<Provider> {
        Provider::CONNECTED
            .into_iter()
            .filter(|provider| self.settings(*provider).is_some())
            .collect()
    }

    /// Lifetime of a pending authorization
    #[must_use]
    pub const fn pending_auth_ttl(&self) -> Duration {
        Duration::from_secs(self.pending_auth_ttl_secs)
    }
}

/// Read an environment variable with a default value
#[must_use]
pub fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: FromStr + ToString>(key: &str, default: T) -> ConnectorResult<T> {
    env_var_or(key, &default.to_string())
        .trim()
        .parse()
        .map_err(|_| ConnectorError::Configuration(format!("{key} must be a number")))
}
