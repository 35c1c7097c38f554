// ABOUTME: Per-provider OAuth client credentials, endpoint bases and scopes
// ABOUTME: Loads PIERRE_<PROVIDER>_* environment variables with legacy fallbacks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants;
use crate::models::Provider;
use std::env;
use std::fmt;

/// Client credentials and endpoints for one provider
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// OAuth client id (Garmin: consumer key)
    pub client_id: String,
    /// OAuth client secret (Garmin: consumer secret)
    pub client_secret: String,
    /// OAuth service base URL
    pub auth_base_url: String,
    /// Resource API base URL
    pub api_base_url: String,
    /// Scopes requested on authorization
    pub scopes: Vec<String>,
}

impl ProviderSettings {
    /// Settings with the provider's contractual endpoints and scopes
    #[must_use]
    pub fn new(
        provider: Provider,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        let (auth_base_url, api_base_url, scopes) = default_endpoints(provider);
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_base_url: auth_base_url.to_owned(),
            api_base_url: api_base_url.to_owned(),
            scopes: parse_scopes(scopes),
        }
    }

    /// Point both bases somewhere else, e.g. a mock server
    #[must_use]
    pub fn with_base_urls(
        mut self,
        auth_base_url: impl Into<String>,
        api_base_url: impl Into<String>,
    ) -> Self {
        self.auth_base_url = trim_base(auth_base_url.into());
        self.api_base_url = trim_base(api_base_url.into());
        self
    }

    /// Scopes joined the way the providers expect them
    #[must_use]
    pub fn scope_param(&self) -> String {
        self.scopes.join(",")
    }

    /// Build an absolute auth URL from a path relative to the auth base
    #[must_use]
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/{}", self.auth_base_url, path.trim_start_matches('/'))
    }

    /// Build an absolute API URL from a path relative to the API base
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_base_url", &self.auth_base_url)
            .field("api_base_url", &self.api_base_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

const fn default_endpoints(provider: Provider) -> (&'static str, &'static str, &'static str) {
    match provider {
        Provider::Strava => (
            constants::strava::AUTH_BASE_URL,
            constants::strava::API_BASE_URL,
            constants::strava::DEFAULT_SCOPES,
        ),
        Provider::Garmin => (
            constants::garmin::AUTH_BASE_URL,
            constants::garmin::API_BASE_URL,
            "",
        ),
        Provider::Polar => (
            constants::polar::AUTH_BASE_URL,
            constants::polar::API_BASE_URL,
            constants::polar::DEFAULT_SCOPES,
        ),
        Provider::Coros => (
            constants::coros::AUTH_BASE_URL,
            constants::coros::API_BASE_URL,
            constants::coros::DEFAULT_SCOPES,
        ),
        Provider::Manual => ("", "", ""),
    }
}

fn trim_base(url: String) -> String {
    match url.strip_suffix('/') {
        Some(trimmed) => trimmed.to_owned(),
        None => url,
    }
}

/// Load one provider's settings from the environment
///
/// Credentials come from `PIERRE_<P>_CLIENT_ID`/`_CLIENT_SECRET`, falling back to
/// `<P>_CLIENT_ID`/`_CLIENT_SECRET`. Returns `None` unless both are set.
/// `PIERRE_<P>_AUTH_URL`, `PIERRE_<P>_API_BASE_URL` and `PIERRE_<P>_SCOPES`
/// override the defaults.
#[must_use]
pub fn load_provider_settings(provider: Provider) -> Option<ProviderSettings> {
    let provider_upper = provider.as_str().to_uppercase();

    let client_id = env::var(format!("PIERRE_{provider_upper}_CLIENT_ID"))
        .or_else(|_| env::var(format!("{provider_upper}_CLIENT_ID")))
        .ok()?;
    let client_secret = env::var(format!("PIERRE_{provider_upper}_CLIENT_SECRET"))
        .or_else(|_| env::var(format!("{provider_upper}_CLIENT_SECRET")))
        .ok()?;

    let mut settings = ProviderSettings::new(provider, client_id, client_secret);

    if let Ok(auth_url) = env::var(format!("PIERRE_{provider_upper}_AUTH_URL")) {
        settings.auth_base_url = trim_base(auth_url);
    }
    if let Ok(api_base_url) = env::var(format!("PIERRE_{provider_upper}_API_BASE_URL")) {
        settings.api_base_url = trim_base(api_base_url);
    }
    if let Ok(scopes) = env::var(format!("PIERRE_{provider_upper}_SCOPES")) {
        settings.scopes = parse_scopes(&scopes);
    }

    Some(settings)
}

/// Parse comma-separated scopes
#[must_use]
pub fn parse_scopes(scopes_str: &str) -> Vec<String> {
    scopes_str
        .split(',')
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}
