// ABOUTME: Shared helpers for connector integration tests
// ABOUTME: Builds connectors pointed at a wiremock server and loads provider fixtures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use pierre_connectors::config::{HttpClientConfig, ProviderSettings};
use pierre_connectors::connectors::http_client::build_client;
use pierre_connectors::connectors::{
    CorosConnector, GarminConnector, InMemoryPendingAuthStore, PolarConnector, StravaConnector,
};
use pierre_connectors::models::Provider;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

pub const CLIENT_ID: &str = "test-client-id";
pub const CLIENT_SECRET: &str = "test-client-secret";

pub fn client() -> Client {
    build_client(&HttpClientConfig {
        timeout_secs: 5,
        connect_timeout_secs: 2,
    })
    .expect("test HTTP client")
}

/// Settings whose auth and API bases live under `server_uri`
pub fn mock_settings(provider: Provider, server_uri: &str, auth_path: &str, api_path: &str) -> ProviderSettings {
    ProviderSettings::new(provider, CLIENT_ID, CLIENT_SECRET)
        .with_base_urls(format!("{server_uri}{auth_path}"), format!("{server_uri}{api_path}"))
}

pub fn strava(server_uri: &str) -> StravaConnector {
    StravaConnector::new(
        client(),
        mock_settings(Provider::Strava, server_uri, "/oauth", "/api/v3"),
    )
}

pub fn polar(server_uri: &str) -> PolarConnector {
    PolarConnector::new(
        client(),
        mock_settings(Provider::Polar, server_uri, "/oauth2", "/v3"),
    )
}

pub fn coros(server_uri: &str) -> CorosConnector {
    CorosConnector::new(
        client(),
        mock_settings(Provider::Coros, server_uri, "/oauth2", "/api/v1"),
    )
}

pub fn garmin(server_uri: &str, store: Arc<InMemoryPendingAuthStore>) -> GarminConnector {
    GarminConnector::new(
        client(),
        mock_settings(Provider::Garmin, server_uri, "/oauth-service", "/wellness-api/rest"),
        store,
        Duration::from_secs(600),
    )
}

/// Connectors for pure operations; no network is ever touched
pub fn offline_strava() -> StravaConnector {
    strava("http://127.0.0.1:9")
}

pub fn offline_polar() -> PolarConnector {
    polar("http://127.0.0.1:9")
}

pub fn offline_coros() -> CorosConnector {
    coros("http://127.0.0.1:9")
}

pub fn offline_garmin() -> GarminConnector {
    garmin("http://127.0.0.1:9", Arc::new(InMemoryPendingAuthStore::new()))
}
