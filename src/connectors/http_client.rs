// ABOUTME: Pooled HTTP client construction for provider API calls
// ABOUTME: One client per registry, cloned into each connector so all share the connection pool
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::config::HttpClientConfig;
use crate::errors::{ConnectorError, ConnectorResult};
use reqwest::{Client, ClientBuilder};

/// User agent sent with every provider request
pub const USER_AGENT: &str = concat!("pierre-connectors/", env!("CARGO_PKG_VERSION"));

/// Build the pooled HTTP client
///
/// Cloning the returned client is cheap and shares its pool, which is the only
/// state connectors share across calls.
///
/// # Errors
///
/// Returns `Configuration` if the TLS backend cannot be initialized
pub fn build_client(config: &HttpClientConfig) -> ConnectorResult<Client> {
    ClientBuilder::new()
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ConnectorError::Configuration(format!("failed to build HTTP client: {e}")))
}
