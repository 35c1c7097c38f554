// ABOUTME: Connector registry mapping each provider to its shared connector instance
// ABOUTME: Builds connectors from explicit configuration around one pooled HTTP client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::core::ActivityConnector;
use super::coros::CorosConnector;
use super::garmin::GarminConnector;
use super::http_client::build_client;
use super::pending_auth::{InMemoryPendingAuthStore, PendingAuthStore};
use super::polar::PolarConnector;
use super::strava::StravaConnector;
use crate::config::ConnectorConfig;
use crate::errors::{ConnectorError, ConnectorResult};
use crate::models::Provider;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Lookup table from provider to connector
///
/// Connectors are immutable after construction, so the same instance is
/// shared by every caller.
#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: BTreeMap<Provider, Arc<dyn ActivityConnector>>,
}

impl ConnectorRegistry {
    /// Empty registry; add connectors with [`Self::register`]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a connector for every provider with credentials in `config`
    ///
    /// Garmin request-token secrets are kept in a process-local store.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the HTTP client cannot be built
    pub fn from_config(config: &ConnectorConfig) -> ConnectorResult<Self> {
        Self::with_pending_store(config, Arc::new(InMemoryPendingAuthStore::new()))
    }

    /// Build connectors, keeping Garmin request-token secrets in `pending`
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the HTTP client cannot be built
    pub fn with_pending_store(
        config: &ConnectorConfig,
        pending: Arc<dyn PendingAuthStore>,
    ) -> ConnectorResult<Self> {
        let client = build_client(&config.http)?;
        let mut registry = Self::new();

        if let Some(settings) = &config.strava {
            registry.register(Arc::new(StravaConnector::new(
                client.clone(),
                settings.clone(),
            )));
        }
        if let Some(settings) = &config.garmin {
            registry.register(Arc::new(GarminConnector::new(
                client.clone(),
                settings.clone(),
                pending,
                config.pending_auth_ttl(),
            )));
        }
        if let Some(settings) = &config.polar {
            registry.register(Arc::new(PolarConnector::new(
                client.clone(),
                settings.clone(),
            )));
        }
        if let Some(settings) = &config.coros {
            registry.register(Arc::new(CorosConnector::new(client, settings.clone())));
        }

        let names = registry
            .providers()
            .iter()
            .map(|provider| provider.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        info!(
            "Connector registry initialized with {} connector(s): [{}]",
            registry.connectors.len(),
            names
        );
        Ok(registry)
    }

    /// Add or replace the connector for its provider
    pub fn register(&mut self, connector: Arc<dyn ActivityConnector>) {
        self.connectors.insert(connector.provider(), connector);
    }

    /// Connector for `provider`
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when the provider has no connector
    pub fn get(&self, provider: Provider) -> ConnectorResult<Arc<dyn ActivityConnector>> {
        self.connectors.get(&provider).cloned().ok_or_else(|| {
            ConnectorError::Configuration(format!("no connector configured for {provider}"))
        })
    }

    /// Providers with a registered connector, in stable order
    #[must_use]
    pub fn providers(&self) -> Vec<Provider> {
        self.connectors.keys().copied().collect()
    }

    /// Check if a provider has a connector
    #[must_use]
    pub fn is_registered(&self, provider: Provider) -> bool {
        self.connectors.contains_key(&provider)
    }
}
