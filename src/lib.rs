// ABOUTME: Library entry point for the Pierre fitness provider connectors
// ABOUTME: Exposes the connector trait, provider implementations, and the canonical activity schema
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Connectors
//!
//! Aggregates fitness activities from Strava, Garmin, Polar and COROS behind one
//! uniform connector interface and normalizes them into a single activity schema
//! for the coaching platform.
//!
//! ## Architecture
//!
//! - **Connectors**: one [`connectors::ActivityConnector`] implementation per provider,
//!   each absorbing its own authentication scheme, pagination model and vocabulary
//! - **Registry**: [`connectors::ConnectorRegistry`] maps a [`models::Provider`] to its connector
//! - **Models**: the canonical [`models::NormalizedActivity`] and the credential/webhook records
//!   exchanged with the orchestrator
//! - **Errors**: [`errors::ConnectorError`] classifies failures so the caller can decide on
//!   refresh, backoff or retry
//!
//! Connectors never touch storage: they receive bare credential strings and return
//! normalized records, leaving persistence, deduplication and retry policy to the caller.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pierre_connectors::config::ConnectorConfig;
//! use pierre_connectors::connectors::ConnectorRegistry;
//! use pierre_connectors::models::Provider;
//!
//! # async fn example() -> pierre_connectors::errors::ConnectorResult<()> {
//! let config = ConnectorConfig::from_env()?;
//! let registry = ConnectorRegistry::from_config(&config)?;
//! let strava = registry.get(Provider::Strava)?;
//! let url = strava
//!     .get_authorization_url("csrf-token", "https://app.example.com/callback")
//!     .await?;
//! println!("{url}");
//! # Ok(())
//! # }
//! ```

/// Configuration for provider credentials and HTTP behavior
pub mod config;
/// Provider endpoints, scopes, and rate-limit windows
pub mod constants;
/// Connector trait, registry, and provider implementations
pub mod connectors;
/// Error taxonomy for connector operations
pub mod errors;
/// Structured logging setup
pub mod logging;
/// Canonical activity schema and connector exchange records
pub mod models;
