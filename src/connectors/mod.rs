// ABOUTME: Provider connector module wiring and public re-exports
// ABOUTME: Groups the connector contract, shared plumbing, and the four provider implementations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Lazy, page-by-page activity ingestion
pub mod activity_stream;
/// Connector trait, capability flags and listing parameters
pub mod core;
/// COROS open API connector
pub mod coros;
/// Garmin Connect connector (OAuth 1.0a)
pub mod garmin;
/// Pooled HTTP client construction
pub mod http_client;
/// OAuth 1.0a request-token secret storage
pub mod pending_auth;
/// Polar `AccessLink` connector
pub mod polar;
/// Provider to connector lookup
pub mod registry;
/// Strava API v3 connector
pub mod strava;
/// Lenient field access, timestamp parsing and response classification
pub mod utils;

pub use activity_stream::{create_activity_stream, ActivityStream, ActivityStreamExt, StreamConfig};
pub use core::{ActivityConnector, ActivityQuery, ConnectorCapabilities, StreamMap};
pub use coros::CorosConnector;
pub use garmin::GarminConnector;
pub use pending_auth::{InMemoryPendingAuthStore, PendingAuthStore, PendingAuthorization};
pub use polar::PolarConnector;
pub use registry::ConnectorRegistry;
pub use strava::StravaConnector;
