// ABOUTME: Canonical data model shared by all provider connectors
// ABOUTME: Normalized activities, credential exchange records, and webhook dispatch records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Connected accounts and the credential records connectors exchange with the caller
pub mod account;
/// Normalized activity schema and data-quality signals
pub mod activity;
/// Provider identity
pub mod provider;
/// Webhook dispatch records
pub mod webhook;

pub use account::{AccessToken, AuthorizationCallback, ConnectedAccount, TokenGrant, TokenRefresh};
pub use activity::{
    ActivityType, AvailableMetrics, DataQuality, LatLng, NormalizedActivity,
    NormalizedActivityBuilder,
};
pub use provider::Provider;
pub use webhook::{WebhookAction, WebhookEvent};
