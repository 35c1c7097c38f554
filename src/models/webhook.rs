// ABOUTME: Uniform dispatch record decoded from provider push notifications
// ABOUTME: The orchestrator uses it to trigger a targeted activity fetch
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to the activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookAction {
    /// New activity uploaded
    Create,
    /// Activity edited
    Update,
    /// Activity removed
    Delete,
}

impl WebhookAction {
    /// Parse a provider action word, case-insensitively
    ///
    /// Returns `None` for actions the connectors do not dispatch.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "create" | "created" => Some(Self::Create),
            "update" | "updated" => Some(Self::Update),
            "delete" | "deleted" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Lowercase wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for WebhookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimal dispatch record for a webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// What happened
    pub action: WebhookAction,
    /// Provider's identifier for the athlete
    pub provider_user_id: String,
    /// Provider's identifier for the activity
    pub provider_activity_id: String,
    /// When the provider emitted the event
    pub event_time: Option<DateTime<Utc>>,
}
