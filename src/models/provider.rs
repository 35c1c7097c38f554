// ABOUTME: Provider identity enumeration for connected fitness services
// ABOUTME: Parsing, display names, and per-provider rate-limit windows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source of an activity record
///
/// `Manual` marks activities entered on the platform itself; it has no connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provider {
    /// Strava API v3
    Strava,
    /// Garmin Connect wellness API
    Garmin,
    /// Polar `AccessLink`
    Polar,
    /// COROS open API
    Coros,
    /// Entered manually on the platform
    Manual,
}

impl Provider {
    /// Providers backed by a connector
    pub const CONNECTED: [Self; 4] = [Self::Strava, Self::Garmin, Self::Polar, Self::Coros];

    /// Lowercase identifier used in configuration and logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strava => "strava",
            Self::Garmin => "garmin",
            Self::Polar => "polar",
            Self::Coros => "coros",
            Self::Manual => "manual",
        }
    }

    /// Human-readable name
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Strava => "Strava",
            Self::Garmin => "Garmin",
            Self::Polar => "Polar",
            Self::Coros => "Coros",
            Self::Manual => "Manual",
        }
    }

    /// Backoff window after a 429 when the provider omits `Retry-After`
    ///
    /// Manual entries have no remote API and therefore no window.
    #[must_use]
    pub const fn rate_limit_window_secs(self) -> u64 {
        match self {
            Self::Strava => constants::strava::RATE_LIMIT_WINDOW_SECS,
            Self::Garmin => constants::garmin::RATE_LIMIT_WINDOW_SECS,
            Self::Polar => constants::polar::RATE_LIMIT_WINDOW_SECS,
            Self::Coros => constants::coros::RATE_LIMIT_WINDOW_SECS,
            Self::Manual => 0,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a provider name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strava" => Ok(Self::Strava),
            "garmin" => Ok(Self::Garmin),
            "polar" => Ok(Self::Polar),
            "coros" => Ok(Self::Coros),
            "manual" => Ok(Self::Manual),
            other => Err(UnknownProvider(other.to_owned())),
        }
    }
}
