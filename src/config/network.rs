// ABOUTME: HTTP client configuration shared by every connector
// ABOUTME: Request and connect timeouts for the pooled reqwest client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::http;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
    /// Connection establishment timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: http::DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: http::DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl HttpClientConfig {
    /// Request timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connect timeout
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
