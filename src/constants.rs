// ABOUTME: Provider endpoint URLs, OAuth scopes, and documented rate-limit windows
// ABOUTME: Defaults that must match the providers' contracts exactly for interoperability
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Strava endpoints and scopes
pub mod strava {
    /// OAuth base (`/authorize`, `/token`, `/deauthorize`)
    pub const AUTH_BASE_URL: &str = "https://www.strava.com/oauth";
    /// REST API base
    pub const API_BASE_URL: &str = "https://www.strava.com/api/v3";
    /// Scopes requested on authorization
    pub const DEFAULT_SCOPES: &str = "activity:read_all,activity:write,profile:read_all";
    /// Maximum `per_page` accepted by the activities endpoint
    pub const MAX_PAGE_SIZE: u32 = 200;
    /// Strava's short-term rate limit window (15 minutes)
    pub const RATE_LIMIT_WINDOW_SECS: u64 = 900;
    /// Stream keys requested for time-series data
    pub const STREAM_KEYS: &[&str] = &[
        "time",
        "distance",
        "latlng",
        "altitude",
        "velocity_smooth",
        "heartrate",
        "cadence",
        "watts",
        "temp",
        "moving",
        "grade_smooth",
    ];
}

/// Garmin endpoints
pub mod garmin {
    /// OAuth 1.0a service base (`/oauth/request_token`, `/oauth/authorize`, `/oauth/access_token`)
    pub const AUTH_BASE_URL: &str = "https://connectapi.garmin.com/oauth-service";
    /// Wellness REST API base
    pub const API_BASE_URL: &str = "https://apis.garmin.com/wellness-api/rest";
    /// Garmin throttles per consumer key; one minute is the documented backoff
    pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;
}

/// Polar `AccessLink` endpoints and scopes
pub mod polar {
    /// OAuth 2.0 base (`/authorization`, `/token`)
    pub const AUTH_BASE_URL: &str = "https://flow.polar.com/oauth2";
    /// `AccessLink` REST API base
    pub const API_BASE_URL: &str = "https://www.polaraccesslink.com/v3";
    /// Scopes requested on authorization
    pub const DEFAULT_SCOPES: &str = "accesslink.read_all";
    /// Polar's short-term rate limit window (15 minutes)
    pub const RATE_LIMIT_WINDOW_SECS: u64 = 900;
}

/// COROS endpoints and scopes
pub mod coros {
    /// OAuth base (`/authorize`, `/accesstoken`, `/refresh-token`)
    pub const AUTH_BASE_URL: &str = "https://open.coros.com/oauth2";
    /// REST API base
    pub const API_BASE_URL: &str = "https://open.coros.com/api/v1";
    /// Scopes requested on authorization
    pub const DEFAULT_SCOPES: &str = "training_data:read";
    /// Value of `result` in every successful response envelope
    pub const SUCCESS_SENTINEL: &str = "0000";
    /// Maximum `pageSize` accepted by the sport list endpoint
    pub const MAX_PAGE_SIZE: u32 = 100;
    /// Token lifetime assumed when the token endpoint omits `expires_in`
    pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;
    /// Documented backoff window after a 429
    pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;
}

/// HTTP client defaults
pub mod http {
    /// Default request timeout in seconds
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Default connection timeout in seconds
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
    /// Default lifetime of a pending OAuth 1.0a request-token secret
    pub const DEFAULT_PENDING_AUTH_TTL_SECS: u64 = 600;
}
