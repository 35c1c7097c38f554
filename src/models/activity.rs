// ABOUTME: Canonical normalized activity schema produced by every provider connector
// ABOUTME: Activity type vocabulary, data-quality grading, and the fixed-key metrics availability map
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::Provider;
use crate::errors::{ConnectorError, ConnectorResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-agnostic activity category
///
/// Every provider vocabulary maps onto these; anything unmapped becomes `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    /// Running, trail and treadmill included
    Run,
    /// Cycling of any kind
    Ride,
    /// Pool or open water swimming
    Swim,
    /// Strength, gym and generic workouts
    Workout,
    /// Walking
    Walk,
    /// Hiking
    Hike,
    /// Anything the provider table does not map
    Other,
}

impl ActivityType {
    /// Resolve a provider sport name through a fixed lookup table
    ///
    /// Matching ignores ASCII case; unmapped names resolve to `Other`.
    #[must_use]
    pub fn lookup(table: &[(&str, Self)], provider_value: &str) -> Self {
        let needle = provider_value.trim();
        table
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(needle))
            .map_or(Self::Other, |(_, activity_type)| *activity_type)
    }
}

/// Completeness grade of a normalized activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataQuality {
    /// Missing the signals required for `Partial`
    Minimal,
    /// Enough for volume tracking but not for physiological analysis
    Partial,
    /// All signals the provider can deliver for meaningful analysis
    Full,
}

impl DataQuality {
    /// Grade from the provider-specific precedence: `full` wins over `partial`
    #[must_use]
    pub const fn grade(full: bool, partial: bool) -> Self {
        if full {
            Self::Full
        } else if partial {
            Self::Partial
        } else {
            Self::Minimal
        }
    }
}

/// Which metrics are present on an activity
///
/// Serializes as an object that always carries all nine keys, even when false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableMetrics {
    /// Elapsed duration
    pub duration: bool,
    /// Distance
    pub distance: bool,
    /// Heart rate
    pub heart_rate: bool,
    /// Power
    pub power: bool,
    /// Cadence
    pub cadence: bool,
    /// Elevation gain
    pub elevation: bool,
    /// Temperature
    pub temperature: bool,
    /// GPS start point
    pub gps: bool,
    /// Calories
    pub calories: bool,
}

impl AvailableMetrics {
    /// Keys present in every serialized map
    pub const KEYS: [&'static str; 9] = [
        "duration",
        "distance",
        "heart_rate",
        "power",
        "cadence",
        "elevation",
        "temperature",
        "gps",
        "calories",
    ];
}

/// A latitude/longitude pair, serialized as `[lat, lng]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng(pub f64, pub f64);

/// Canonical activity record
///
/// Produced fresh by `normalize_activity` on every call; the persistence layer
/// upserts it by `(provider, provider_activity_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedActivity {
    /// Source of truth
    pub provider: Provider,
    /// Provider's identifier, unique per provider
    pub provider_activity_id: String,
    /// Title
    pub name: String,
    /// Free-text description
    pub description: Option<String>,
    /// Canonical category
    pub activity_type: ActivityType,
    /// Raw provider subtype, preserved verbatim
    pub sport_type: Option<String>,
    /// Start time in UTC
    pub start_date: DateTime<Utc>,
    /// Provider-reported timezone label
    pub timezone: Option<String>,
    /// Elapsed time in seconds
    pub duration_seconds: Option<u64>,
    /// Moving time in seconds
    pub moving_time_seconds: Option<u64>,
    /// Distance in meters
    pub distance_meters: Option<f64>,
    /// Total ascent in meters
    pub elevation_gain_meters: Option<f64>,
    /// Total descent in meters
    pub elevation_loss_meters: Option<f64>,
    /// Average heart rate in bpm
    pub avg_heart_rate: Option<u32>,
    /// Maximum heart rate in bpm
    pub max_heart_rate: Option<u32>,
    /// Average power in watts
    pub avg_power: Option<f64>,
    /// Maximum power in watts
    pub max_power: Option<f64>,
    /// Weighted/normalized power in watts
    pub normalized_power: Option<f64>,
    /// Average speed in m/s
    pub avg_speed_mps: Option<f64>,
    /// Maximum speed in m/s
    pub max_speed_mps: Option<f64>,
    /// Average cadence (rpm or spm)
    pub avg_cadence: Option<f64>,
    /// Average temperature in Celsius
    pub avg_temperature: Option<f64>,
    /// Energy in kilocalories
    pub calories: Option<f64>,
    /// GPS start point
    pub start_latlng: Option<LatLng>,
    /// GPS end point
    pub end_latlng: Option<LatLng>,
    /// Entered manually on the provider side
    pub is_manual: bool,
    /// Visible to the athlete's coach
    pub shared_with_coach: bool,
    /// Completeness grade
    pub data_quality: DataQuality,
    /// Metrics availability map
    pub available_metrics: AvailableMetrics,
    /// Full provider payload, kept for replay and debugging
    pub raw_data: serde_json::Value,
}

impl NormalizedActivity {
    /// Unique key used by the persistence layer
    ///
    /// # Errors
    ///
    /// Returns `MalformedResponse` when the provider record carried no identifier.
    pub fn upsert_key(&self) -> ConnectorResult<(Provider, &str)> {
        if self.provider_activity_id.trim().is_empty() {
            return Err(ConnectorError::malformed(
                self.provider,
                "activity record has no provider activity id",
            ));
        }
        Ok((self.provider, self.provider_activity_id.as_str()))
    }
}

/// Builder for [`NormalizedActivity`], one `_opt` setter per optional field
pub struct NormalizedActivityBuilder {
    activity: NormalizedActivity,
}

impl NormalizedActivityBuilder {
    /// Start a record with the required fields; all metrics empty, quality `Minimal`
    #[must_use]
    pub fn new(
        provider: Provider,
        provider_activity_id: impl Into<String>,
        name: impl Into<String>,
        activity_type: ActivityType,
        start_date: DateTime<Utc>,
        raw_data: serde_json::Value,
    ) -> Self {
        Self {
            activity: NormalizedActivity {
                provider,
                provider_activity_id: provider_activity_id.into(),
                name: name.into(),
                description: None,
                activity_type,
                sport_type: None,
                start_date,
                timezone: None,
                duration_seconds: None,
                moving_time_seconds: None,
                distance_meters: None,
                elevation_gain_meters: None,
                elevation_loss_meters: None,
                avg_heart_rate: None,
                max_heart_rate: None,
                avg_power: None,
                max_power: None,
                normalized_power: None,
                avg_speed_mps: None,
                max_speed_mps: None,
                avg_cadence: None,
                avg_temperature: None,
                calories: None,
                start_latlng: None,
                end_latlng: None,
                is_manual: false,
                shared_with_coach: true,
                data_quality: DataQuality::Minimal,
                available_metrics: AvailableMetrics::default(),
                raw_data,
            },
        }
    }

    /// Set description
    #[must_use]
    pub fn description_opt(mut self, value: Option<String>) -> Self {
        self.activity.description = value;
        self
    }

    /// Set raw provider subtype
    #[must_use]
    pub fn sport_type_opt(mut self, value: Option<String>) -> Self {
        self.activity.sport_type = value;
        self
    }

    /// Set timezone label
    #[must_use]
    pub fn timezone_opt(mut self, value: Option<String>) -> Self {
        self.activity.timezone = value;
        self
    }

    /// Set elapsed duration
    #[must_use]
    pub const fn duration_seconds_opt(mut self, value: Option<u64>) -> Self {
        self.activity.duration_seconds = value;
        self
    }

    /// Set moving time
    #[must_use]
    pub const fn moving_time_seconds_opt(mut self, value: Option<u64>) -> Self {
        self.activity.moving_time_seconds = value;
        self
    }

    /// Set distance
    #[must_use]
    pub const fn distance_meters_opt(mut self, value: Option<f64>) -> Self {
        self.activity.distance_meters = value;
        self
    }

    /// Set elevation gain and loss
    #[must_use]
    pub const fn elevation_opt(mut self, gain: Option<f64>, loss: Option<f64>) -> Self {
        self.activity.elevation_gain_meters = gain;
        self.activity.elevation_loss_meters = loss;
        self
    }

    /// Set average and maximum heart rate
    #[must_use]
    pub const fn heart_rate_opt(mut self, avg: Option<u32>, max: Option<u32>) -> Self {
        self.activity.avg_heart_rate = avg;
        self.activity.max_heart_rate = max;
        self
    }

    /// Set average, maximum and normalized power
    #[must_use]
    pub const fn power_opt(
        mut self,
        avg: Option<f64>,
        max: Option<f64>,
        normalized: Option<f64>,
    ) -> Self {
        self.activity.avg_power = avg;
        self.activity.max_power = max;
        self.activity.normalized_power = normalized;
        self
    }

    /// Set average and maximum speed
    #[must_use]
    pub const fn speed_opt(mut self, avg: Option<f64>, max: Option<f64>) -> Self {
        self.activity.avg_speed_mps = avg;
        self.activity.max_speed_mps = max;
        self
    }

    /// Set average cadence
    #[must_use]
    pub const fn avg_cadence_opt(mut self, value: Option<f64>) -> Self {
        self.activity.avg_cadence = value;
        self
    }

    /// Set average temperature
    #[must_use]
    pub const fn avg_temperature_opt(mut self, value: Option<f64>) -> Self {
        self.activity.avg_temperature = value;
        self
    }

    /// Set calories
    #[must_use]
    pub const fn calories_opt(mut self, value: Option<f64>) -> Self {
        self.activity.calories = value;
        self
    }

    /// Set GPS start and end points
    #[must_use]
    pub const fn latlng_opt(mut self, start: Option<LatLng>, end: Option<LatLng>) -> Self {
        self.activity.start_latlng = start;
        self.activity.end_latlng = end;
        self
    }

    /// Mark as manually entered on the provider side
    #[must_use]
    pub const fn manual(mut self, is_manual: bool) -> Self {
        self.activity.is_manual = is_manual;
        self
    }

    /// Attach the data-quality grade and metrics map
    #[must_use]
    pub const fn quality(mut self, grade: DataQuality, metrics: AvailableMetrics) -> Self {
        self.activity.data_quality = grade;
        self.activity.available_metrics = metrics;
        self
    }

    /// Finish the record
    #[must_use]
    pub fn build(self) -> NormalizedActivity {
        self.activity
    }
}
