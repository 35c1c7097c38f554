// ABOUTME: Strava API v3 connector with rotating OAuth 2.0 refresh tokens
// ABOUTME: Paged activity listing, detail and stream fetch, webhook decoding, and normalization
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::core::{ActivityConnector, ActivityQuery, ConnectorCapabilities, StreamMap};
use super::utils::{self, fields};
use crate::config::ProviderSettings;
use crate::constants::strava;
use crate::errors::{ConnectorError, ConnectorResult, TokenFlow};
use crate::models::{
    AccessToken, ActivityType, AuthorizationCallback, AvailableMetrics, DataQuality,
    NormalizedActivity, NormalizedActivityBuilder, Provider, TokenGrant, TokenRefresh,
    WebhookAction, WebhookEvent,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use url::Url;

/// Strava `type` values and their canonical category
const TYPE_TABLE: &[(&str, ActivityType)] = &[
    ("Run", ActivityType::Run),
    ("TrailRun", ActivityType::Run),
    ("VirtualRun", ActivityType::Run),
    ("Ride", ActivityType::Ride),
    ("VirtualRide", ActivityType::Ride),
    ("GravelRide", ActivityType::Ride),
    ("MountainBikeRide", ActivityType::Ride),
    ("EBikeRide", ActivityType::Ride),
    ("Swim", ActivityType::Swim),
    ("Workout", ActivityType::Workout),
    ("WeightTraining", ActivityType::Workout),
    ("Crossfit", ActivityType::Workout),
    ("Walk", ActivityType::Walk),
    ("Hike", ActivityType::Hike),
];

/// Token endpoint response for both exchange and refresh
#[derive(Debug, Deserialize)]
struct StravaTokenResponse {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
    athlete: Option<StravaAthlete>,
}

#[derive(Debug, Deserialize)]
struct StravaAthlete {
    id: u64,
    username: Option<String>,
    firstname: Option<String>,
    lastname: Option<String>,
    profile: Option<String>,
    profile_medium: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

/// Strava connector
pub struct StravaConnector {
    client: Client,
    settings: ProviderSettings,
}

impl StravaConnector {
    /// Create a connector sharing the given HTTP client pool
    #[must_use]
    pub const fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    async fn post_token(&self, flow: TokenFlow, body: Value) -> ConnectorResult<StravaTokenResponse> {
        let response = self
            .client
            .post(self.settings.auth_url("token"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ConnectorError::from_transport(Provider::Strava, &e))?;

        let status = response.status();
        let retry_after = utils::retry_after_secs(&response);
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!(provider = "strava", status = status.as_u16(), ?flow, "token endpoint rejected request");
            return Err(ConnectorError::from_token_status(
                Provider::Strava,
                flow,
                status,
                text,
                retry_after,
            ));
        }

        serde_json::from_str(&text).map_err(|e| {
            ConnectorError::malformed(Provider::Strava, format!("token response: {e}"))
        })
    }

    async fn api_get(&self, token: &AccessToken, path: &str, query: &[(&str, String)]) -> ConnectorResult<Value> {
        let request = self
            .client
            .get(self.settings.api_url(path))
            .bearer_auth(&token.token)
            .query(query);
        let response = utils::send(Provider::Strava, request).await?;
        utils::read_json(Provider::Strava, response).await
    }

    /// Fetch the authenticated athlete's profile
    ///
    /// # Errors
    ///
    /// Returns the classified error for network or HTTP failures
    #[instrument(skip(self, token), fields(provider = "strava", api_call = "get_athlete_profile"))]
    pub async fn get_athlete_profile(&self, token: &AccessToken) -> ConnectorResult<Value> {
        let profile = self.api_get(token, "athlete", &[]).await?;
        info!(athlete_id = ?profile.get("id"), "fetched athlete profile");
        Ok(profile)
    }

    /// Fetch an athlete's cumulative totals
    ///
    /// # Errors
    ///
    /// Returns the classified error for network or HTTP failures
    #[instrument(skip(self, token), fields(provider = "strava", api_call = "get_athlete_stats"))]
    pub async fn get_athlete_stats(&self, token: &AccessToken, athlete_id: &str) -> ConnectorResult<Value> {
        self.api_get(token, &format!("athletes/{athlete_id}/stats"), &[])
            .await
    }

    fn user_info(athlete: &StravaAthlete) -> Value {
        json!({
            "id": athlete.id,
            "username": athlete.username,
            "firstname": athlete.firstname,
            "lastname": athlete.lastname,
            "profile": athlete.profile,
            "profile_medium": athlete.profile_medium,
            "city": athlete.city,
            "state": athlete.state,
            "country": athlete.country,
        })
    }

    fn quality(raw: &Value) -> (DataQuality, AvailableMetrics) {
        let metrics = AvailableMetrics {
            duration: fields::present(raw, "elapsed_time").is_some(),
            distance: fields::present(raw, "distance").is_some(),
            heart_rate: fields::present(raw, "average_heartrate").is_some(),
            power: fields::present(raw, "average_watts").is_some(),
            cadence: fields::present(raw, "average_cadence").is_some(),
            elevation: fields::present(raw, "total_elevation_gain").is_some(),
            temperature: fields::present(raw, "average_temp").is_some(),
            gps: utils::latlng_field(raw, "start_latlng").is_some(),
            calories: fields::present(raw, "calories").is_some(),
        };
        let grade = DataQuality::grade(
            metrics.distance && metrics.duration && (metrics.heart_rate || metrics.power) && metrics.gps,
            metrics.distance && metrics.duration,
        );
        (grade, metrics)
    }
}

fn expiry(epoch: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(epoch, 0)
}

#[async_trait]
impl ActivityConnector for StravaConnector {
    fn provider(&self) -> Provider {
        Provider::Strava
    }

    fn capabilities(&self) -> ConnectorCapabilities {
        ConnectorCapabilities::REFRESHABLE_TOKENS
            | ConnectorCapabilities::DATE_FILTERS
            | ConnectorCapabilities::OFFSET_PAGINATION
            | ConnectorCapabilities::STREAMS
            | ConnectorCapabilities::WEBHOOKS
    }

    async fn get_authorization_url(&self, state: &str, redirect_uri: &str) -> ConnectorResult<String> {
        let url = Url::parse_with_params(
            &self.settings.auth_url("authorize"),
            &[
                ("client_id", self.settings.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", self.settings.scope_param().as_str()),
                ("state", state),
                ("approval_prompt", "auto"),
            ],
        )
        .map_err(|e| ConnectorError::Configuration(format!("invalid Strava auth URL: {e}")))?;
        Ok(url.into())
    }

    #[instrument(skip(self, callback), fields(provider = "strava", api_call = "exchange_code"))]
    async fn exchange_code(&self, callback: &AuthorizationCallback) -> ConnectorResult<TokenGrant> {
        let data = self
            .post_token(
                TokenFlow::Exchange,
                json!({
                    "client_id": self.settings.client_id,
                    "client_secret": self.settings.client_secret,
                    "code": callback.code,
                    "grant_type": "authorization_code",
                }),
            )
            .await?;

        let athlete = data.athlete.as_ref().ok_or_else(|| {
            ConnectorError::malformed(Provider::Strava, "token response has no athlete")
        })?;
        info!(athlete_id = athlete.id, "token exchange succeeded");

        Ok(TokenGrant {
            provider_user_id: athlete.id.to_string(),
            user_info: Self::user_info(athlete),
            expires_at: expiry(data.expires_at),
            access_token: data.access_token,
            refresh_token: Some(data.refresh_token),
            token_secret: None,
        })
    }

    #[instrument(skip(self, refresh_token), fields(provider = "strava", api_call = "refresh_token"))]
    async fn refresh_access_token(&self, refresh_token: &str) -> ConnectorResult<Option<TokenRefresh>> {
        let data = self
            .post_token(
                TokenFlow::Refresh,
                json!({
                    "client_id": self.settings.client_id,
                    "client_secret": self.settings.client_secret,
                    "refresh_token": refresh_token,
                    "grant_type": "refresh_token",
                }),
            )
            .await?;
        info!("access token refreshed");

        Ok(Some(TokenRefresh {
            access_token: data.access_token,
            refresh_token: Some(data.refresh_token),
            expires_at: expiry(data.expires_at),
        }))
    }

    #[instrument(skip(self, token), fields(provider = "strava", api_call = "get_activities", page = query.page))]
    async fn get_activities(&self, token: &AccessToken, query: &ActivityQuery) -> ConnectorResult<Vec<Value>> {
        let mut params = vec![
            ("page", query.page.max(1).to_string()),
            ("per_page", query.per_page.clamp(1, strava::MAX_PAGE_SIZE).to_string()),
        ];
        if let Some(after) = query.after {
            params.push(("after", after.timestamp().to_string()));
        }
        if let Some(before) = query.before {
            params.push(("before", before.timestamp().to_string()));
        }

        let activities = match self.api_get(token, "athlete/activities", &params).await? {
            Value::Array(items) => items,
            _ => Vec::new(),
        };
        info!(count = activities.len(), "fetched activity page");
        Ok(activities)
    }

    #[instrument(skip(self, token), fields(provider = "strava", api_call = "get_activity_detail"))]
    async fn get_activity_detail(&self, token: &AccessToken, activity_id: &str) -> ConnectorResult<Value> {
        self.api_get(
            token,
            &format!("activities/{activity_id}"),
            &[("include_all_efforts", "true".to_owned())],
        )
        .await
    }

    #[instrument(skip(self, token), fields(provider = "strava", api_call = "get_activity_streams"))]
    async fn get_activity_streams(&self, token: &AccessToken, activity_id: &str) -> ConnectorResult<StreamMap> {
        let result = self
            .api_get(
                token,
                &format!("activities/{activity_id}/streams"),
                &[
                    ("keys", strava::STREAM_KEYS.join(",")),
                    ("key_by_type", "true".to_owned()),
                ],
            )
            .await;

        match result {
            Ok(Value::Object(streams)) => Ok(streams),
            Ok(_) => Ok(StreamMap::new()),
            Err(ConnectorError::ProviderRejected { status, .. })
                if status == StatusCode::NOT_FOUND.as_u16() =>
            {
                warn!(activity_id, "streams not available");
                Ok(StreamMap::new())
            }
            Err(e) => Err(e),
        }
    }

    fn normalize_activity(&self, raw: &Value) -> NormalizedActivity {
        let type_name = fields::string_field(raw, "type")
            .or_else(|| fields::string_field(raw, "sport_type"))
            .unwrap_or_default();
        let (grade, metrics) = Self::quality(raw);

        NormalizedActivityBuilder::new(
            Provider::Strava,
            fields::string_field(raw, "id").unwrap_or_default(),
            fields::string_field(raw, "name").unwrap_or_else(|| "Strava Activity".to_owned()),
            ActivityType::lookup(TYPE_TABLE, &type_name),
            utils::start_date_or_epoch(raw, "start_date"),
            raw.clone(),
        )
        .description_opt(fields::string_field(raw, "description"))
        .sport_type_opt(fields::string_field(raw, "sport_type"))
        .timezone_opt(fields::string_field(raw, "timezone"))
        .duration_seconds_opt(fields::u64_field(raw, "elapsed_time"))
        .moving_time_seconds_opt(fields::u64_field(raw, "moving_time"))
        .distance_meters_opt(fields::f64_field(raw, "distance"))
        .elevation_opt(fields::f64_field(raw, "total_elevation_gain"), None)
        .heart_rate_opt(
            fields::u32_field(raw, "average_heartrate"),
            fields::u32_field(raw, "max_heartrate"),
        )
        .power_opt(
            fields::f64_field(raw, "average_watts"),
            fields::f64_field(raw, "max_watts"),
            fields::f64_field(raw, "weighted_average_watts"),
        )
        .speed_opt(
            fields::f64_field(raw, "average_speed"),
            fields::f64_field(raw, "max_speed"),
        )
        .avg_cadence_opt(fields::f64_field(raw, "average_cadence"))
        .avg_temperature_opt(fields::f64_field(raw, "average_temp"))
        .calories_opt(fields::f64_field(raw, "calories"))
        .latlng_opt(
            utils::latlng_field(raw, "start_latlng"),
            utils::latlng_field(raw, "end_latlng"),
        )
        .manual(fields::bool_field(raw, "manual").unwrap_or(false))
        .quality(grade, metrics)
        .build()
    }

    fn handle_webhook(&self, payload: &Value) -> Option<WebhookEvent> {
        let object_type = fields::string_field(payload, "object_type");
        if object_type.as_deref() != Some("activity") {
            info!(object_type = ?object_type, "ignoring non-activity webhook");
            return None;
        }

        let action = fields::string_field(payload, "aspect_type")
            .as_deref()
            .and_then(WebhookAction::parse)?;
        let event = WebhookEvent {
            action,
            provider_user_id: fields::string_field(payload, "owner_id")?,
            provider_activity_id: fields::string_field(payload, "object_id")?,
            event_time: fields::present(payload, "event_time").and_then(utils::parse_timestamp),
        };
        info!(
            action = %event.action,
            owner_id = %event.provider_user_id,
            activity_id = %event.provider_activity_id,
            "decoded webhook"
        );
        Some(event)
    }

    #[instrument(skip(self, token), fields(provider = "strava", api_call = "deauthorize"))]
    async fn revoke_access(&self, token: &AccessToken) -> ConnectorResult<bool> {
        let request = self
            .client
            .post(self.settings.auth_url("deauthorize"))
            .form(&[("access_token", token.token.as_str())]);
        utils::send(Provider::Strava, request).await?;
        info!("access revoked");
        Ok(true)
    }
}
