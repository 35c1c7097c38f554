// ABOUTME: Garmin Connect wellness API connector using the OAuth 1.0a two-step handshake
// ABOUTME: Signed activity fetches, push-notification decoding, and normalization of Garmin summaries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// OAuth 1.0a HMAC-SHA1 request signing
pub mod oauth1;

use self::oauth1::OAuth1Signer;
use super::core::{ActivityConnector, ActivityQuery, ConnectorCapabilities, StreamMap};
use super::pending_auth::{PendingAuthStore, PendingAuthorization};
use super::utils::{self, fields};
use crate::config::ProviderSettings;
use crate::errors::{ConnectorError, ConnectorResult};
use crate::models::{
    AccessToken, ActivityType, AuthorizationCallback, AvailableMetrics, DataQuality, LatLng,
    NormalizedActivity, NormalizedActivityBuilder, Provider, TokenGrant, TokenRefresh,
    WebhookAction, WebhookEvent,
};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::{form_urlencoded, Url};

/// Garmin `activityType` values and their canonical category
const TYPE_TABLE: &[(&str, ActivityType)] = &[
    ("RUNNING", ActivityType::Run),
    ("TRAIL_RUNNING", ActivityType::Run),
    ("TREADMILL_RUNNING", ActivityType::Run),
    ("CYCLING", ActivityType::Ride),
    ("ROAD_BIKING", ActivityType::Ride),
    ("MOUNTAIN_BIKING", ActivityType::Ride),
    ("INDOOR_CYCLING", ActivityType::Ride),
    ("SWIMMING", ActivityType::Swim),
    ("LAP_SWIMMING", ActivityType::Swim),
    ("OPEN_WATER_SWIMMING", ActivityType::Swim),
    ("WALKING", ActivityType::Walk),
    ("HIKING", ActivityType::Hike),
    ("FITNESS_EQUIPMENT", ActivityType::Workout),
    ("STRENGTH_TRAINING", ActivityType::Workout),
];

/// Garmin connector
pub struct GarminConnector {
    client: Client,
    settings: ProviderSettings,
    pending: Arc<dyn PendingAuthStore>,
    pending_ttl: Duration,
}

impl GarminConnector {
    /// Create a connector; request-token secrets live in `pending` for `pending_ttl`
    #[must_use]
    pub fn new(
        client: Client,
        settings: ProviderSettings,
        pending: Arc<dyn PendingAuthStore>,
        pending_ttl: Duration,
    ) -> Self {
        Self {
            client,
            settings,
            pending,
            pending_ttl,
        }
    }

    fn signer(&self) -> OAuth1Signer<'_> {
        OAuth1Signer::new(&self.settings.client_id, &self.settings.client_secret)
    }

    /// POST to an OAuth endpoint and parse the form-encoded token pair
    async fn token_request(
        &self,
        path: &str,
        signer: &OAuth1Signer<'_>,
        extra_oauth: &[(&str, &str)],
    ) -> ConnectorResult<(String, String)> {
        let url = self.settings.auth_url(path);
        let header = signer.authorization_header("POST", &url, &[], extra_oauth);
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, header)
            .send()
            .await
            .map_err(|e| ConnectorError::from_transport(Provider::Garmin, &e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!(provider = "garmin", status = status.as_u16(), path, "OAuth endpoint rejected request");
            return Err(ConnectorError::auth_exchange(
                Provider::Garmin,
                Some(status.as_u16()),
                body,
            ));
        }

        let mut params: HashMap<String, String> = form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .collect();
        match (params.remove("oauth_token"), params.remove("oauth_token_secret")) {
            (Some(token), Some(secret)) if !token.is_empty() => Ok((token, secret)),
            _ => Err(ConnectorError::malformed(
                Provider::Garmin,
                format!("token response lacks oauth_token/oauth_token_secret: {body}"),
            )),
        }
    }

    /// Signed GET against the wellness API
    async fn signed_get(
        &self,
        token: &AccessToken,
        path: &str,
        query: &[(&str, &str)],
    ) -> ConnectorResult<Value> {
        let secret = token.secret.as_deref().ok_or_else(|| {
            ConnectorError::Configuration("Garmin requests need the OAuth token secret".to_owned())
        })?;
        let url = self.settings.api_url(path);
        let header = self
            .signer()
            .with_token(&token.token, secret)
            .authorization_header("GET", &url, query, &[]);

        let request = self
            .client
            .get(&url)
            .query(query)
            .header(AUTHORIZATION, header);
        let response = utils::send(Provider::Garmin, request).await?;
        utils::read_json(Provider::Garmin, response).await
    }

    fn callback_with_state(redirect_uri: &str, state: &str) -> ConnectorResult<String> {
        let mut url = Url::parse(redirect_uri).map_err(|e| {
            ConnectorError::Configuration(format!("invalid redirect URI {redirect_uri}: {e}"))
        })?;
        url.query_pairs_mut().append_pair("state", state);
        Ok(url.into())
    }

    fn start_latlng(raw: &Value) -> Option<LatLng> {
        Some(LatLng(
            fields::f64_field(raw, "startingLatitudeInDegree")?,
            fields::f64_field(raw, "startingLongitudeInDegree")?,
        ))
    }

    fn quality(raw: &Value) -> (DataQuality, AvailableMetrics) {
        let metrics = AvailableMetrics {
            duration: fields::present(raw, "durationInSeconds").is_some(),
            distance: fields::present(raw, "distanceInMeters").is_some(),
            heart_rate: fields::present(raw, "averageHeartRateInBeatsPerMinute").is_some(),
            power: fields::present(raw, "averagePowerInWatts").is_some(),
            cadence: fields::present(raw, "averageRunCadenceInStepsPerMinute").is_some(),
            elevation: fields::present(raw, "elevationGainInMeters").is_some(),
            temperature: false,
            gps: Self::start_latlng(raw).is_some(),
            calories: fields::present(raw, "activeKilocalories").is_some(),
        };
        let grade = DataQuality::grade(
            metrics.distance && metrics.duration && metrics.heart_rate,
            metrics.distance && metrics.duration,
        );
        (grade, metrics)
    }
}

#[async_trait]
impl ActivityConnector for GarminConnector {
    fn provider(&self) -> Provider {
        Provider::Garmin
    }

    fn capabilities(&self) -> ConnectorCapabilities {
        ConnectorCapabilities::OAUTH1
            | ConnectorCapabilities::DATE_FILTERS
            | ConnectorCapabilities::WEBHOOKS
    }

    /// Obtain a request token, park its secret under `state`, and return the user authorization URL
    #[instrument(skip(self, state), fields(provider = "garmin", api_call = "request_token"))]
    async fn get_authorization_url(&self, state: &str, redirect_uri: &str) -> ConnectorResult<String> {
        let callback = Self::callback_with_state(redirect_uri, state)?;
        let (request_token, request_token_secret) = self
            .token_request(
                "oauth/request_token",
                &self.signer(),
                &[("oauth_callback", callback.as_str())],
            )
            .await?;

        let url = Url::parse_with_params(
            &self.settings.auth_url("oauth/authorize"),
            &[
                ("oauth_token", request_token.as_str()),
                ("oauth_callback", callback.as_str()),
            ],
        )
        .map_err(|e| ConnectorError::Configuration(format!("invalid Garmin auth URL: {e}")))?;

        self.pending
            .put(
                state,
                PendingAuthorization {
                    request_token,
                    request_token_secret,
                },
                self.pending_ttl,
            )
            .await?;
        info!("request token issued");
        Ok(url.into())
    }

    #[instrument(skip(self, callback), fields(provider = "garmin", api_call = "access_token"))]
    async fn exchange_code(&self, callback: &AuthorizationCallback) -> ConnectorResult<TokenGrant> {
        let state = callback
            .state
            .as_deref()
            .ok_or(ConnectorError::PendingAuthorization {
                provider: Provider::Garmin,
            })?;
        let verifier = callback.oauth_verifier.as_deref().ok_or_else(|| {
            ConnectorError::auth_exchange(Provider::Garmin, None, "callback has no oauth_verifier")
        })?;

        let pending = self
            .pending
            .take(state)
            .await?
            .ok_or(ConnectorError::PendingAuthorization {
                provider: Provider::Garmin,
            })?;
        if !pending.matches_token(&callback.code) {
            warn!("callback oauth_token does not match the pending request token");
            return Err(ConnectorError::auth_exchange(
                Provider::Garmin,
                None,
                "oauth_token does not match the pending authorization",
            ));
        }

        let signer = self
            .signer()
            .with_token(&pending.request_token, &pending.request_token_secret);
        let (access_token, token_secret) = self
            .token_request("oauth/access_token", &signer, &[("oauth_verifier", verifier)])
            .await?;

        let access = AccessToken::oauth1(access_token.clone(), token_secret.clone());
        let user_info = self.signed_get(&access, "user/id", &[]).await?;
        let provider_user_id = fields::string_field(&user_info, "userId").ok_or_else(|| {
            ConnectorError::malformed(Provider::Garmin, "user id response has no userId")
        })?;
        info!(user_id = %provider_user_id, "token exchange succeeded");

        Ok(TokenGrant {
            access_token,
            refresh_token: None,
            token_secret: Some(token_secret),
            expires_at: None,
            provider_user_id,
            user_info,
        })
    }

    async fn refresh_access_token(&self, _refresh_token: &str) -> ConnectorResult<Option<TokenRefresh>> {
        debug!(provider = "garmin", "OAuth 1.0a tokens do not expire, skipping refresh");
        Ok(None)
    }

    #[instrument(skip(self, token), fields(provider = "garmin", api_call = "get_activities"))]
    async fn get_activities(&self, token: &AccessToken, query: &ActivityQuery) -> ConnectorResult<Vec<Value>> {
        let start = query.after.map(|t| t.timestamp().to_string());
        let end = query.before.map(|t| t.timestamp().to_string());
        let mut params = Vec::new();
        if let Some(start) = start.as_deref() {
            params.push(("uploadStartTimeInSeconds", start));
        }
        if let Some(end) = end.as_deref() {
            params.push(("uploadEndTimeInSeconds", end));
        }

        let activities = match self.signed_get(token, "activities", &params).await? {
            Value::Array(items) => items,
            _ => Vec::new(),
        };
        info!(count = activities.len(), "fetched activities");
        Ok(activities)
    }

    #[instrument(skip(self, token), fields(provider = "garmin", api_call = "get_activity_detail"))]
    async fn get_activity_detail(&self, token: &AccessToken, activity_id: &str) -> ConnectorResult<Value> {
        self.signed_get(token, &format!("activities/{activity_id}"), &[])
            .await
    }

    async fn get_activity_streams(&self, _token: &AccessToken, activity_id: &str) -> ConnectorResult<StreamMap> {
        debug!(provider = "garmin", activity_id, "streams not offered by the wellness API");
        Ok(StreamMap::new())
    }

    fn normalize_activity(&self, raw: &Value) -> NormalizedActivity {
        let type_name = fields::string_field(raw, "activityType");
        let (grade, metrics) = Self::quality(raw);

        NormalizedActivityBuilder::new(
            Provider::Garmin,
            fields::string_field(raw, "activityId").unwrap_or_default(),
            fields::string_field(raw, "activityName").unwrap_or_else(|| "Garmin Activity".to_owned()),
            ActivityType::lookup(TYPE_TABLE, type_name.as_deref().unwrap_or_default()),
            utils::start_date_or_epoch(raw, "startTimeInSeconds"),
            raw.clone(),
        )
        .description_opt(fields::string_field(raw, "description"))
        .sport_type_opt(type_name)
        .duration_seconds_opt(fields::u64_field(raw, "durationInSeconds"))
        .moving_time_seconds_opt(fields::u64_field(raw, "activeTimeInSeconds"))
        .distance_meters_opt(fields::f64_field(raw, "distanceInMeters"))
        .elevation_opt(
            fields::f64_field(raw, "elevationGainInMeters"),
            fields::f64_field(raw, "elevationLossInMeters"),
        )
        .heart_rate_opt(
            fields::u32_field(raw, "averageHeartRateInBeatsPerMinute"),
            fields::u32_field(raw, "maxHeartRateInBeatsPerMinute"),
        )
        .power_opt(
            fields::f64_field(raw, "averagePowerInWatts"),
            fields::f64_field(raw, "maxPowerInWatts"),
            None,
        )
        .speed_opt(
            fields::f64_field(raw, "averageSpeedInMetersPerSecond"),
            fields::f64_field(raw, "maxSpeedInMetersPerSecond"),
        )
        .avg_cadence_opt(fields::f64_field(raw, "averageRunCadenceInStepsPerMinute"))
        .calories_opt(fields::f64_field(raw, "activeKilocalories"))
        .latlng_opt(Self::start_latlng(raw), None)
        .manual(fields::bool_field(raw, "manual").unwrap_or(false))
        .quality(grade, metrics)
        .build()
    }

    /// Garmin pushes `{userId, activityId, ...}`; every push is treated as a new activity
    fn handle_webhook(&self, payload: &Value) -> Option<WebhookEvent> {
        let provider_activity_id = fields::string_field(payload, "activityId")?;
        let provider_user_id = fields::string_field(payload, "userId").unwrap_or_default();
        info!(activity_id = %provider_activity_id, "decoded push notification");
        Some(WebhookEvent {
            action: WebhookAction::Create,
            provider_user_id,
            provider_activity_id,
            event_time: None,
        })
    }
}
