// ABOUTME: COROS open API connector with HMAC-SHA256 signatures on every request
// ABOUTME: Result-envelope checking, paged sport list, pace-to-speed conversion, and webhook decoding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::core::{ActivityConnector, ActivityQuery, ConnectorCapabilities, StreamMap};
use super::utils::{self, fields};
use crate::config::ProviderSettings;
use crate::constants::coros;
use crate::errors::{ConnectorError, ConnectorResult, TokenFlow};
use crate::models::{
    AccessToken, ActivityType, AuthorizationCallback, AvailableMetrics, DataQuality,
    NormalizedActivity, NormalizedActivityBuilder, Provider, TokenGrant, TokenRefresh,
    WebhookAction, WebhookEvent,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, RequestBuilder};
use ring::hmac;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Header carrying the request timestamp
pub const TIMESTAMP_HEADER: &str = "timestamp";
/// Header carrying the HMAC signature
pub const SIGNATURE_HEADER: &str = "signature";

/// Hex HMAC-SHA256 of `client_id + timestamp` keyed by the client secret
///
/// Pure and deterministic for fixed inputs; callers must pass a fresh
/// timestamp for every request.
#[must_use]
pub fn sign_request(client_id: &str, client_secret: &str, timestamp: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, client_secret.as_bytes());
    let mut context = hmac::Context::with_key(&key);
    context.update(client_id.as_bytes());
    context.update(timestamp.as_bytes());
    hex::encode(context.sign().as_ref())
}

/// Canonical category for a COROS `mode` code
#[must_use]
pub const fn activity_type_for_mode(mode: i64) -> ActivityType {
    match mode {
        0 => ActivityType::Run,
        1 => ActivityType::Ride,
        2 => ActivityType::Swim,
        3 => ActivityType::Hike,
        4 => ActivityType::Walk,
        5 => ActivityType::Workout,
        _ => ActivityType::Other,
    }
}

/// Convert a pace in seconds per kilometre to metres per second
fn pace_to_speed(pace_secs_per_km: Option<f64>) -> Option<f64> {
    pace_secs_per_km
        .filter(|pace| *pace > 0.0)
        .map(|pace| 1000.0 / pace)
}

/// COROS connector
pub struct CorosConnector {
    client: Client,
    settings: ProviderSettings,
}

impl CorosConnector {
    /// Create a connector sharing the given HTTP client pool
    #[must_use]
    pub const fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    /// Attach a freshly computed timestamp and signature
    fn signed(&self, request: RequestBuilder) -> RequestBuilder {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_request(
            &self.settings.client_id,
            &self.settings.client_secret,
            &timestamp,
        );
        request
            .header(TIMESTAMP_HEADER, timestamp)
            .header(SIGNATURE_HEADER, signature)
    }

    /// Split a `{result, message, data}` envelope, failing unless `result` is the success sentinel
    fn open_envelope(envelope: Value) -> Result<Value, String> {
        let result = fields::string_field(&envelope, "result");
        if result.as_deref() == Some(coros::SUCCESS_SENTINEL) {
            return Ok(envelope.get("data").cloned().unwrap_or(Value::Null));
        }
        let message = fields::string_field(&envelope, "message").unwrap_or_default();
        Err(format!(
            "result {}: {message}",
            result.as_deref().unwrap_or("missing")
        ))
    }

    async fn post_token(
        &self,
        flow: TokenFlow,
        path: &str,
        body: Value,
    ) -> ConnectorResult<(String, Option<String>, DateTime<Utc>)> {
        let request = self.signed(self.client.post(self.settings.auth_url(path)).json(&body));
        let response = request
            .send()
            .await
            .map_err(|e| ConnectorError::from_transport(Provider::Coros, &e))?;

        let status = response.status();
        let retry_after = utils::retry_after_secs(&response);
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!(provider = "coros", status = status.as_u16(), ?flow, "token endpoint rejected request");
            return Err(ConnectorError::from_token_status(
                Provider::Coros,
                flow,
                status,
                text,
                retry_after,
            ));
        }

        let envelope: Value = serde_json::from_str(&text)
            .map_err(|e| ConnectorError::malformed(Provider::Coros, format!("token response: {e}")))?;
        let data = Self::open_envelope(envelope)
            .map_err(|message| ConnectorError::auth_exchange(Provider::Coros, Some(status.as_u16()), message))?;

        let access_token = fields::string_field(&data, "access_token").ok_or_else(|| {
            ConnectorError::malformed(Provider::Coros, "token response has no access_token")
        })?;
        let expires_in = fields::u32_field(&data, "expires_in")
            .map_or(coros::DEFAULT_EXPIRES_IN_SECS, i64::from);
        let expires_at = Utc::now() + Duration::seconds(expires_in);

        Ok((
            access_token,
            fields::string_field(&data, "refresh_token"),
            expires_at,
        ))
    }

    async fn api_get(&self, token: &AccessToken, path: &str, query: &[(&str, String)]) -> ConnectorResult<Value> {
        let request = self.signed(
            self.client
                .get(self.settings.api_url(path))
                .bearer_auth(&token.token)
                .query(query),
        );
        let response = utils::send(Provider::Coros, request).await?;
        let envelope = utils::read_json(Provider::Coros, response).await?;
        Self::open_envelope(envelope).map_err(|message| {
            warn!(provider = "coros", path, "envelope reported failure");
            ConnectorError::malformed(Provider::Coros, message)
        })
    }

    /// Fetch the authenticated user's profile (`openId`, nickname)
    ///
    /// # Errors
    ///
    /// Returns the classified error for network, HTTP or envelope failures
    #[instrument(skip(self, token), fields(provider = "coros", api_call = "userinfo"))]
    pub async fn get_user_profile(&self, token: &AccessToken) -> ConnectorResult<Value> {
        self.api_get(token, "userinfo", &[]).await
    }

    fn quality(raw: &Value) -> (DataQuality, AvailableMetrics) {
        let metrics = AvailableMetrics {
            duration: fields::present(raw, "duration").is_some(),
            distance: fields::present(raw, "distance").is_some(),
            heart_rate: fields::present(raw, "avgHr").is_some(),
            power: fields::present(raw, "avgPower").is_some(),
            cadence: fields::present(raw, "avgCadence").is_some(),
            elevation: fields::present(raw, "totalUp").is_some(),
            temperature: false,
            gps: false,
            calories: fields::present(raw, "calorie").is_some(),
        };
        let grade = DataQuality::grade(
            metrics.distance && metrics.duration && metrics.heart_rate,
            metrics.distance && metrics.duration,
        );
        (grade, metrics)
    }
}

#[async_trait]
impl ActivityConnector for CorosConnector {
    fn provider(&self) -> Provider {
        Provider::Coros
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
            ],
        )
        .map_err(|e| ConnectorError::Configuration(format!("invalid COROS auth URL: {e}")))?;
        Ok(url.into())
    }

    #[instrument(skip(self, callback), fields(provider = "coros", api_call = "accesstoken"))]
    async fn exchange_code(&self, callback: &AuthorizationCallback) -> ConnectorResult<TokenGrant> {
        let mut body = json!({
            "client_id": self.settings.client_id,
            "client_secret": self.settings.client_secret,
            "code": callback.code,
            "grant_type": "authorization_code",
        });
        if let Some(redirect_uri) = &callback.redirect_uri {
            body["redirect_uri"] = json!(redirect_uri);
        }
        let (access_token, refresh_token, expires_at) = self
            .post_token(TokenFlow::Exchange, "accesstoken", body)
            .await?;

        let user_info = self
            .get_user_profile(&AccessToken::bearer(access_token.clone()))
            .await?;
        let provider_user_id = fields::string_field(&user_info, "openId").ok_or_else(|| {
            ConnectorError::malformed(Provider::Coros, "userinfo has no openId")
        })?;
        info!(open_id = %provider_user_id, "token exchange succeeded");

        Ok(TokenGrant {
            access_token,
            refresh_token,
            token_secret: None,
            expires_at: Some(expires_at),
            provider_user_id,
            user_info,
        })
    }

    #[instrument(skip(self, refresh_token), fields(provider = "coros", api_call = "refresh_token"))]
    async fn refresh_access_token(&self, refresh_token: &str) -> ConnectorResult<Option<TokenRefresh>> {
        let (access_token, new_refresh_token, expires_at) = self
            .post_token(
                TokenFlow::Refresh,
                "refresh-token",
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
            access_token,
            refresh_token: new_refresh_token,
            expires_at: Some(expires_at),
        }))
    }

    #[instrument(skip(self, token), fields(provider = "coros", api_call = "sport_list", page = query.page))]
    async fn get_activities(&self, token: &AccessToken, query: &ActivityQuery) -> ConnectorResult<Vec<Value>> {
        let mut params = vec![
            ("page", query.page.max(1).to_string()),
            ("pageSize", query.per_page.clamp(1, coros::MAX_PAGE_SIZE).to_string()),
        ];
        if let Some(after) = query.after {
            params.push(("startDate", after.format("%Y%m%d").to_string()));
        }
        if let Some(before) = query.before {
            params.push(("endDate", before.format("%Y%m%d").to_string()));
        }

        let data = self.api_get(token, "sport/list", &params).await?;
        let activities = data
            .get("dataList")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        info!(count = activities.len(), "fetched sport list page");
        Ok(activities)
    }

    #[instrument(skip(self, token), fields(provider = "coros", api_call = "sport_detail"))]
    async fn get_activity_detail(&self, token: &AccessToken, activity_id: &str) -> ConnectorResult<Value> {
        self.api_get(token, "sport/detail", &[("labelId", activity_id.to_owned())])
            .await
    }

    #[instrument(skip(self, token), fields(provider = "coros", api_call = "sport_file"))]
    async fn get_activity_streams(&self, token: &AccessToken, activity_id: &str) -> ConnectorResult<StreamMap> {
        match self
            .api_get(token, "sport/file", &[("labelId", activity_id.to_owned())])
            .await?
        {
            Value::Object(streams) => Ok(streams),
            _ => {
                debug!(activity_id, "no sport file data");
                Ok(StreamMap::new())
            }
        }
    }

    fn normalize_activity(&self, raw: &Value) -> NormalizedActivity {
        let activity_type = fields::f64_field(raw, "mode")
            .filter(|mode| mode.fract() == 0.0)
            .map_or(ActivityType::Other, |mode| activity_type_for_mode(mode as i64));
        let (grade, metrics) = Self::quality(raw);

        NormalizedActivityBuilder::new(
            Provider::Coros,
            fields::string_field(raw, "labelId").unwrap_or_default(),
            fields::string_field(raw, "sportName").unwrap_or_else(|| "Coros Activity".to_owned()),
            activity_type,
            utils::start_date_or_epoch(raw, "startTime"),
            raw.clone(),
        )
        .sport_type_opt(fields::string_field(raw, "subMode"))
        .duration_seconds_opt(fields::u64_field(raw, "duration"))
        .distance_meters_opt(fields::f64_field(raw, "distance"))
        .elevation_opt(
            fields::f64_field(raw, "totalUp"),
            fields::f64_field(raw, "totalDown"),
        )
        .heart_rate_opt(
            fields::u32_field(raw, "avgHr"),
            fields::u32_field(raw, "maxHr"),
        )
        .power_opt(
            fields::f64_field(raw, "avgPower"),
            fields::f64_field(raw, "maxPower"),
            None,
        )
        .speed_opt(
            pace_to_speed(fields::f64_field(raw, "avgPace")),
            pace_to_speed(fields::f64_field(raw, "maxPace")),
        )
        .avg_cadence_opt(fields::f64_field(raw, "avgCadence"))
        .calories_opt(fields::f64_field(raw, "calorie"))
        .quality(grade, metrics)
        .build()
    }

    /// COROS pushes `{event, openId, labelId}`; any event naming an activity is
    /// dispatched, and events other than update/delete are treated as a new upload
    fn handle_webhook(&self, payload: &Value) -> Option<WebhookEvent> {
        let provider_activity_id = fields::string_field(payload, "labelId")?;
        let action = fields::string_field(payload, "event")
            .and_then(|event| WebhookAction::parse(&event))
            .unwrap_or(WebhookAction::Create);
        let provider_user_id = fields::string_field(payload, "openId").unwrap_or_default();
        info!(action = %action, activity_id = %provider_activity_id, "decoded webhook");
        Some(WebhookEvent {
            action,
            provider_user_id,
            provider_activity_id,
            event_time: None,
        })
    }
}
