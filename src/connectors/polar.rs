// ABOUTME: Polar AccessLink connector with non-expiring OAuth 2.0 tokens and user registration
// ABOUTME: Transaction-based exercise pull, sample streams, and ISO-8601 duration normalization
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Polar `AccessLink`
//!
//! Polar has no paged listing. New exercises are pulled through a
//! transaction: create it (204 means nothing new), list its exercise URLs,
//! fetch each exercise, then commit so the same exercises are not returned
//! again. Query dates and page numbers are ignored.
//!
//! `AccessLink` addresses users by id, so resource calls need
//! [`AccessToken::user_id`] set to the `x_user_id` returned by the exchange.
//!
//! Polar offers no webhooks; [`PolarConnector::handle_webhook`] always returns `None`.

use super::core::{ActivityConnector, ActivityQuery, ConnectorCapabilities, StreamMap};
use super::utils::{self, conversions, fields};
use crate::config::ProviderSettings;
use crate::errors::{ConnectorError, ConnectorResult};
use crate::models::{
    AccessToken, ActivityType, AuthorizationCallback, AvailableMetrics, DataQuality,
    NormalizedActivity, NormalizedActivityBuilder, Provider, TokenGrant, TokenRefresh,
    WebhookEvent,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Polar `sport` values and their canonical category
const TYPE_TABLE: &[(&str, ActivityType)] = &[
    ("RUNNING", ActivityType::Run),
    ("CYCLING", ActivityType::Ride),
    ("SWIMMING", ActivityType::Swim),
    ("WALKING", ActivityType::Walk),
    ("HIKING", ActivityType::Hike),
    ("FITNESS", ActivityType::Workout),
    ("STRENGTH_TRAINING", ActivityType::Workout),
];

#[derive(Debug, Deserialize)]
struct PolarTokenResponse {
    access_token: String,
    x_user_id: Value,
}

/// Parse an ISO-8601 time duration such as `PT1H30M45S` into whole seconds
///
/// Each of the hour, minute and second components is optional but they must
/// appear in that order. Fractional seconds are truncated. Anything else,
/// including a bare `PT`, yields `None`.
#[must_use]
pub fn parse_duration(value: &str) -> Option<u64> {
    let rest = value.trim().strip_prefix("PT")?;
    if rest.is_empty() {
        return None;
    }

    let mut total: u64 = 0;
    let mut number = String::new();
    let mut last_rank = 0;
    for ch in rest.chars() {
        if ch.is_ascii_digit() || ch == '.' {
            number.push(ch);
            continue;
        }
        let (rank, factor) = match ch {
            'H' => (1, 3600),
            'M' => (2, 60),
            'S' => (3, 1),
            _ => return None,
        };
        if rank <= last_rank || number.is_empty() {
            return None;
        }
        let amount = if ch == 'S' {
            conversions::f64_to_u64(number.parse::<f64>().ok()?.trunc())
        } else {
            number.parse::<u64>().ok()?
        };
        total = total.saturating_add(amount.saturating_mul(factor));
        number.clear();
        last_rank = rank;
    }

    number.is_empty().then_some(total)
}

fn is_under(path: &str, base_path: &str) -> bool {
    let base_path = base_path.trim_end_matches('/');
    path.strip_prefix(base_path)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Polar connector
pub struct PolarConnector {
    client: Client,
    settings: ProviderSettings,
    api_base: Option<Url>,
}

impl PolarConnector {
    /// Create a connector sharing the given HTTP client pool
    #[must_use]
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        let api_base = Url::parse(&settings.api_base_url).ok();
        Self {
            client,
            settings,
            api_base,
        }
    }

    /// Register the user with `AccessLink`
    ///
    /// Required once after the exchange before any data can be pulled.
    /// Idempotent: returns `Ok(true)` when newly registered and `Ok(false)`
    /// when Polar reports the user is already registered.
    ///
    /// # Errors
    ///
    /// Returns the classified error for any other failure
    #[instrument(skip(self, token), fields(provider = "polar", api_call = "register_user"))]
    pub async fn register_user(&self, token: &AccessToken, member_id: &str) -> ConnectorResult<bool> {
        let response = self
            .client
            .post(self.settings.api_url("users"))
            .bearer_auth(&token.token)
            .json(&json!({ "member-id": member_id }))
            .send()
            .await
            .map_err(|e| ConnectorError::from_transport(Provider::Polar, &e))?;

        match response.status() {
            StatusCode::CONFLICT => {
                info!("user already registered");
                Ok(false)
            }
            status if status.is_success() => {
                info!("user registered");
                Ok(true)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ConnectorError::from_status(Provider::Polar, status, body, None))
            }
        }
    }

    /// Resolve an exercise id or absolute URL, refusing URLs outside the API base
    fn resolve(&self, id_or_url: &str) -> ConnectorResult<String> {
        if !(id_or_url.starts_with("https://") || id_or_url.starts_with("http://")) {
            return Ok(self
                .settings
                .api_url(&format!("exercises/{}", urlencoding::encode(id_or_url))));
        }

        let url = Url::parse(id_or_url).map_err(|e| {
            ConnectorError::malformed(Provider::Polar, format!("invalid resource URL: {e}"))
        })?;
        let trusted = self.api_base.as_ref().is_some_and(|base| {
            url.scheme() == base.scheme()
                && url.host_str() == base.host_str()
                && url.port_or_known_default() == base.port_or_known_default()
                && is_under(url.path(), base.path())
        });
        if !trusted {
            warn!(host = ?url.host_str(), "refusing resource URL outside the AccessLink API");
            return Err(ConnectorError::malformed(
                Provider::Polar,
                format!("resource URL is outside the AccessLink API: {id_or_url}"),
            ));
        }
        Ok(url.into())
    }

    async fn get_json(&self, token: &AccessToken, url: &str) -> ConnectorResult<Value> {
        let request = self
            .client
            .get(url)
            .bearer_auth(&token.token)
            .header(reqwest::header::ACCEPT, "application/json");
        let response = utils::send(Provider::Polar, request).await?;
        utils::read_json(Provider::Polar, response).await
    }

    fn user_id(token: &AccessToken) -> ConnectorResult<&str> {
        token.user_id.as_deref().ok_or_else(|| {
            ConnectorError::Configuration(
                "Polar requests need the AccessLink user id on the access token".to_owned(),
            )
        })
    }

    fn quality(raw: &Value, duration: Option<u64>) -> (DataQuality, AvailableMetrics) {
        let heart_rate = raw.get("heart-rate").unwrap_or(&Value::Null);
        let metrics = AvailableMetrics {
            duration: duration.is_some(),
            distance: fields::present(raw, "distance").is_some(),
            heart_rate: fields::present(heart_rate, "average").is_some(),
            power: false,
            cadence: false,
            elevation: fields::present(raw, "ascent").is_some(),
            temperature: false,
            gps: fields::bool_field(raw, "has-route").unwrap_or(false),
            calories: fields::present(raw, "calories").is_some(),
        };
        let grade = DataQuality::grade(
            metrics.duration && metrics.distance && metrics.heart_rate,
            metrics.duration,
        );
        (grade, metrics)
    }
}

#[async_trait]
impl ActivityConnector for PolarConnector {
    fn provider(&self) -> Provider {
        Provider::Polar
    }

    fn capabilities(&self) -> ConnectorCapabilities {
        ConnectorCapabilities::STREAMS | ConnectorCapabilities::USER_REGISTRATION
    }

    async fn get_authorization_url(&self, state: &str, redirect_uri: &str) -> ConnectorResult<String> {
        let url = Url::parse_with_params(
            &self.settings.auth_url("authorization"),
            &[
                ("response_type", "code"),
                ("client_id", self.settings.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", self.settings.scope_param().as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| ConnectorError::Configuration(format!("invalid Polar auth URL: {e}")))?;
        Ok(url.into())
    }

    /// Exchange the code, then register the user
    ///
    /// A failed registration does not fail the exchange: the code is already
    /// spent. `user_info.registered` reports the outcome so the caller can
    /// retry [`PolarConnector::register_user`].
    #[instrument(skip(self, callback), fields(provider = "polar", api_call = "exchange_code"))]
    async fn exchange_code(&self, callback: &AuthorizationCallback) -> ConnectorResult<TokenGrant> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", callback.code.as_str()),
        ];
        if let Some(redirect_uri) = callback.redirect_uri.as_deref() {
            form.push(("redirect_uri", redirect_uri));
        }

        let response = self
            .client
            .post(self.settings.auth_url("token"))
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| ConnectorError::from_transport(Provider::Polar, &e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!(status = status.as_u16(), "token exchange rejected");
            return Err(ConnectorError::auth_exchange(
                Provider::Polar,
                Some(status.as_u16()),
                body,
            ));
        }
        let data: PolarTokenResponse = serde_json::from_str(&body)
            .map_err(|e| ConnectorError::malformed(Provider::Polar, format!("token response: {e}")))?;
        let user_id = fields::as_string(&data.x_user_id).ok_or_else(|| {
            ConnectorError::malformed(Provider::Polar, "token response has no x_user_id")
        })?;
        info!(user_id = %user_id, "token exchange succeeded");

        let access = AccessToken::bearer(data.access_token.clone()).with_user_id(user_id.clone());
        let registered = match self.register_user(&access, &user_id).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "user registration failed, caller should retry");
                false
            }
        };

        Ok(TokenGrant {
            access_token: data.access_token,
            refresh_token: None,
            token_secret: None,
            expires_at: None,
            user_info: json!({
                "id": user_id,
                "member_id": user_id,
                "registered": registered,
            }),
            provider_user_id: user_id,
        })
    }

    async fn refresh_access_token(&self, _refresh_token: &str) -> ConnectorResult<Option<TokenRefresh>> {
        debug!(provider = "polar", "AccessLink tokens do not expire, skipping refresh");
        Ok(None)
    }

    #[instrument(skip(self, token, _query), fields(provider = "polar", api_call = "exercise_transaction"))]
    async fn get_activities(&self, token: &AccessToken, _query: &ActivityQuery) -> ConnectorResult<Vec<Value>> {
        let user_id = Self::user_id(token)?;
        let request = self
            .client
            .post(
                self.settings
                    .api_url(&format!("users/{}/exercise-transactions", urlencoding::encode(user_id))),
            )
            .bearer_auth(&token.token);
        let response = utils::send(Provider::Polar, request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            info!("no new exercises");
            return Ok(Vec::new());
        }

        let transaction = utils::read_json(Provider::Polar, response).await?;
        let resource_uri = fields::string_field(&transaction, "resource-uri").ok_or_else(|| {
            ConnectorError::malformed(Provider::Polar, "transaction has no resource-uri")
        })?;
        let transaction_url = self.resolve(&resource_uri)?;
        let transaction_id = fields::string_field(&transaction, "transaction-id");

        let listing = self.get_json(token, &transaction_url).await?;
        let urls: Vec<String> = listing
            .get("exercises")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(fields::as_string).collect())
            .unwrap_or_default();

        let mut exercises = Vec::with_capacity(urls.len());
        for url in &urls {
            let resolved = self.resolve(url)?;
            exercises.push(self.get_json(token, &resolved).await?);
        }

        let commit = self.client.put(&transaction_url).bearer_auth(&token.token);
        utils::send(Provider::Polar, commit).await?;
        info!(count = exercises.len(), transaction_id = ?transaction_id, "transaction committed");
        Ok(exercises)
    }

    #[instrument(skip(self, token), fields(provider = "polar", api_call = "get_exercise"))]
    async fn get_activity_detail(&self, token: &AccessToken, activity_id: &str) -> ConnectorResult<Value> {
        let url = self.resolve(activity_id)?;
        self.get_json(token, &url).await
    }

    #[instrument(skip(self, token), fields(provider = "polar", api_call = "get_samples"))]
    async fn get_activity_streams(&self, token: &AccessToken, activity_id: &str) -> ConnectorResult<StreamMap> {
        let exercise = self.get_activity_detail(token, activity_id).await?;
        let Some(samples_url) = fields::string_field(&exercise, "samples") else {
            debug!("exercise has no samples link");
            return Ok(StreamMap::new());
        };

        match self.get_json(token, &self.resolve(&samples_url)?).await {
            Ok(Value::Object(samples)) => Ok(samples),
            Ok(_) => Ok(StreamMap::new()),
            Err(ConnectorError::ProviderRejected { status, .. })
                if status == StatusCode::NOT_FOUND.as_u16() =>
            {
                Ok(StreamMap::new())
            }
            Err(e) => Err(e),
        }
    }

    fn normalize_activity(&self, raw: &Value) -> NormalizedActivity {
        let sport = fields::string_field(raw, "sport");
        let duration = fields::string_field(raw, "duration")
            .as_deref()
            .and_then(parse_duration);
        let heart_rate = raw.get("heart-rate").unwrap_or(&Value::Null);
        let (grade, metrics) = Self::quality(raw, duration);

        NormalizedActivityBuilder::new(
            Provider::Polar,
            fields::string_field(raw, "id").unwrap_or_default(),
            format!("Polar {}", sport.as_deref().unwrap_or("Exercise")),
            ActivityType::lookup(TYPE_TABLE, sport.as_deref().unwrap_or_default()),
            utils::start_date_or_epoch(raw, "start-time"),
            raw.clone(),
        )
        .sport_type_opt(sport)
        .duration_seconds_opt(duration)
        .distance_meters_opt(fields::f64_field(raw, "distance"))
        .elevation_opt(
            fields::f64_field(raw, "ascent"),
            fields::f64_field(raw, "descent"),
        )
        .heart_rate_opt(
            fields::u32_field(heart_rate, "average"),
            fields::u32_field(heart_rate, "maximum"),
        )
        .calories_opt(fields::f64_field(raw, "calories"))
        .quality(grade, metrics)
        .build()
    }

    fn handle_webhook(&self, _payload: &Value) -> Option<WebhookEvent> {
        debug!(provider = "polar", "webhooks are not offered by AccessLink");
        None
    }
}
