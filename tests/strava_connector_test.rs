// ABOUTME: Strava connector tests against a mock Strava API
// ABOUTME: Covers token exchange and refresh, error classification, streams, webhooks, and revocation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use chrono::{TimeZone, Utc};
use pierre_connectors::connectors::{ActivityConnector, ActivityQuery};
use pierre_connectors::errors::ConnectorError;
use pierre_connectors::models::{AccessToken, AuthorizationCallback, WebhookAction};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token() -> AccessToken {
    AccessToken::bearer("strava-access")
}

// ============================================================================
// OAuth
// ============================================================================

#[tokio::test]
async fn test_exchange_code_returns_grant_with_athlete() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_json(json!({
            "client_id": common::CLIENT_ID,
            "client_secret": common::CLIENT_SECRET,
            "code": "auth-code",
            "grant_type": "authorization_code",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_at": 1_893_456_000,
            "athlete": {"id": 67890, "firstname": "Ada", "lastname": "L", "city": "Paris"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let grant = common::strava(&server.uri())
        .exchange_code(&AuthorizationCallback::new("auth-code"))
        .await
        .unwrap();

    assert_eq!(grant.access_token, "access-1");
    assert_eq!(grant.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(grant.provider_user_id, "67890");
    assert_eq!(grant.expires_at, Some(Utc.timestamp_opt(1_893_456_000, 0).unwrap()));
    assert_eq!(grant.user_info["firstname"], "Ada");
    assert!(grant.token_secret.is_none());
}

#[tokio::test]
async fn test_rejected_exchange_keeps_provider_body() {
    let server = MockServer::start().await;
    let body = r#"{"message":"Bad Request","errors":[{"resource":"AuthorizationCode","field":"code","code":"invalid"}]}"#;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string(body))
        .mount(&server)
        .await;

    let err = common::strava(&server.uri())
        .exchange_code(&AuthorizationCallback::new("spent-code"))
        .await
        .unwrap_err();

    match err {
        ConnectorError::AuthExchange {
            status, message, ..
        } => {
            assert_eq!(status, Some(400));
            assert_eq!(message, body);
        }
        other => panic!("expected AuthExchange, got {other:?}"),
    }
}

#[tokio::test]
async fn test_refresh_returns_rotated_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("\"grant_type\":\"refresh_token\""))
        .and(body_string_contains("\"refresh_token\":\"refresh-1\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "refresh_token": "refresh-2",
            "expires_at": 1_893_477_600
        })))
        .mount(&server)
        .await;

    let refreshed = common::strava(&server.uri())
        .refresh_access_token("refresh-1")
        .await
        .unwrap()
        .expect("Strava always issues new tokens");

    assert_eq!(refreshed.access_token, "access-2");
    assert_eq!(refreshed.refresh_token.as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn test_refresh_outage_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = common::strava(&server.uri())
        .refresh_access_token("refresh-1")
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::TransientNetwork { .. }));
    assert!(err.is_retryable());
    assert!(err.to_string().contains("upstream down"));
}

#[tokio::test]
async fn test_refresh_rate_limit_keeps_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let err = common::strava(&server.uri())
        .refresh_access_token("refresh-1")
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::RateLimitExceeded { .. }));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
}

#[tokio::test]
async fn test_refresh_with_revoked_grant_is_auth_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"message":"Bad Request"}"#))
        .mount(&server)
        .await;

    let err = common::strava(&server.uri())
        .refresh_access_token("revoked")
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::AuthExchange { status: Some(400), .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_athlete_profile_and_stats() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/athlete"))
        .and(header("authorization", "Bearer strava-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 67890, "firstname": "Ada"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/athletes/67890/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "all_run_totals": {"count": 42, "distance": 420_000.0}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = common::strava(&server.uri());
    let profile = connector.get_athlete_profile(&token()).await.unwrap();
    assert_eq!(profile["firstname"], "Ada");

    let stats = connector.get_athlete_stats(&token(), "67890").await.unwrap();
    assert_eq!(stats["all_run_totals"]["count"], 42);
}

#[tokio::test]
async fn test_revoke_access_posts_deauthorize() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/deauthorize"))
        .and(body_string_contains("access_token=strava-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "strava-access"})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(common::strava(&server.uri()).revoke_access(&token()).await.unwrap());
}

// ============================================================================
// Resource API
// ============================================================================

#[tokio::test]
async fn test_activity_listing_passes_paging_and_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/athlete/activities"))
        .and(header("authorization", "Bearer strava-access"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "200"))
        .and(query_param("after", "1700000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "type": "Run"},
            {"id": 2, "type": "Ride"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let query = ActivityQuery::with_page_size(500)
        .with_time_range(Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()), None)
        .page(2);
    let activities = common::strava(&server.uri())
        .get_activities(&token(), &query)
        .await
        .unwrap();

    assert_eq!(activities.len(), 2);
}

#[tokio::test]
async fn test_unauthorized_is_token_expired() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/athlete/activities"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"message":"Authorization Error"}"#))
        .mount(&server)
        .await;

    let err = common::strava(&server.uri())
        .get_activities(&token(), &ActivityQuery::default())
        .await
        .unwrap_err();

    assert!(err.requires_reauthentication());
    assert!(err.to_string().contains("Authorization Error"));
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/activities/123"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "17")
                .set_body_string("Rate Limit Exceeded"),
        )
        .mount(&server)
        .await;

    let err = common::strava(&server.uri())
        .get_activity_detail(&token(), "123")
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(17)));
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/activities/123"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = common::strava(&server.uri())
        .get_activity_detail(&token(), "123")
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::TransientNetwork { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_streams_keyed_by_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/activities/123/streams"))
        .and(query_param("key_by_type", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "heartrate": {"data": [120, 125, 131], "series_type": "time"},
            "time": {"data": [0, 1, 2], "series_type": "time"}
        })))
        .mount(&server)
        .await;

    let streams = common::strava(&server.uri())
        .get_activity_streams(&token(), "123")
        .await
        .unwrap();

    assert_eq!(streams.len(), 2);
    assert_eq!(streams["heartrate"]["data"][2], 131);
}

#[tokio::test]
async fn test_missing_streams_are_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/activities/456/streams"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"message":"Record Not Found"}"#))
        .mount(&server)
        .await;

    let streams = common::strava(&server.uri())
        .get_activity_streams(&token(), "456")
        .await
        .unwrap();

    assert!(streams.is_empty());
}

// ============================================================================
// Webhooks
// ============================================================================

#[test]
fn test_activity_webhook_is_decoded() {
    let event = common::offline_strava()
        .handle_webhook(&json!({
            "aspect_type": "create",
            "event_time": 1_716_000_000,
            "object_id": 12345,
            "object_type": "activity",
            "owner_id": 67890,
            "subscription_id": 1,
            "updates": {}
        }))
        .unwrap();

    assert_eq!(event.action, WebhookAction::Create);
    assert_eq!(event.provider_activity_id, "12345");
    assert_eq!(event.provider_user_id, "67890");
    assert_eq!(event.event_time, Some(Utc.timestamp_opt(1_716_000_000, 0).unwrap()));
}

#[test]
fn test_athlete_webhook_is_ignored() {
    let connector = common::offline_strava();
    assert!(connector
        .handle_webhook(&json!({
            "aspect_type": "update",
            "object_id": 67890,
            "object_type": "athlete",
            "owner_id": 67890,
            "updates": {"authorized": "false"}
        }))
        .is_none());
    assert!(connector
        .handle_webhook(&json!({"object_type": "activity", "aspect_type": "archive", "object_id": 1, "owner_id": 2}))
        .is_none());
    assert!(connector.handle_webhook(&json!({})).is_none());
}
