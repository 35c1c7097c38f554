// ABOUTME: Tests for lazy, page-by-page activity streaming over a connector
// ABOUTME: Uses a scripted in-memory connector to verify paging, limits, and error propagation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use async_trait::async_trait;
use futures_util::StreamExt;
use pierre_connectors::connectors::{
    create_activity_stream, ActivityConnector, ActivityQuery, ActivityStreamExt,
    ConnectorCapabilities, StreamConfig, StreamMap,
};
use pierre_connectors::errors::{ConnectorError, ConnectorResult};
use pierre_connectors::models::{
    AccessToken, ActivityType, AuthorizationCallback, NormalizedActivity,
    NormalizedActivityBuilder, Provider, TokenGrant, TokenRefresh, WebhookEvent,
};
use serde_json::{json, Value};
use std::sync::Mutex;

/// Serves scripted pages and records the queries it was asked for
struct ScriptedConnector {
    pages: Vec<ConnectorResult<Vec<Value>>>,
    paginated: bool,
    queries: Mutex<Vec<ActivityQuery>>,
}

impl ScriptedConnector {
    fn new(pages: Vec<ConnectorResult<Vec<Value>>>, paginated: bool) -> Self {
        Self {
            pages,
            paginated,
            queries: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<ActivityQuery> {
        self.queries.lock().unwrap().clone()
    }
}

fn page(ids: &[&str]) -> ConnectorResult<Vec<Value>> {
    Ok(ids.iter().map(|id| json!({"id": id})).collect())
}

#[async_trait]
impl ActivityConnector for ScriptedConnector {
    fn provider(&self) -> Provider {
        Provider::Strava
    }

    fn capabilities(&self) -> ConnectorCapabilities {
        if self.paginated {
            ConnectorCapabilities::OFFSET_PAGINATION
        } else {
            ConnectorCapabilities::empty()
        }
    }

    async fn get_authorization_url(&self, _state: &str, _redirect_uri: &str) -> ConnectorResult<String> {
        Ok(String::new())
    }

    async fn exchange_code(&self, _callback: &AuthorizationCallback) -> ConnectorResult<TokenGrant> {
        Err(ConnectorError::Configuration("not scripted".to_owned()))
    }

    async fn refresh_access_token(&self, _refresh_token: &str) -> ConnectorResult<Option<TokenRefresh>> {
        Ok(None)
    }

    async fn get_activities(&self, _token: &AccessToken, query: &ActivityQuery) -> ConnectorResult<Vec<Value>> {
        self.queries.lock().unwrap().push(*query);
        let index = usize::try_from(query.page).unwrap() - 1;
        match self.pages.get(index) {
            Some(Ok(items)) => Ok(items.clone()),
            Some(Err(_)) => Err(ConnectorError::TransientNetwork {
                provider: Provider::Strava,
                reason: "connection reset".to_owned(),
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn get_activity_detail(&self, _token: &AccessToken, _activity_id: &str) -> ConnectorResult<Value> {
        Ok(Value::Null)
    }

    async fn get_activity_streams(&self, _token: &AccessToken, _activity_id: &str) -> ConnectorResult<StreamMap> {
        Ok(StreamMap::new())
    }

    fn normalize_activity(&self, raw: &Value) -> NormalizedActivity {
        NormalizedActivityBuilder::new(
            Provider::Strava,
            raw.get("id").and_then(Value::as_str).unwrap_or_default(),
            "Scripted",
            ActivityType::Run,
            chrono::DateTime::UNIX_EPOCH,
            raw.clone(),
        )
        .build()
    }

    fn handle_webhook(&self, _payload: &Value) -> Option<WebhookEvent> {
        None
    }
}

async fn collect(
    connector: &ScriptedConnector,
    config: StreamConfig,
) -> Vec<ConnectorResult<NormalizedActivity>> {
    let token = AccessToken::bearer("t");
    create_activity_stream(connector, &token, ActivityQuery::default(), config)
        .collect()
        .await
}

fn ids(results: &[ConnectorResult<NormalizedActivity>]) -> Vec<String> {
    results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|a| a.provider_activity_id.clone())
        .collect()
}

#[tokio::test]
async fn test_pages_are_walked_until_an_empty_page() {
    let connector = ScriptedConnector::new(vec![page(&["a", "b"]), page(&["c"]), page(&["d"])], true);
    let results = collect(&connector, StreamConfig::with_page_size(2)).await;

    assert_eq!(ids(&results), ["a", "b", "c", "d"]);
    let calls = connector.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls.iter().map(|q| q.page).collect::<Vec<_>>(), [1, 2, 3, 4]);
    assert!(calls.iter().all(|q| q.per_page == 2));
}

#[tokio::test]
async fn test_unpaginated_connector_is_fetched_once() {
    let connector = ScriptedConnector::new(vec![page(&["a", "b"]), page(&["never"])], false);
    let results = collect(&connector, StreamConfig::default()).await;

    assert_eq!(ids(&results), ["a", "b"]);
    assert_eq!(connector.calls().len(), 1);
}

#[tokio::test]
async fn test_record_without_id_is_reported_and_skipped() {
    let connector = ScriptedConnector::new(vec![page(&["a", "", "c"])], true);
    let results = collect(&connector, StreamConfig::default()).await;

    assert_eq!(results.len(), 3);
    assert!(matches!(
        results[1],
        Err(ConnectorError::MalformedResponse { .. })
    ));
    assert_eq!(ids(&results), ["a", "c"]);
}

#[tokio::test]
async fn test_fetch_failure_ends_the_stream() {
    let connector = ScriptedConnector::new(
        vec![
            page(&["a"]),
            Err(ConnectorError::Configuration("scripted".to_owned())),
            page(&["unreachable"]),
        ],
        true,
    );
    let results = collect(&connector, StreamConfig::default()).await;

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].as_ref().unwrap_err().is_retryable());
    assert_eq!(connector.calls().len(), 2);
}

#[tokio::test]
async fn test_max_activities_stops_fetching() {
    let connector = ScriptedConnector::new(vec![page(&["a", "b"]), page(&["c", "d"]), page(&["e"])], true);
    let results = collect(&connector, StreamConfig::with_page_size(2).with_max_activities(3)).await;

    assert_eq!(ids(&results), ["a", "b", "c"]);
    assert_eq!(connector.calls().len(), 2);
}

#[tokio::test]
async fn test_limit_on_page_boundary_skips_next_fetch() {
    let connector = ScriptedConnector::new(vec![page(&["a", "b"]), page(&["c", "d"])], true);
    let results = collect(&connector, StreamConfig::with_page_size(2).with_max_activities(2)).await;

    assert_eq!(ids(&results), ["a", "b"]);
    assert_eq!(connector.calls().len(), 1);
}

#[tokio::test]
async fn test_extension_trait_streams_from_trait_objects() {
    let connector: Box<dyn ActivityConnector> =
        Box::new(ScriptedConnector::new(vec![page(&["x"])], true));
    let token = AccessToken::bearer("t");
    let results: Vec<_> = connector
        .activities_stream(&token, ActivityQuery::default(), StreamConfig::default())
        .collect()
        .await;
    assert_eq!(ids(&results), ["x"]);
}

#[test]
fn test_page_size_is_clamped() {
    assert_eq!(StreamConfig::with_page_size(0).page_size, 1);
    assert_eq!(StreamConfig::with_page_size(10_000).page_size, 200);
}
