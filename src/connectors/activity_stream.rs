// ABOUTME: Streaming activity ingestion over a connector's paged listing
// ABOUTME: Fetches pages lazily and yields normalized activities one at a time
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Activity Streams
//!
//! Walks a connector's listing page by page and yields each record already
//! normalized, so a full history import never holds more than one page in
//! memory.
//!
//! - Paging stops at the first empty page. A short page does not end the
//!   walk, since providers cap the page size below the requested one.
//! - Connectors without `OFFSET_PAGINATION` are fetched once.
//! - A record without a provider id is yielded as `MalformedResponse` and the
//!   walk continues.
//! - A failed page fetch is yielded and ends the stream.
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use pierre_connectors::connectors::{ActivityConnector, ActivityQuery, ActivityStreamExt, StreamConfig};
//! use pierre_connectors::models::AccessToken;
//!
//! async fn import(connector: &dyn ActivityConnector, token: &AccessToken) {
//!     let mut stream = connector.activities_stream(token, ActivityQuery::default(), StreamConfig::default());
//!     while let Some(result) = stream.next().await {
//!         match result {
//!             Ok(activity) => println!("{} {}", activity.provider_activity_id, activity.name),
//!             Err(e) => eprintln!("skipped: {e}"),
//!         }
//!     }
//! }
//! ```

use super::core::{ActivityConnector, ActivityQuery};
use crate::errors::ConnectorError;
use crate::models::{AccessToken, NormalizedActivity};
use async_stream::stream;
use futures_util::Stream;
use std::pin::Pin;
use tracing::{debug, warn};

/// Default page size for activity streaming
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Smallest page size accepted
pub const MIN_PAGE_SIZE: u32 = 1;

/// Largest page size requested from any provider
pub const MAX_PAGE_SIZE: u32 = 200;

/// Paging behavior for an activity stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Activities requested per page
    pub page_size: u32,
    /// Stop after this many records (errors included)
    pub max_activities: Option<usize>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_activities: None,
        }
    }
}

impl StreamConfig {
    /// Configuration with the given page size, clamped to the accepted range
    #[must_use]
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            page_size: page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE),
            max_activities: None,
        }
    }

    /// Cap the number of records yielded
    #[must_use]
    pub const fn with_max_activities(mut self, max: usize) -> Self {
        self.max_activities = Some(max);
        self
    }
}

/// Stream of normalized activities
pub type ActivityStream<'a> =
    Pin<Box<dyn Stream<Item = Result<NormalizedActivity, ConnectorError>> + Send + 'a>>;

/// Lazily page through `connector`'s listing, starting at `query.page`
///
/// `query.per_page` is replaced by the configured page size; date filters are
/// passed through unchanged.
pub fn create_activity_stream<'a, C>(
    connector: &'a C,
    token: &'a AccessToken,
    query: ActivityQuery,
    config: StreamConfig,
) -> ActivityStream<'a>
where
    C: ActivityConnector + ?Sized,
{
    let page_size = config.page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
    let paginated = connector.capabilities().supports_pagination();
    let provider = connector.provider();

    Box::pin(stream! {
        let mut page = query.page.max(1);
        let mut yielded: usize = 0;

        'pages: loop {
            let request = ActivityQuery { per_page: page_size, ..query }.page(page);
            let records = match connector.get_activities(token, &request).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(provider = %provider, page, error = %e, "activity page fetch failed");
                    yield Err(e);
                    break;
                }
            };
            if records.is_empty() {
                break;
            }
            debug!(provider = %provider, page, count = records.len(), "streaming activity page");

            for raw in &records {
                if config.max_activities.is_some_and(|max| yielded >= max) {
                    break 'pages;
                }
                yielded += 1;
                let activity = connector.normalize_activity(raw);
                let keyed = activity.upsert_key().map(|_| ());
                match keyed {
                    Ok(()) => yield Ok(activity),
                    Err(e) => yield Err(e),
                }
            }

            let limit_reached = config.max_activities.is_some_and(|max| yielded >= max);
            if !paginated || limit_reached {
                break;
            }
            page += 1;
        }
    })
}

/// Extension trait for streaming a connector's activities
pub trait ActivityStreamExt {
    /// Stream every activity visible to `token`, one page at a time
    fn activities_stream<'a>(
        &'a self,
        token: &'a AccessToken,
        query: ActivityQuery,
        config: StreamConfig,
    ) -> ActivityStream<'a>;
}

impl<T: ActivityConnector + ?Sized> ActivityStreamExt for T {
    fn activities_stream<'a>(
        &'a self,
        token: &'a AccessToken,
        query: ActivityQuery,
        config: StreamConfig,
    ) -> ActivityStream<'a> {
        create_activity_stream(self, token, query, config)
    }
}
