// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Reads the transaction metrics of one window and feeds them to an [`Aggregator`].

use anyhow::Context as _;
use metricize_core::{Aggregator, AggregatorConfig};
use serde_json::json;

use crate::elasticsearch::{Client, PointInTime, SearchRequest};
use crate::window::Window;

/// Default number of hits per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default point-in-time keep-alive.
pub const DEFAULT_KEEP_ALIVE: &str = "5m";

/// How source documents are paged out of the cluster.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Index pattern holding the raw transaction metrics.
    pub index: String,
    /// Hits per page.
    pub page_size: usize,
    /// Point-in-time keep-alive, in Elasticsearch time units.
    pub keep_alive: String,
}

impl SourceOptions {
    /// Options for `index` with the default page size and keep-alive.
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            page_size: DEFAULT_PAGE_SIZE,
            keep_alive: DEFAULT_KEEP_ALIVE.to_owned(),
        }
    }
}

/// Builds the first page request for `window`. The window bounds are epoch milliseconds.
pub fn window_query(window: &Window, pit: PointInTime, page_size: usize) -> SearchRequest {
    SearchRequest {
        size: page_size,
        query: json!({
            "bool": {
                "filter": [
                    {
                        "range": {
                            "@timestamp": {
                                "gte": window.start.as_millisecond(),
                                "lt": window.end.as_millisecond(),
                            }
                        }
                    },
                    { "term": { "metricset.name": "transaction" } }
                ]
            }
        }),
        pit,
        search_after: None,
        sort: json!([{ "@timestamp": { "order": "asc" } }]),
    }
}

/// Aggregates every transaction metric document in `window`.
///
/// The point in time opened for the scan is always closed afterwards. A
/// failure to close it is logged and otherwise ignored.
pub async fn rollup_window(
    client: &Client,
    window: &Window,
    options: &SourceOptions,
    config: &AggregatorConfig,
) -> anyhow::Result<Aggregator> {
    let pit = client
        .open_point_in_time(&options.index, &options.keep_alive)
        .await?;
    let pit_id = pit.id.clone();

    let result = scan(client, window, pit, options, config).await;

    if let Err(err) = client.close_point_in_time(&pit_id).await {
        tracing::warn!(?err, "failed to close PIT");
    }
    result
}

async fn scan(
    client: &Client,
    window: &Window,
    pit: PointInTime,
    options: &SourceOptions,
    config: &AggregatorConfig,
) -> anyhow::Result<Aggregator> {
    let mut aggregator = Aggregator::with_config(window.start, config.clone())?;
    let mut request = window_query(window, pit, options.page_size);
    let mut pages = 0usize;

    loop {
        let page = client.search(&request).await?;
        if page.hits.hits.is_empty() {
            break;
        }
        pages += 1;

        let mut last_sort = None;
        for hit in page.hits.hits {
            aggregator.ingest(&hit.source).with_context(|| {
                format!(
                    "while aggregating {:?} at {}",
                    hit.source.transaction.name, hit.source.timestamp
                )
            })?;
            last_sort = Some(hit.sort);
        }

        request.search_after = last_sort;
        if let Some(pit_id) = page.pit_id {
            request.pit.id = pit_id;
        }
    }

    tracing::debug!(%window, pages, keys = aggregator.len(), "scanned window");
    Ok(aggregator)
}
