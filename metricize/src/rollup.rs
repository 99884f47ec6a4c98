// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Drives a rollup from the source index into the rollup data stream.

use std::time::Duration;

use jiff::Timestamp;
use metricize_core::AggregatorConfig;
use metricize_writer::{BulkWriter, DEFAULT_BULK_LIMIT, RollupMetadata};

use crate::elasticsearch::Client;
use crate::source::{self, SourceOptions};
use crate::window;

/// Everything a rollup run needs besides the client.
#[derive(Debug, Clone)]
pub struct RollupOptions {
    /// Where and how raw documents are read.
    pub source: SourceOptions,
    /// Window length.
    pub interval: Duration,
    /// First instant to roll up, aligned down to `interval`. Defaults to the
    /// earliest document in the source index.
    pub start: Option<Timestamp>,
    /// No window starts at or after this instant.
    pub end: Timestamp,
    /// Bulk body size at which a request is sent.
    pub bulk_limit: usize,
    /// Histogram settings for every window.
    pub aggregator: AggregatorConfig,
}

impl RollupOptions {
    /// Options for rolling `index` up into `interval` windows until `end`.
    pub fn new(index: impl Into<String>, interval: Duration, end: Timestamp) -> Self {
        Self {
            source: SourceOptions::new(index),
            interval,
            start: None,
            end,
            bulk_limit: DEFAULT_BULK_LIMIT,
            aggregator: AggregatorConfig::default(),
        }
    }
}

/// Outcome of a rollup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollupSummary {
    /// The data stream written to.
    pub data_stream: String,
    /// Windows processed.
    pub windows: usize,
    /// Rolled-up documents indexed.
    pub documents: usize,
}

/// Roll up every window from the start until `options.end`.
pub async fn run(client: &Client, options: &RollupOptions) -> anyhow::Result<RollupSummary> {
    let metadata = RollupMetadata::new(options.interval);
    let data_stream = metadata.data_stream();
    client.ensure_data_stream(&data_stream).await?;

    let start = match options.start {
        Some(start) => start,
        None => client.min_timestamp(&options.source.index).await?,
    };

    let mut writer =
        BulkWriter::new(client.clone(), data_stream.clone(), metadata).with_limit(options.bulk_limit);
    let mut summary = RollupSummary {
        data_stream,
        ..RollupSummary::default()
    };

    for window in window::windows(start, options.end, options.interval) {
        tracing::info!(start = %window.start, "rolling up");
        let aggregator =
            source::rollup_window(client, &window, &options.source, &options.aggregator).await?;
        summary.documents += writer.write_all(aggregator.into_documents()).await?;
        summary.windows += 1;
    }

    Ok(summary)
}
