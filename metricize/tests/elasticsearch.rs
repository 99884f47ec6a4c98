// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use assert2::check;
use httpmock::prelude::*;
use jiff::Timestamp;
use metricize::elasticsearch::{Client, ClientConfig};
use metricize::rollup::{self, RollupOptions};
use metricize::source::{self, SourceOptions};
use metricize::window::Window;
use metricize_core::AggregatorConfig;
use serde_json::{Value, json};

const INDEX: &str = "metrics-apm-test";
const ROLLUP_STREAM: &str = "metrics-apm.internal-rollup10m0s";

fn client(server: &MockServer) -> Client {
    Client::new(&ClientConfig {
        url: server.base_url(),
        api_key: Some("secret".into()),
        insecure: false,
    })
    .unwrap()
}

fn ts(value: &str) -> Timestamp {
    value.parse().unwrap()
}

fn hit(value: u64, sort: i64) -> Value {
    json!({
        "_index": ".ds-metrics-apm.internal-default-2022.12.07-000001",
        "_source": {
            "@timestamp": "2022-12-07T03:15:00.000Z",
            "_doc_count": 1,
            "metricset": { "name": "transaction" },
            "service": {
                "name": "elastic-co-frontend",
                "language": { "name": "javascript" }
            },
            "transaction": {
                "root": true,
                "name": "POST /event",
                "type": "http-request",
                "duration.histogram": { "counts": [1], "values": [value] }
            }
        },
        "sort": [sort, 0]
    })
}

#[tokio::test]
async fn min_timestamp_reads_min_aggregation() {
    let server = MockServer::start_async().await;
    let search = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/{INDEX}/_search"))
                .query_param("track_total_hits", "true")
                .header("authorization", "ApiKey secret")
                .body_contains(r#""min":{"field":"@timestamp"}"#);
            then.status(200).json_body(json!({
                "hits": { "total": { "value": 3, "relation": "eq" }, "hits": [] },
                "aggregations": {
                    "start": { "value": 1670382942000.0, "value_as_string": "2022-12-07T03:15:42.000Z" }
                }
            }));
        })
        .await;

    let start = client(&server).min_timestamp(INDEX).await.unwrap();
    check!(start == ts("2022-12-07T03:15:42Z"));
    search.assert_async().await;
}

#[tokio::test]
async fn min_timestamp_fails_on_empty_index() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/{INDEX}/_search"));
            then.status(200).json_body(json!({
                "hits": { "total": { "value": 0, "relation": "eq" }, "hits": [] },
                "aggregations": { "start": { "value": null } }
            }));
        })
        .await;

    let err = client(&server).min_timestamp(INDEX).await.unwrap_err();
    check!(err.to_string() == format!("no metrics found in {INDEX:?}"));
}

#[tokio::test]
async fn missing_data_stream_is_created() {
    let server = MockServer::start_async().await;
    let lookup = server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/_data_stream/{ROLLUP_STREAM}"));
            then.status(404).json_body(json!({ "error": { "type": "index_not_found_exception" } }));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(PUT).path(format!("/_data_stream/{ROLLUP_STREAM}"));
            then.status(200).json_body(json!({ "acknowledged": true }));
        })
        .await;

    client(&server).ensure_data_stream(ROLLUP_STREAM).await.unwrap();
    lookup.assert_async().await;
    create.assert_async().await;
}

#[tokio::test]
async fn existing_data_stream_is_left_alone() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/_data_stream/{ROLLUP_STREAM}"));
            then.status(200).json_body(json!({ "data_streams": [{ "name": ROLLUP_STREAM }] }));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(PUT).path(format!("/_data_stream/{ROLLUP_STREAM}"));
            then.status(200).json_body(json!({ "acknowledged": true }));
        })
        .await;

    client(&server).ensure_data_stream(ROLLUP_STREAM).await.unwrap();
    create.assert_hits_async(0).await;
}

#[tokio::test]
async fn data_stream_lookup_errors_are_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/_data_stream/{ROLLUP_STREAM}"));
            then.status(403).body("forbidden");
        })
        .await;

    let err = client(&server)
        .ensure_data_stream(ROLLUP_STREAM)
        .await
        .unwrap_err();
    check!(err.to_string().contains("403"));
}

#[tokio::test]
async fn bulk_item_errors_fail_the_request() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/{ROLLUP_STREAM}/_bulk"))
                .header("content-type", "application/x-ndjson");
            then.status(200).json_body(json!({
                "errors": true,
                "items": [{ "create": { "status": 400, "error": { "type": "mapper_parsing_exception" } } }]
            }));
        })
        .await;

    let err = client(&server)
        .bulk(ROLLUP_STREAM, b"{\"create\":{}}\n{}\n".to_vec())
        .await
        .unwrap_err();
    check!(err.to_string().starts_with("bulk indexing failed with: "));
    check!(err.to_string().contains("mapper_parsing_exception"));
}

#[tokio::test]
async fn window_is_paged_with_search_after_and_pit_is_closed() {
    let server = MockServer::start_async().await;
    let open = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/{INDEX}/_pit"))
                .query_param("keep_alive", "5m");
            then.status(200).json_body(json!({ "id": "pit-1" }));
        })
        .await;
    let first_page = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/_search")
                .body_contains(r#""id":"pit-1""#)
                .body_contains(r#""gte":1670382600000"#);
            then.status(200).json_body(json!({
                "pit_id": "pit-2",
                "hits": { "hits": [hit(3, 1670382900000), hit(3, 1670382960000)] }
            }));
        })
        .await;
    let last_page = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/_search")
                .body_contains(r#""id":"pit-2""#)
                .body_contains(r#""search_after":[1670382960000,0]"#);
            then.status(200)
                .json_body(json!({ "pit_id": "pit-2", "hits": { "hits": [] } }));
        })
        .await;
    let close = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/_pit").body_contains(r#""id":"pit-1""#);
            then.status(200).json_body(json!({ "succeeded": true, "num_freed": 1 }));
        })
        .await;

    let window = Window {
        start: ts("2022-12-07T03:10:00Z"),
        end: ts("2022-12-07T03:20:00Z"),
    };
    let aggregator = source::rollup_window(
        &client(&server),
        &window,
        &SourceOptions::new(INDEX),
        &AggregatorConfig::default(),
    )
    .await
    .unwrap();

    check!(aggregator.len() == 1);
    let doc = aggregator.emit_all().next().unwrap();
    check!(doc.timestamp == window.start);
    check!(doc.transaction.duration_histogram.pairs().collect::<Vec<_>>() == [(3, 2)]);

    open.assert_async().await;
    first_page.assert_async().await;
    last_page.assert_async().await;
    close.assert_async().await;
}

#[tokio::test]
async fn failed_ingest_aborts_but_closes_pit() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/{INDEX}/_pit"));
            then.status(200).json_body(json!({ "id": "pit-1" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/_search");
            then.status(200).json_body(json!({
                "pit_id": "pit-1",
                "hits": { "hits": [hit(3_600_000_001, 1670382900000)] }
            }));
        })
        .await;
    let close = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/_pit");
            then.status(200).json_body(json!({ "succeeded": true }));
        })
        .await;

    let window = Window {
        start: ts("2022-12-07T03:10:00Z"),
        end: ts("2022-12-07T03:20:00Z"),
    };
    let err = source::rollup_window(
        &client(&server),
        &window,
        &SourceOptions::new(INDEX),
        &AggregatorConfig::default(),
    )
    .await
    .unwrap_err();

    check!(err.to_string().starts_with("while aggregating \"POST /event\""));
    check!(format!("{err:#}").contains("out of range"));
    close.assert_async().await;
}

#[tokio::test]
async fn full_rollup_writes_stamped_documents() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/_data_stream/{ROLLUP_STREAM}"));
            then.status(404);
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(PUT).path(format!("/_data_stream/{ROLLUP_STREAM}"));
            then.status(200).json_body(json!({ "acknowledged": true }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/{INDEX}/_pit"));
            then.status(200).json_body(json!({ "id": "pit-1" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/_search").body_contains(r#""id":"pit-1""#);
            then.status(200).json_body(json!({
                "pit_id": "pit-2",
                "hits": { "hits": [hit(3, 1670382900000), hit(3, 1670382960000)] }
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/_search").body_contains(r#""id":"pit-2""#);
            then.status(200)
                .json_body(json!({ "pit_id": "pit-2", "hits": { "hits": [] } }));
        })
        .await;
    // closing the PIT may fail without failing the rollup
    let close = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/_pit");
            then.status(500).body("boom");
        })
        .await;
    let bulk = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/{ROLLUP_STREAM}/_bulk"))
                .body_contains(r#""@timestamp":"2022-12-07T03:10:00Z""#)
                .body_contains(r#""metricset":{"name":"transaction_rollup"}"#)
                .body_contains(r#""numeric_labels":{"period":600}"#)
                .body_contains(r#""observer":{"version":"8.5.2"}"#);
            then.status(200).json_body(json!({ "errors": false, "items": [] }));
        })
        .await;

    let mut options = RollupOptions::new(INDEX, Duration::from_secs(600), ts("2022-12-07T03:20:00Z"));
    options.start = Some(ts("2022-12-07T03:15:00Z"));
    let summary = rollup::run(&client(&server), &options).await.unwrap();

    check!(summary.data_stream == ROLLUP_STREAM);
    check!(summary.windows == 1);
    check!(summary.documents == 1);
    create.assert_async().await;
    close.assert_async().await;
    bulk.assert_async().await;
}
