// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Minimal Elasticsearch REST client covering the calls a rollup needs.

use std::future::Future;

use anyhow::{Context as _, bail};
use jiff::Timestamp;
use metricize_core::MetricDoc;
use metricize_writer::{BulkTransport, TransportError};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Connection settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the cluster, e.g. `https://localhost:9200`.
    pub url: String,
    /// Value for the `ApiKey` authorization scheme.
    pub api_key: Option<String>,
    /// Accept any TLS certificate.
    pub insecure: bool,
}

/// Elasticsearch client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base: String,
}

/// Point-in-time reference sent with paged searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointInTime {
    /// The PIT id, refreshed from every search response.
    pub id: String,
    /// How long the PIT stays open after each request.
    pub keep_alive: String,
}

/// Body of a paged `_search` request.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    /// Page size.
    pub size: usize,
    /// The query DSL.
    pub query: Value,
    /// Point in time searched.
    pub pit: PointInTime,
    /// Sort values of the last hit of the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_after: Option<Vec<Value>>,
    /// Sort clause.
    pub sort: Value,
}

/// One page of a `_search` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    /// Updated PIT id, if the cluster returned one.
    #[serde(default)]
    pub pit_id: Option<String>,
    /// Matching documents.
    pub hits: Hits,
}

/// The `hits` section of a search response.
#[derive(Debug, Clone, Deserialize)]
pub struct Hits {
    /// Documents on this page.
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// One search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    /// The source document.
    #[serde(rename = "_source")]
    pub source: MetricDoc,
    /// Sort values used to continue after this hit.
    #[serde(default)]
    pub sort: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct MinTimestampResponse {
    hits: TotalHits,
    aggregations: Option<MinTimestampAggregations>,
}

#[derive(Debug, Deserialize)]
struct TotalHits {
    total: Total,
}

#[derive(Debug, Deserialize)]
struct Total {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct MinTimestampAggregations {
    start: MinValue,
}

#[derive(Debug, Deserialize)]
struct MinValue {
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OpenPitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    errors: bool,
    #[serde(default)]
    items: Value,
}

impl Client {
    /// Build a client for `config`.
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let mut value = HeaderValue::from_str(&format!("ApiKey {api_key}"))
                .context("API key is not a valid header value")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .context("while building HTTP client")?;
        Ok(Self {
            http,
            base: config.url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    /// Earliest `@timestamp` in `index`.
    ///
    /// Fails when the index holds no documents.
    pub async fn min_timestamp(&self, index: &str) -> anyhow::Result<Timestamp> {
        let query = json!({
            "size": 0,
            "aggs": { "start": { "min": { "field": "@timestamp" } } }
        });
        let response = self
            .http
            .post(self.url(&format!("{index}/_search")))
            .query(&[("track_total_hits", "true")])
            .json(&query)
            .send()
            .await
            .context("while querying the earliest timestamp")?;
        let result: MinTimestampResponse = checked(response, "earliest timestamp query")
            .await?
            .json()
            .await
            .context("while decoding the earliest timestamp")?;

        if result.hits.total.value == 0 {
            bail!("no metrics found in {index:?}");
        }
        let millis = result
            .aggregations
            .and_then(|aggregations| aggregations.start.value)
            .with_context(|| format!("no earliest timestamp reported for {index:?}"))?;
        Timestamp::from_millisecond(millis as i64).context("earliest timestamp out of range")
    }

    /// Open a point in time over `index`.
    pub async fn open_point_in_time(
        &self,
        index: &str,
        keep_alive: &str,
    ) -> anyhow::Result<PointInTime> {
        let response = self
            .http
            .post(self.url(&format!("{index}/_pit")))
            .query(&[("keep_alive", keep_alive)])
            .send()
            .await
            .context("while creating PIT")?;
        let pit: OpenPitResponse = checked(response, "creating PIT")
            .await?
            .json()
            .await
            .context("while parsing PIT response")?;
        Ok(PointInTime {
            id: pit.id,
            keep_alive: keep_alive.to_owned(),
        })
    }

    /// Release a point in time.
    pub async fn close_point_in_time(&self, id: &str) -> anyhow::Result<()> {
        let response = self
            .http
            .delete(self.url("_pit"))
            .json(&json!({ "id": id }))
            .send()
            .await
            .context("while closing PIT")?;
        checked(response, "closing PIT").await?;
        Ok(())
    }

    /// Run one page of a point-in-time search.
    pub async fn search(&self, request: &SearchRequest) -> anyhow::Result<SearchResponse> {
        let response = self
            .http
            .post(self.url("_search"))
            .json(request)
            .send()
            .await
            .context("while searching with pagination query")?;
        checked(response, "pagination query")
            .await?
            .json()
            .await
            .context("while decoding pagination query")
    }

    /// Returns true if the data stream `name` exists.
    pub async fn data_stream_exists(&self, name: &str) -> anyhow::Result<bool> {
        let response = self
            .http
            .get(self.url(&format!("_data_stream/{name}")))
            .send()
            .await
            .context("while looking up data stream")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        checked(response, "looking up data stream").await?;
        Ok(true)
    }

    /// Create the data stream `name`, which must match an index template.
    pub async fn create_data_stream(&self, name: &str) -> anyhow::Result<()> {
        let response = self
            .http
            .put(self.url(&format!("_data_stream/{name}")))
            .send()
            .await
            .context("while creating data stream")?;
        checked(response, "creating data stream").await?;
        Ok(())
    }

    /// Create the data stream `name` unless it already exists.
    pub async fn ensure_data_stream(&self, name: &str) -> anyhow::Result<()> {
        if self.data_stream_exists(name).await? {
            tracing::debug!(data_stream = name, "data stream exists");
            return Ok(());
        }
        self.create_data_stream(name).await?;
        tracing::info!(data_stream = name, "created data stream");
        Ok(())
    }

    /// Send an NDJSON bulk body to `index`.
    ///
    /// A response with `errors: true` is an error carrying the per-item results.
    pub async fn bulk(&self, index: &str, body: Vec<u8>) -> anyhow::Result<()> {
        let response = self
            .http
            .post(self.url(&format!("{index}/_bulk")))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .context("while sending bulk request")?;
        let result: BulkResponse = checked(response, "bulk indexing")
            .await?
            .json()
            .await
            .context("while decoding bulk response")?;
        if result.errors {
            bail!("bulk indexing failed with: {}", result.items);
        }
        Ok(())
    }
}

impl BulkTransport for Client {
    fn send(
        &self,
        index: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        async move { self.bulk(index, body).await.map_err(Into::into) }
    }
}

async fn checked(response: Response, operation: &str) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("{operation} failed with {status}: {body}")
}
