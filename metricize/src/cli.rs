// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Command line arguments.

use std::time::Duration;

use clap::Parser;
use jiff::Timestamp;

use crate::elasticsearch::ClientConfig;
use crate::rollup::RollupOptions;
use crate::source::SourceOptions;
use crate::window::parse_interval;

/// Roll up APM transaction metrics into coarser time windows.
#[derive(Parser, Debug, Clone)]
#[command(name = "metricize", version)]
pub struct Args {
    /// Start time (RFC 3339). Defaults to the earliest document in the index.
    #[arg(long)]
    pub start: Option<Timestamp>,
    /// End time (RFC 3339). Defaults to now.
    #[arg(long)]
    pub end: Option<Timestamp>,
    /// Rollup interval, e.g. 10m or 1h.
    #[arg(short = 'i', long, default_value = "10m", value_parser = parse_interval)]
    pub interval: Duration,
    /// Index pattern holding the raw transaction metrics.
    #[arg(long, default_value = "metrics-apm*")]
    pub index: String,
    /// Skip TLS certificate verification.
    #[arg(short = 'k', long)]
    pub insecure: bool,
    /// Elasticsearch URL.
    #[arg(long, env = "ELASTICSEARCH_URL", default_value = "http://localhost:9200")]
    pub url: String,
    /// Elasticsearch API key.
    #[arg(long, env = "ELASTICSEARCH_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// Hits fetched per search page.
    #[arg(long, default_value_t = crate::source::DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
    /// Point-in-time keep-alive, in Elasticsearch time units.
    #[arg(long, default_value = crate::source::DEFAULT_KEEP_ALIVE)]
    pub keep_alive: String,
    /// Bulk request body size in bytes at which a request is sent.
    #[arg(long, default_value_t = metricize_writer::DEFAULT_BULK_LIMIT)]
    pub bulk_limit: usize,
}

impl Args {
    /// Connection settings.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            url: self.url.clone(),
            api_key: self.api_key.clone(),
            insecure: self.insecure,
        }
    }

    /// Rollup settings, resolving a missing end to `now`.
    pub fn rollup_options(&self, now: Timestamp) -> RollupOptions {
        RollupOptions {
            source: SourceOptions {
                index: self.index.clone(),
                page_size: self.page_size,
                keep_alive: self.keep_alive.clone(),
            },
            start: self.start,
            end: self.end.unwrap_or(now),
            bulk_limit: self.bulk_limit,
            ..RollupOptions::new(self.index.clone(), self.interval, now)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert2::check;
    use clap::Parser;
    use jiff::Timestamp;

    use super::Args;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["metricize"]).unwrap();
        check!(args.interval == Duration::from_secs(600));
        check!(args.index == "metrics-apm*");
        check!(!args.insecure);
        check!(args.page_size == 100);
        check!(args.keep_alive == "5m");
        check!(args.bulk_limit == 512 * 1024);

        let now: Timestamp = "2022-12-07T04:00:00Z".parse().unwrap();
        let options = args.rollup_options(now);
        check!(options.start.is_none());
        check!(options.end == now);
    }

    #[test]
    fn explicit_values() {
        let args = Args::try_parse_from([
            "metricize",
            "--start",
            "2022-12-07T03:00:00Z",
            "--end",
            "2022-12-07T04:00:00Z",
            "-i",
            "1h",
            "-k",
            "--index",
            "metrics-apm.internal-default",
            "--url",
            "https://es.example:9200",
            "--api-key",
            "secret",
        ])
        .unwrap();
        check!(args.interval == Duration::from_secs(3600));
        check!(args.insecure);

        let config = args.client_config();
        check!(config.url == "https://es.example:9200");
        check!(config.api_key.as_deref() == Some("secret"));

        let options = args.rollup_options(Timestamp::UNIX_EPOCH);
        check!(options.source.index == "metrics-apm.internal-default");
        check!(options.start == Some("2022-12-07T03:00:00Z".parse::<Timestamp>().unwrap()));
        check!(options.end == "2022-12-07T04:00:00Z".parse::<Timestamp>().unwrap());
    }

    #[test]
    fn rejects_bad_interval() {
        check!(Args::try_parse_from(["metricize", "-i", "0s"]).is_err());
    }
}
