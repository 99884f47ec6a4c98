// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use anyhow::Context as _;
use clap::Parser;
use jiff::Timestamp;
use metricize::cli::Args;
use metricize::elasticsearch::Client;
use metricize::rollup;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let client = Client::new(&args.client_config())?;
    let summary = rollup::run(&client, &args.rollup_options(Timestamp::now()))
        .await
        .context("rollup failed")?;
    tracing::info!(
        data_stream = %summary.data_stream,
        windows = summary.windows,
        documents = summary.documents,
        "rollup complete"
    );
    Ok(())
}
