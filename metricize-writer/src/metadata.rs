// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::time::Duration;

use metricize_core::MetricDoc;

/// `metricset.name` of rolled-up documents.
pub const ROLLUP_METRICSET: &str = "transaction_rollup";

/// `observer.version` stamped on rolled-up documents.
pub const OBSERVER_VERSION: &str = "8.5.2";

/// Prefix of the data stream rolled-up documents are written to.
pub const DATA_STREAM_PREFIX: &str = "metrics-apm.internal-rollup";

/// Fields that mark a document as a rollup over `period`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollupMetadata {
    /// Written to `metricset.name`.
    pub metricset_name: String,
    /// Length of the rollup window, written to `numeric_labels.period` in whole seconds.
    pub period: Duration,
    /// Written to `observer.version`.
    pub observer_version: String,
}

impl RollupMetadata {
    /// Metadata for a rollup over `period` with the standard metricset name and observer version.
    pub fn new(period: Duration) -> Self {
        Self {
            metricset_name: ROLLUP_METRICSET.to_owned(),
            period,
            observer_version: OBSERVER_VERSION.to_owned(),
        }
    }

    /// Overwrite the rollup fields of `doc`.
    pub fn stamp(&self, doc: &mut MetricDoc) {
        doc.metricset.name.clone_from(&self.metricset_name);
        doc.numeric_labels.period = Some(i64::try_from(self.period.as_secs()).unwrap_or(i64::MAX));
        doc.observer.version = Some(self.observer_version.clone());
    }

    /// The data stream for this period, e.g. `metrics-apm.internal-rollup10m0s`.
    pub fn data_stream(&self) -> String {
        format!("{DATA_STREAM_PREFIX}{}", PeriodLabel(self.period))
    }
}

/// Renders a period the way existing rollup data streams are named, e.g.
/// `10m0s` or `1h30m0s`. Fractions of a second are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodLabel(pub Duration);

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        let (hours, minutes, seconds) = (secs / 3600, secs % 3600 / 60, secs % 60);
        if hours > 0 {
            write!(f, "{hours}h{minutes}m{seconds}s")
        } else if minutes > 0 {
            write!(f, "{minutes}m{seconds}s")
        } else {
            write!(f, "{seconds}s")
        }
    }
}
