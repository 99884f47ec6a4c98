//! The APM transaction metric document consumed and produced by the aggregator.
//!
//! Every field defaults when missing from the source, so partially populated
//! documents (e.g. from services that don't report cloud metadata) still
//! deserialize. Fields that are not part of this model, such as `labels`, are ignored.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::ShapeError;

/// A pre-aggregated duration histogram, in microseconds.
///
/// `counts[i]` observations were recorded at or below `values[i]` and above
/// `values[i - 1]`. A count of zero is a valid placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationHistogram {
    /// Number of observations in each bucket.
    #[serde(default)]
    pub counts: Vec<u64>,
    /// Upper bound of each bucket, ascending.
    #[serde(default)]
    pub values: Vec<u64>,
}

impl DurationHistogram {
    /// Builds a histogram from `(value, count)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u64, u64)>) -> Self {
        let (values, counts) = pairs.into_iter().unzip();
        Self { counts, values }
    }

    /// Checks that `values` and `counts` have the same length.
    pub fn validate(&self) -> Result<(), ShapeError> {
        if self.values.len() == self.counts.len() {
            Ok(())
        } else {
            Err(ShapeError {
                values: self.values.len(),
                counts: self.counts.len(),
            })
        }
    }

    /// Iterates `(value, count)` pairs in the order they were given.
    pub fn pairs(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.values.iter().copied().zip(self.counts.iter().copied())
    }

    /// Total number of observations.
    pub fn total_count(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Returns true if there are no buckets.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Agent {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct CloudAccount {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct CloudMachine {
    #[serde(rename = "type")]
    pub machine_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct CloudProject {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Cloud {
    pub provider: String,
    pub region: String,
    pub availability_zone: String,
    pub account: CloudAccount,
    pub machine: CloudMachine,
    pub project: CloudProject,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Container {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Os {
    pub platform: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Host {
    pub name: String,
    pub hostname: String,
    pub os: Os,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Event {
    pub outcome: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Pod {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Kubernetes {
    pub pod: Pod,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ServiceNode {
    pub name: String,
}

/// Name and version pair, shared by `service.language` and `service.runtime`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct NameVersion {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Service {
    pub environment: String,
    pub name: String,
    pub node: ServiceNode,
    pub language: NameVersion,
    pub runtime: NameVersion,
    pub version: String,
}

/// The `transaction` sub-record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transaction {
    /// Transaction name, e.g. `GET /`.
    pub name: String,
    /// Whether the transaction is a trace root.
    pub root: bool,
    /// Transaction result, e.g. `HTTP 2xx`.
    pub result: String,
    /// Transaction type, e.g. `request`.
    #[serde(rename = "type")]
    pub transaction_type: String,
    /// Pre-aggregated durations.
    #[serde(rename = "duration.histogram")]
    pub duration_histogram: DurationHistogram,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Metricset {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct NumericLabels {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Observer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// One APM transaction metric document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct MetricDoc {
    #[serde(rename = "@timestamp")]
    pub timestamp: Timestamp,
    #[serde(rename = "_doc_count")]
    pub doc_count: i64,
    pub agent: Agent,
    pub cloud: Cloud,
    pub container: Container,
    pub host: Host,
    pub event: Event,
    pub kubernetes: Kubernetes,
    pub service: Service,
    pub transaction: Transaction,
    pub metricset: Metricset,
    pub numeric_labels: NumericLabels,
    pub observer: Observer,
}

impl Default for MetricDoc {
    fn default() -> Self {
        Self {
            timestamp: Timestamp::UNIX_EPOCH,
            doc_count: 0,
            agent: Agent::default(),
            cloud: Cloud::default(),
            container: Container::default(),
            host: Host::default(),
            event: Event::default(),
            kubernetes: Kubernetes::default(),
            service: Service::default(),
            transaction: Transaction::default(),
            metricset: Metricset::default(),
            numeric_labels: NumericLabels::default(),
            observer: Observer::default(),
        }
    }
}
