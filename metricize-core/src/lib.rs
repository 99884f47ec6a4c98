#![deny(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod aggregator;
pub mod config;
pub mod document;
pub mod error;
pub mod histogram;
pub mod key;
pub mod sink;

pub use aggregator::{Aggregator, BucketState};
pub use config::{AggregatorConfig, ZeroBuckets};
pub use document::{DurationHistogram, MetricDoc};
pub use error::{ConfigError, IngestError, MergeError, RangeError, ShapeError, UnknownKeyError};
pub use histogram::MergedHistogram;
pub use key::{AggregationKey, OwnedAggregationKey};
