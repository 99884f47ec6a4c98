//! Error types for ingestion and emission.

use std::fmt;

/// A histogram value fell outside the configured duration bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeError {
    /// The offending value, in microseconds.
    pub value: u64,
    /// Lowest accepted value, in microseconds.
    pub min: u64,
    /// Highest accepted value, in microseconds.
    pub max: u64,
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "histogram value {} is out of range [{}, {}]",
            self.value, self.min, self.max
        )
    }
}

impl std::error::Error for RangeError {}

/// A [`DurationHistogram`](crate::DurationHistogram) whose sequences have different lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeError {
    /// Length of `values`.
    pub values: usize,
    /// Length of `counts`.
    pub counts: usize,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "histogram has {} values but {} counts",
            self.values, self.counts
        )
    }
}

impl std::error::Error for ShapeError {}

/// The error cases for an [`Aggregator::ingest`](crate::Aggregator::ingest) call.
///
/// A failed ingest leaves the aggregator unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestError {
    /// A value was outside the configured bounds.
    Range(RangeError),
    /// `values` and `counts` disagree in length.
    Shape(ShapeError),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range(err) => fmt::Display::fmt(err, f),
            Self::Shape(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Range(err) => Some(err),
            Self::Shape(err) => Some(err),
        }
    }
}

impl From<RangeError> for IngestError {
    fn from(value: RangeError) -> Self {
        Self::Range(value)
    }
}

impl From<ShapeError> for IngestError {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

/// [`Aggregator::emit`](crate::Aggregator::emit) was called with a key that was never ingested.
///
/// This is a programming error on the caller's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownKeyError;

impl fmt::Display for UnknownKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("aggregation key not found")
    }
}

impl std::error::Error for UnknownKeyError {}

/// An [`AggregatorConfig`](crate::AggregatorConfig) that cannot be turned into a histogram layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid aggregator config: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Two aggregators could not be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeError {
    /// The aggregators cover different rollup windows.
    WindowMismatch,
    /// The aggregators use different histogram configurations.
    ConfigMismatch,
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WindowMismatch => f.write_str("cannot merge aggregators for different windows"),
            Self::ConfigMismatch => {
                f.write_str("cannot merge aggregators with different histogram configs")
            }
        }
    }
}

impl std::error::Error for MergeError {}
