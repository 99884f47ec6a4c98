//! Thread-safe ingestion into [`Aggregator`]s.
//!
//! [`Aggregator`] itself takes `&mut self`. When several producers feed one
//! rollup window, either share a single aggregator behind a mutex with
//! [`MutexAggregator`], or spread keys across independently locked partitions
//! with [`PartitionedAggregator`] and merge them once ingestion is done.

use std::hash::{BuildHasher, RandomState};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use jiff::Timestamp;

use crate::aggregator::Aggregator;
use crate::config::AggregatorConfig;
use crate::document::MetricDoc;
use crate::error::{ConfigError, IngestError};
use crate::key::AggregationKey;

/// An [`Aggregator`] shared between threads behind a mutex.
///
/// # Example
/// ```
/// use jiff::Timestamp;
/// use metricize_core::{Aggregator, MetricDoc};
/// use metricize_core::sink::MutexAggregator;
///
/// let sink = MutexAggregator::new(Aggregator::new(Timestamp::UNIX_EPOCH));
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let sink = sink.clone();
///         std::thread::spawn(move || sink.ingest(&MetricDoc::default()).unwrap())
///     })
///     .collect();
/// handles.into_iter().for_each(|h| h.join().unwrap());
/// assert_eq!(sink.try_unwrap().unwrap().len(), 1);
/// ```
#[derive(Debug)]
pub struct MutexAggregator {
    inner: Arc<Mutex<Aggregator>>,
}

impl Clone for MutexAggregator {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl MutexAggregator {
    /// Wraps `aggregator` for shared ingestion.
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(aggregator)),
        }
    }

    /// Ingests `doc`, see [`Aggregator::ingest`].
    pub fn ingest(&self, doc: &MetricDoc) -> Result<(), IngestError> {
        self.inner.lock().unwrap().ingest(doc)
    }

    /// Emits every bucket currently held, without consuming them.
    pub fn snapshot(&self) -> Vec<MetricDoc> {
        self.inner.lock().unwrap().emit_all().collect()
    }

    /// Returns the aggregator if this is the last handle to it.
    pub fn try_unwrap(self) -> Result<Aggregator, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex.into_inner().unwrap()),
            Err(inner) => Err(Self { inner }),
        }
    }
}

/// Aggregates one window across several independently locked partitions.
///
/// Every key is routed to one partition by hash, so concurrent producers only
/// contend when their documents share a partition. Partitions hold disjoint
/// key sets and are combined by [`PartitionedAggregator::into_merged`].
pub struct PartitionedAggregator {
    hasher: RandomState,
    partitions: Box<[Mutex<Aggregator>]>,
}

impl PartitionedAggregator {
    /// Create `partitions` aggregators for the window starting at `start`.
    pub fn new(
        start: Timestamp,
        config: AggregatorConfig,
        partitions: NonZeroUsize,
    ) -> Result<Self, ConfigError> {
        let partitions = (0..partitions.get())
            .map(|_| Aggregator::with_config(start, config.clone()).map(Mutex::new))
            .collect::<Result<Box<[_]>, _>>()?;
        Ok(Self {
            hasher: RandomState::new(),
            partitions,
        })
    }

    /// Number of partitions.
    pub fn partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Ingests `doc` into the partition owning its key.
    pub fn ingest(&self, doc: &MetricDoc) -> Result<(), IngestError> {
        let hash = self.hasher.hash_one(AggregationKey::from_doc(doc));
        let index = (hash % self.partitions.len() as u64) as usize;
        self.partitions[index].lock().unwrap().ingest(doc)
    }

    /// Folds every partition into a single aggregator.
    pub fn into_merged(self) -> Aggregator {
        let mut partitions = self
            .partitions
            .into_vec()
            .into_iter()
            .map(|partition| partition.into_inner().unwrap());
        // `new` always creates at least one partition
        let mut merged = partitions.next().expect("at least one partition");
        for partition in partitions {
            merged
                .merge(partition)
                .expect("partitions share a window and config");
        }
        tracing::debug!(keys = merged.len(), "merged aggregator partitions");
        merged
    }
}

impl std::fmt::Debug for PartitionedAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionedAggregator")
            .field("partitions", &self.partitions.len())
            .finish()
    }
}
