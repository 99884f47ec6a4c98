//! Keyed aggregation of transaction metric documents for one rollup window.

use std::hash::BuildHasher;

use hashbrown::hash_map::{Entry, RawEntryMut};
use jiff::Timestamp;

use crate::config::{AggregatorConfig, HistogramLayout};
use crate::document::MetricDoc;
use crate::error::{ConfigError, IngestError, MergeError, UnknownKeyError};
use crate::histogram::MergedHistogram;
use crate::key::{AggregationKey, OwnedAggregationKey};

/// Running accumulator for one aggregation key.
#[derive(Debug)]
pub struct BucketState {
    earliest: Timestamp,
    latest: Timestamp,
    histogram: MergedHistogram,
}

impl BucketState {
    fn new(timestamp: Timestamp, layout: &HistogramLayout) -> Self {
        Self {
            earliest: timestamp,
            latest: timestamp,
            histogram: MergedHistogram::new(layout),
        }
    }

    fn observe(&mut self, timestamp: Timestamp) {
        self.earliest = self.earliest.min(timestamp);
        self.latest = self.latest.max(timestamp);
    }

    fn absorb(&mut self, other: &BucketState) {
        self.observe(other.earliest);
        self.observe(other.latest);
        self.histogram.merge_from(&other.histogram);
    }

    /// Earliest document timestamp seen for this key.
    pub fn earliest(&self) -> Timestamp {
        self.earliest
    }

    /// Latest document timestamp seen for this key.
    pub fn latest(&self) -> Timestamp {
        self.latest
    }

    /// The merged duration histogram.
    pub fn histogram(&self) -> &MergedHistogram {
        &self.histogram
    }
}

// Stored keys are `'static`, probes borrow from the document being ingested.
// Taking both at one shared lifetime lets the derived `PartialEq` compare them.
fn same_key<'k>(stored: &'k AggregationKey<'k>, probe: &'k AggregationKey<'k>) -> bool {
    stored == probe
}

/// Groups the documents of one rollup window by [`AggregationKey`] and
/// merges their duration histograms.
///
/// An `Aggregator` is created per window, mutated through [`Aggregator::ingest`]
/// and read through [`Aggregator::emit`] / [`Aggregator::emit_all`]. It does no
/// internal synchronization; see [`crate::sink`] for shared and partitioned
/// ingestion.
///
/// # Example
/// ```
/// use jiff::Timestamp;
/// use metricize_core::{AggregationKey, Aggregator, DurationHistogram, MetricDoc};
///
/// let start: Timestamp = "2022-12-07T03:10:00Z".parse().unwrap();
/// let mut doc = MetricDoc::default();
/// doc.transaction.name = "GET /".into();
/// doc.transaction.duration_histogram = DurationHistogram::from_pairs([(1, 1)]);
///
/// let mut aggregator = Aggregator::new(start);
/// aggregator.ingest(&doc).unwrap();
///
/// let rolled_up = aggregator.emit(&AggregationKey::from_doc(&doc)).unwrap();
/// assert_eq!(rolled_up.timestamp, start);
/// assert_eq!(rolled_up.transaction.duration_histogram.pairs().collect::<Vec<_>>(), [(1, 1)]);
/// ```
pub struct Aggregator {
    start: Timestamp,
    config: AggregatorConfig,
    layout: HistogramLayout,
    buckets: hashbrown::HashMap<OwnedAggregationKey, BucketState>,
}

impl Aggregator {
    /// Create an aggregator for the window starting at `start` with the
    /// default [`AggregatorConfig`].
    pub fn new(start: Timestamp) -> Self {
        Self::with_config(start, AggregatorConfig::default()).expect("known good")
    }

    /// Create an aggregator for the window starting at `start`.
    pub fn with_config(start: Timestamp, config: AggregatorConfig) -> Result<Self, ConfigError> {
        let layout = config.layout()?;
        Ok(Self {
            start,
            config,
            layout,
            buckets: Default::default(),
        })
    }

    /// Merge one document into the bucket for its key, creating the bucket if needed.
    ///
    /// The whole histogram is validated first: on error, nothing of the
    /// document has been applied.
    pub fn ingest(&mut self, doc: &MetricDoc) -> Result<(), IngestError> {
        let durations = &doc.transaction.duration_histogram;
        durations.validate()?;
        for value in &durations.values {
            self.layout.check(*value)?;
        }

        let bucket = Self::get_or_create_bucket(&mut self.buckets, &self.layout, doc);
        bucket.observe(doc.timestamp);
        for (value, count) in durations.pairs() {
            bucket.histogram.record_many(value, count);
        }
        Ok(())
    }

    fn get_or_create_bucket<'a>(
        buckets: &'a mut hashbrown::HashMap<OwnedAggregationKey, BucketState>,
        layout: &HistogramLayout,
        doc: &MetricDoc,
    ) -> &'a mut BucketState {
        let probe = AggregationKey::from_doc(doc);
        let hash = buckets.hasher().hash_one(&probe);

        match buckets
            .raw_entry_mut()
            .from_hash(hash, |stored| same_key(stored, &probe))
        {
            RawEntryMut::Occupied(occupied) => occupied.into_mut(),
            RawEntryMut::Vacant(vacant) => {
                tracing::trace!(transaction = %probe.transaction_name, "new aggregation bucket");
                let state = BucketState::new(doc.timestamp, layout);
                vacant
                    .insert_hashed_nocheck(hash, probe.into_owned(), state)
                    .1
            }
        }
    }

    /// Rebuild the rolled-up document for `key`.
    ///
    /// The document is stamped with the window start and carries the merged
    /// histogram. Emission does not modify the aggregator, so emitting the same
    /// key twice yields equal documents.
    pub fn emit(&self, key: &AggregationKey<'_>) -> Result<MetricDoc, UnknownKeyError> {
        let bucket = self.bucket(key).ok_or(UnknownKeyError)?;
        Ok(self.emit_bucket(key, bucket))
    }

    /// Emit a document for every key, in unspecified order.
    pub fn emit_all(&self) -> impl Iterator<Item = MetricDoc> + '_ {
        self.buckets
            .iter()
            .map(|(key, bucket)| self.emit_bucket(key, bucket))
    }

    /// Consume the aggregator, emitting a document for every key.
    pub fn into_documents(self) -> impl Iterator<Item = MetricDoc> {
        let Self {
            start,
            config,
            buckets,
            ..
        } = self;
        buckets.into_iter().map(move |(key, bucket)| {
            key.to_doc(start, bucket.histogram.distribution(config.zero_buckets))
        })
    }

    fn emit_bucket(&self, key: &AggregationKey<'_>, bucket: &BucketState) -> MetricDoc {
        key.to_doc(
            self.start,
            bucket.histogram.distribution(self.config.zero_buckets),
        )
    }

    /// The bucket state for `key`, if any document with that key was ingested.
    pub fn bucket(&self, key: &AggregationKey<'_>) -> Option<&BucketState> {
        let hash = self.buckets.hasher().hash_one(key);
        self.buckets
            .raw_entry()
            .from_hash(hash, |stored| same_key(stored, key))
            .map(|(_, bucket)| bucket)
    }

    /// Returns true if a bucket exists for `key`.
    pub fn contains_key(&self, key: &AggregationKey<'_>) -> bool {
        self.bucket(key).is_some()
    }

    /// All keys with a bucket, in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = &OwnedAggregationKey> {
        self.buckets.keys()
    }

    /// All buckets with their keys, in unspecified order.
    pub fn buckets(&self) -> impl Iterator<Item = (&OwnedAggregationKey, &BucketState)> {
        self.buckets.iter()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns true if nothing has been ingested.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Start of the rollup window.
    pub fn start(&self) -> Timestamp {
        self.start
    }

    /// The configuration this aggregator was built with.
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Fold `other` into `self`.
    ///
    /// Both aggregators must cover the same window with the same config.
    /// Histogram merging is associative and commutative, so partial
    /// aggregators built in parallel can be combined in any order.
    pub fn merge(&mut self, other: Aggregator) -> Result<(), MergeError> {
        if self.start != other.start {
            return Err(MergeError::WindowMismatch);
        }
        if self.config != other.config {
            return Err(MergeError::ConfigMismatch);
        }
        for (key, bucket) in other.buckets {
            match self.buckets.entry(key) {
                Entry::Occupied(mut occupied) => occupied.get_mut().absorb(&bucket),
                Entry::Vacant(vacant) => {
                    vacant.insert(bucket);
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("start", &self.start)
            .field("config", &self.config)
            .field("buckets", &self.buckets.len())
            .finish()
    }
}
