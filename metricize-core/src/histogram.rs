//! The merged duration histogram kept for every aggregation key.
//!
//! Recording uses log-linear bucketing from the `histogram` crate: small
//! values are kept exactly, larger values are rounded into buckets whose
//! width grows with magnitude so the relative error stays within the
//! configured number of significant figures. Each bucket is reported by its
//! inclusive upper bound, matching the right-closed semantics of
//! [`DurationHistogram`].
//!
//! Recording is commutative and merging two histograms with the same layout
//! is associative, so documents can be ingested in any order, or across
//! several aggregators that are merged afterwards.

use crate::config::{HistogramLayout, ZeroBuckets};
use crate::document::DurationHistogram;

/// A bounded-range, fixed-relative-precision frequency counter.
pub struct MergedHistogram {
    inner: histogram::Histogram,
    // bounds every bucket count, so capping it keeps buckets from wrapping
    total: u64,
}

impl MergedHistogram {
    pub(crate) fn new(layout: &HistogramLayout) -> Self {
        Self {
            inner: layout.new_histogram(),
            total: 0,
        }
    }

    /// Record `count` observations of `value`.
    ///
    /// Callers range-check `value` against the layout first. Counts saturate
    /// once the histogram holds `u64::MAX` observations in total.
    pub(crate) fn record_many(&mut self, value: u64, count: u64) {
        let headroom = u64::MAX - self.total;
        if count > headroom {
            tracing::warn!(value, count, headroom, "histogram count saturated");
        }
        let count = count.min(headroom);
        if count == 0 {
            return;
        }
        // in-range values always map to a bucket, the layout is sized to cover `max`
        match self.inner.add(value, count) {
            Ok(()) => self.total += count,
            Err(_) => {
                tracing::warn!(value, count, "dropped histogram value outside of bucket layout")
            }
        }
    }

    /// Adds every observation of `other` into `self`.
    ///
    /// Both histograms must share a layout, which is guaranteed within one
    /// aggregator and checked by [`Aggregator::merge`](crate::Aggregator::merge).
    pub(crate) fn merge_from(&mut self, other: &MergedHistogram) {
        for bucket in other.inner.iter().filter(|bucket| bucket.count() > 0) {
            self.record_many(*bucket.range().end(), bucket.count());
        }
    }

    /// Total number of recorded observations.
    pub fn total_count(&self) -> u64 {
        self.total
    }

    /// Materializes the bucket distribution as `(upper bound, count)` pairs in
    /// ascending order.
    pub fn distribution(&self, zero_buckets: ZeroBuckets) -> DurationHistogram {
        let buckets = self
            .inner
            .iter()
            .map(|bucket| (*bucket.range().end(), bucket.count()));
        match zero_buckets {
            ZeroBuckets::Omit => {
                DurationHistogram::from_pairs(buckets.filter(|(_, count)| *count > 0))
            }
            ZeroBuckets::Include => {
                let mut dense: Vec<(u64, u64)> = buckets.collect();
                let populated = dense
                    .iter()
                    .rposition(|(_, count)| *count > 0)
                    .map_or(0, |last| last + 1);
                dense.truncate(populated);
                DurationHistogram::from_pairs(dense)
            }
        }
    }
}

impl std::fmt::Debug for MergedHistogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergedHistogram")
            .field("total_count", &self.total_count())
            .finish()
    }
}
