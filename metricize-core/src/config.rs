//! Aggregator configuration and the histogram layout derived from it.

use std::time::Duration;

use crate::error::{ConfigError, RangeError};

/// Whether emitted histograms include empty buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZeroBuckets {
    /// Only buckets with at least one observation are emitted.
    #[default]
    Omit,
    /// Every bucket from zero up to the highest non-empty bucket is emitted,
    /// including those with a count of zero.
    Include,
}

/// Configuration for an [`Aggregator`](crate::Aggregator).
///
/// The defaults cover durations from zero to one hour at two significant
/// figures of relative precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Lowest accepted duration.
    pub min_duration: Duration,
    /// Highest accepted duration.
    pub max_duration: Duration,
    /// Decimal digits of relative precision preserved at any magnitude, `1..=5`.
    pub significant_figures: u8,
    /// How empty buckets are treated on emission.
    pub zero_buckets: ZeroBuckets,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            min_duration: Duration::ZERO,
            max_duration: Duration::from_secs(60 * 60),
            significant_figures: 2,
            zero_buckets: ZeroBuckets::Omit,
        }
    }
}

impl AggregatorConfig {
    /// Set the highest accepted duration.
    pub fn max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Set the lowest accepted duration.
    pub fn min_duration(mut self, min_duration: Duration) -> Self {
        self.min_duration = min_duration;
        self
    }

    /// Set the number of significant decimal figures.
    pub fn significant_figures(mut self, significant_figures: u8) -> Self {
        self.significant_figures = significant_figures;
        self
    }

    /// Set how empty buckets are emitted.
    pub fn zero_buckets(mut self, zero_buckets: ZeroBuckets) -> Self {
        self.zero_buckets = zero_buckets;
        self
    }

    pub(crate) fn layout(&self) -> Result<HistogramLayout, ConfigError> {
        if !(1..=5).contains(&self.significant_figures) {
            return Err(ConfigError::invalid(format!(
                "significant figures must be between 1 and 5, got {}",
                self.significant_figures
            )));
        }
        let min = micros(self.min_duration);
        let max = micros(self.max_duration);
        if max <= min {
            return Err(ConfigError::invalid(format!(
                "max duration {max}us must be greater than min duration {min}us"
            )));
        }

        let grouping_power = grouping_power(self.significant_figures);
        let max_value_power = bit_length(max).max(grouping_power + 2).min(64);
        let config = histogram::Config::new(grouping_power, max_value_power)
            .map_err(|err| ConfigError::invalid(format!("{err:?}")))?;

        Ok(HistogramLayout { config, min, max })
    }
}

/// The validated bucket layout shared by every bucket of one aggregator.
pub(crate) struct HistogramLayout {
    pub(crate) config: histogram::Config,
    pub(crate) min: u64,
    pub(crate) max: u64,
}

impl HistogramLayout {
    pub(crate) fn check(&self, value: u64) -> Result<(), RangeError> {
        if (self.min..=self.max).contains(&value) {
            Ok(())
        } else {
            Err(RangeError {
                value,
                min: self.min,
                max: self.max,
            })
        }
    }

    pub(crate) fn new_histogram(&self) -> histogram::Histogram {
        histogram::Histogram::with_config(&self.config)
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Values below `2^(g + 1)` are recorded exactly, and every further power of
/// two is split into `2^g` buckets. `g` is chosen so that `2 * 10^figures`
/// values get unit resolution, which bounds the relative error of every bucket
/// by `10^-figures`.
fn grouping_power(significant_figures: u8) -> u8 {
    let single_unit_resolution = 2 * 10u64.pow(u32::from(significant_figures));
    bit_length(single_unit_resolution - 1) - 1
}

fn bit_length(value: u64) -> u8 {
    (u64::BITS - value.leading_zeros()) as u8
}
