// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Rollup window arithmetic.

use std::fmt;
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};

/// A half-open time range `[start, end)` rolled up into one set of documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Inclusive start.
    pub start: Timestamp,
    /// Exclusive end.
    pub end: Timestamp,
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Parse a rollup interval such as `10m`, `1h` or `1h30m`.
///
/// The interval must be a positive whole number of seconds.
pub fn parse_interval(value: &str) -> Result<Duration, String> {
    let signed: SignedDuration = value
        .parse()
        .map_err(|err| format!("invalid interval {value:?}: {err}"))?;
    if signed.subsec_nanos() != 0 || signed.as_secs() <= 0 {
        return Err(format!(
            "interval must be a positive whole number of seconds, got {value:?}"
        ));
    }
    Ok(Duration::from_secs(signed.as_secs().unsigned_abs()))
}

/// Round `timestamp` down to a multiple of `interval` since the Unix epoch.
pub fn align(timestamp: Timestamp, interval: Duration) -> Timestamp {
    let step = step_secs(interval);
    let aligned = timestamp.as_second().div_euclid(step) * step;
    // rounding down can step past the minimum timestamp
    Timestamp::from_second(aligned).unwrap_or(Timestamp::MIN)
}

/// Consecutive windows of length `interval`, from `start` (aligned down)
/// while the window start is before `end`.
pub fn windows(
    start: Timestamp,
    end: Timestamp,
    interval: Duration,
) -> impl Iterator<Item = Window> {
    let step = step_secs(interval);
    let first = align(start, interval).as_second();
    let end = end.as_second();
    std::iter::successors(Some(first), move |current| current.checked_add(step))
        .take_while(move |current| *current < end)
        .map_while(move |current| {
            Some(Window {
                start: Timestamp::from_second(current).ok()?,
                end: Timestamp::from_second(current.checked_add(step)?).ok()?,
            })
        })
}

fn step_secs(interval: Duration) -> i64 {
    i64::try_from(interval.as_secs()).unwrap_or(i64::MAX).max(1)
}
