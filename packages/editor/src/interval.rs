//! # Interval Model
//!
//! Half-open offset ranges `[start, end)` over a single stream.
//!
//! Two operations underlie everything else in this crate:
//!
//! - [`merge`] sorts by start and coalesces overlapping or touching intervals
//! - [`complement`] returns every gap of a universe not covered by a set of
//!   excluded intervals
//!
//! Offsets are only comparable within one stream; callers group by stream
//! before using either operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A half-open range `[start, end)` of stream offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntervalError {
    #[error("Inverted interval: start {start} is past end {end}")]
    Inverted { start: usize, end: usize },

    #[error("Interval [{start}, {end}) lies outside [{lower}, {upper})")]
    OutOfBounds {
        start: usize,
        end: usize,
        lower: usize,
        upper: usize,
    },
}

impl Interval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// True when `other` lies entirely inside `self`.
    pub fn covers(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    fn check(&self) -> Result<(), IntervalError> {
        if self.start > self.end {
            return Err(IntervalError::Inverted {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    fn check_within(&self, universe: &Interval) -> Result<(), IntervalError> {
        self.check()?;
        if !universe.covers(self) {
            return Err(IntervalError::OutOfBounds {
                start: self.start,
                end: self.end,
                lower: universe.start,
                upper: universe.end,
            });
        }
        Ok(())
    }
}

impl From<std::ops::Range<usize>> for Interval {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Sort ascending by start and coalesce every interval whose start is at or
/// before the running end. Equal starts keep the larger end.
pub fn merge(intervals: &[Interval]) -> Result<Vec<Interval>, IntervalError> {
    for interval in intervals {
        interval.check()?;
    }

    let mut sorted = intervals.to_vec();
    sorted.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        match merged.last_mut() {
            Some(current) if interval.start <= current.end => {
                current.end = current.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }

    Ok(merged)
}

/// Every non-empty gap of `universe` not covered by `excluded`.
///
/// Excluded intervals are merged first so overlapping spans never leave a
/// stale boundary behind.
pub fn complement(universe: Interval, excluded: &[Interval]) -> Result<Vec<Interval>, IntervalError> {
    universe.check()?;
    for interval in excluded {
        interval.check_within(&universe)?;
    }

    let mut gaps = Vec::new();
    let mut pos = universe.start;
    for interval in merge(excluded)? {
        if pos < interval.start {
            gaps.push(Interval::new(pos, interval.start));
        }
        pos = pos.max(interval.end);
    }
    if pos < universe.end {
        gaps.push(Interval::new(pos, universe.end));
    }

    Ok(gaps)
}
