//! Duration threshold: drop records first accessed after a cutoff

use crate::error::{CompileError, Result};
use crate::merger::ResolvedRecord;
use std::fmt;
use std::str::FromStr;

/// Cutoff in milliseconds after launch; the boundary is inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DurationThreshold {
    millis: u64,
}

impl DurationThreshold {
    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    pub fn as_millis(&self) -> u64 {
        self.millis
    }

    /// Threshold expressed in microseconds, the unit of record timestamps
    pub fn as_micros(&self) -> u64 {
        self.millis.saturating_mul(1000)
    }

    /// Check if a record first accessed at `timestamp_us` is kept
    pub fn retains(&self, timestamp_us: u64) -> bool {
        timestamp_us <= self.as_micros()
    }
}

impl FromStr for DurationThreshold {
    type Err = CompileError;

    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.starts_with('-') {
            return Err(CompileError::Config(format!(
                "duration must be non-negative, got '{}'",
                text
            )));
        }
        text.parse::<u64>()
            .map(Self::from_millis)
            .map_err(|_| {
                CompileError::Config(format!(
                    "duration must be a whole number of milliseconds, got '{}'",
                    text
                ))
            })
    }
}

impl fmt::Display for DurationThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.millis)
    }
}

/// Apply an optional threshold to records ordered by first access.
///
/// Returns the retained records and how many were removed. `None` keeps
/// everything.
pub fn apply(
    records: Vec<ResolvedRecord>,
    threshold: Option<DurationThreshold>,
) -> (Vec<ResolvedRecord>, usize) {
    let Some(threshold) = threshold else {
        return (records, 0);
    };

    let before = records.len();
    let kept: Vec<ResolvedRecord> = records
        .into_iter()
        .filter(|r| threshold.retains(r.first_timestamp_us))
        .collect();
    let removed = before - kept.len();

    tracing::info!(
        "Duration {}: kept {} of {} records",
        threshold,
        kept.len(),
        before
    );

    (kept, removed)
}
