//! Path filtering for `-f REGEX` expressions
//!
//! With no expressions every record is kept. Otherwise a record survives
//! only when its path matches at least one expression (unanchored search).

use crate::error::{CompileError, Result};
use crate::merger::ResolvedRecord;
use regex::Regex;
use std::collections::BTreeMap;

/// Path filter that determines which files end up in the compiled trace
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    /// Expressions to match (empty = keep all)
    patterns: Vec<Regex>,
}

impl PathFilter {
    /// Create a filter that keeps every path
    pub fn all() -> Self {
        Self::default()
    }

    /// Compile a list of expressions
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| {
                    CompileError::Config(format!("invalid path filter '{}': {}", p.as_ref(), e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check if a path should be kept
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|re| re.is_match(path))
    }

    /// Drop records whose path does not match, returning how many were removed
    pub fn apply(&self, records: Vec<ResolvedRecord>) -> (Vec<ResolvedRecord>, usize) {
        if self.is_empty() {
            return (records, 0);
        }

        let before = records.len();
        let mut removed: BTreeMap<String, usize> = BTreeMap::new();
        let kept: Vec<ResolvedRecord> = records
            .into_iter()
            .filter(|record| {
                let keep = self.matches(&record.path);
                if !keep {
                    *removed.entry(record.path.clone()).or_insert(0) += record.extents.len();
                }
                keep
            })
            .collect();

        let removed_records = before - kept.len();
        tracing::info!("Path filter: {} files removed", removed_records);
        for (path, extents) in &removed {
            tracing::debug!("Path filter: file '{}' removed ({} extents)", path, extents);
        }

        (kept, removed_records)
    }
}
