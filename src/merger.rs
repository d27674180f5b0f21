//! Join trace events with the catalog into one record per file
//!
//! The catalog is the universe of known files: events for identities it
//! does not contain are dropped and only counted. Every other event either
//! opens a record for its file or adds its extent to the existing one.
//! The result is ordered by first access time, ties in first-appearance
//! order.

use crate::file_identity::{Extent, FileIdentity};
use crate::systrace::AccessEvent;
use crate::textcache::Catalog;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A cataloged file together with every extent the trace touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRecord {
    pub identity: FileIdentity,
    pub path: String,
    pub size: u64,
    /// Earliest access, microseconds since launch
    pub first_timestamp_us: u64,
    pub extents: Vec<Extent>,
}

impl ResolvedRecord {
    /// Append an extent, extending the last one when the two are contiguous
    fn push_extent(&mut self, extent: Extent) {
        if let Some(last) = self.extents.last_mut() {
            if last.end() == extent.offset {
                last.length += extent.length;
                return;
            }
        }
        self.extents.push(extent);
    }

    /// Sum of extent lengths
    pub fn total_bytes(&self) -> u64 {
        self.extents.iter().map(|e| e.length).sum()
    }
}

/// Output of [`merge`]
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub records: Vec<ResolvedRecord>,
    /// Events dropped because their file is not cataloged
    pub unmatched_events: usize,
    /// Per-identity count of dropped events, ordered for stable reporting
    pub unmatched_by_identity: BTreeMap<FileIdentity, usize>,
}

/// Resolve `events` against `catalog`
pub fn merge(catalog: &Catalog, events: &[AccessEvent]) -> MergeOutcome {
    let mut records: Vec<ResolvedRecord> = Vec::new();
    let mut index_of: HashMap<FileIdentity, usize> = HashMap::new();
    let mut outcome = MergeOutcome::default();

    for event in events {
        let Some(entry) = catalog.get(&event.identity) else {
            outcome.unmatched_events += 1;
            *outcome
                .unmatched_by_identity
                .entry(event.identity)
                .or_insert(0) += 1;
            continue;
        };

        match index_of.get(&event.identity) {
            Some(&index) => {
                let record = &mut records[index];
                record.first_timestamp_us = record.first_timestamp_us.min(event.timestamp_us);
                if let Some(extent) = event.extent {
                    record.push_extent(extent);
                }
            }
            None => {
                index_of.insert(event.identity, records.len());
                records.push(ResolvedRecord {
                    identity: entry.identity,
                    path: entry.path.clone(),
                    size: entry.size,
                    first_timestamp_us: event.timestamp_us,
                    extents: event.extent.into_iter().collect(),
                });
            }
        }
    }

    // stable: equal timestamps keep first-appearance order
    records.sort_by_key(|r| r.first_timestamp_us);
    outcome.records = records;
    outcome
}
