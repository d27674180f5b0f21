//! Property-based tests for the compilation pipeline
//!
//! Inputs are generated as textcache/systrace text so every property is
//! checked through the same parsers the binary uses.

use iotrace_compiler::compiled_trace::CompiledTrace;
use iotrace_compiler::duration::DurationThreshold;
use iotrace_compiler::path_filter::PathFilter;
use iotrace_compiler::{compile_sources, CompileOptions};
use proptest::prelude::*;
use std::collections::HashSet;

const DEVICE_MAJOR: u32 = 253;
const DEVICE_MINOR: u32 = 6;
const DEVICE: u64 = 64774;

/// Textcache with inodes `1..=files`
fn textcache(files: u64) -> String {
    (1..=files)
        .map(|ino| {
            let path = format!("/system/lib/lib{}.so", ino);
            format!("{} {} 65536 {} {}\n", DEVICE, ino, path.len(), path)
        })
        .collect()
}

/// Systrace with one page cache event per (inode, millis offset, page)
fn systrace(events: &[(u64, u64, u64)]) -> String {
    events
        .iter()
        .map(|&(ino, ms, page)| {
            let us = 100_000_000 + ms * 1000;
            format!(
                "  app-42  ( 42) [000] ....  {}.{:06}: mm_filemap_add_to_page_cache: dev {}:{} ino {:x} page=0 pfn=1 ofs={}\n",
                us / 1_000_000,
                us % 1_000_000,
                DEVICE_MAJOR,
                DEVICE_MINOR,
                ino,
                page * 4096
            )
        })
        .collect()
}

fn options(duration: Option<u64>) -> CompileOptions {
    CompileOptions {
        duration: duration.map(DurationThreshold::from_millis),
        path_filter: PathFilter::all(),
    }
}

fn compile_trace(events: &[(u64, u64, u64)], files: u64, duration: Option<u64>) -> CompiledTrace {
    compile_sources(&textcache(files), &systrace(events), &options(duration))
        .unwrap()
        .0
}

fn events_strategy() -> impl Strategy<Value = Vec<(u64, u64, u64)>> {
    // inodes above 8 are never cataloged
    prop::collection::vec((1u64..12, 0u64..50, 0u64..8), 1..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_compilation_is_deterministic(events in events_strategy(), duration in prop::option::of(0u64..60)) {
        let first = compile_trace(&events, 8, duration).encode().unwrap();
        let second = compile_trace(&events, 8, duration).encode().unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_unbounded_duration_equals_no_duration(events in events_strategy(), extra in 0u64..1000) {
        let max_ms = events.iter().map(|e| e.1).max().unwrap_or(0);
        let none = compile_trace(&events, 8, None).encode().unwrap();
        let bounded = compile_trace(&events, 8, Some(max_ms + extra)).encode().unwrap();
        prop_assert_eq!(none, bounded);
    }

    #[test]
    fn prop_truncation_is_monotonic(events in events_strategy(), d1 in 0u64..60, delta in 0u64..60) {
        let d2 = d1 + delta;
        let short = compile_trace(&events, 8, Some(d1));
        let long = compile_trace(&events, 8, Some(d2));

        prop_assert!(short.records.len() <= long.records.len());
        prop_assert_eq!(&short.records[..], &long.records[..short.records.len()]);
    }

    #[test]
    fn prop_uncataloged_events_dropped(events in events_strategy()) {
        let trace = compile_trace(&events, 8, None);
        for record in &trace.records {
            prop_assert!(record.identity.inode <= 8);
        }
    }

    #[test]
    fn prop_one_record_per_file_with_minimum_timestamp(events in events_strategy()) {
        let trace = compile_trace(&events, 8, None);

        let mut seen = HashSet::new();
        for record in &trace.records {
            prop_assert!(seen.insert(record.identity));

            // systrace origin is the earliest event, cataloged or not
            let origin_ms = events.iter().map(|e| e.1).min().unwrap();
            let expected_ms = events
                .iter()
                .filter(|e| e.0 == record.identity.inode)
                .map(|e| e.1)
                .min()
                .unwrap();
            prop_assert_eq!(record.first_timestamp_us, (expected_ms - origin_ms) * 1000);
        }
    }

    #[test]
    fn prop_records_sorted_by_first_access(events in events_strategy()) {
        let trace = compile_trace(&events, 8, None);
        for pair in trace.records.windows(2) {
            prop_assert!(pair[0].first_timestamp_us <= pair[1].first_timestamp_us);
        }
    }

    #[test]
    fn prop_decode_restores_compiled_trace(events in events_strategy(), duration in prop::option::of(0u64..60)) {
        let trace = compile_trace(&events, 8, duration);
        let decoded = CompiledTrace::decode(&trace.encode().unwrap()).unwrap();
        prop_assert_eq!(decoded, trace);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_parsers_never_panic(text in "\\PC*") {
        // Property: arbitrary text either parses or returns an error
        let _ = compile_sources(&text, &text, &CompileOptions::default());
    }
}
