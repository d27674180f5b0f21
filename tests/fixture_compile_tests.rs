//! Compilation of the common textcache/systrace fixture pair
//!
//! Checks the concrete launch scenario: compiling without a duration and
//! with a duration past the last event give identical artifacts, and a
//! 10ms duration keeps only the head of the launch.

use iotrace_compiler::compiled_trace::{CompiledTrace, FORMAT_VERSION};
use iotrace_compiler::file_identity::{Extent, FileIdentity};
use iotrace_compiler::{compile, CompileConfig, CompileError};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/compiler")
        .join(name)
}

fn compile_fixture(dir: &TempDir, name: &str, duration: Option<&str>) -> Vec<u8> {
    let output = dir.path().join(name);
    let config = CompileConfig::new(
        fixture("common_textcache"),
        fixture("common_systrace"),
        &output,
        duration,
        &[],
    )
    .unwrap();
    compile(&config).unwrap();
    fs::read(&output).unwrap()
}

fn paths(trace: &CompiledTrace) -> Vec<&str> {
    trace.records.iter().map(|r| r.path.as_str()).collect()
}

const LAUNCH_ORDER: [&str; 10] = [
    "/system/framework/framework.jar",
    "/system/lib64/libandroid_runtime.so",
    "/system/lib64/libc++.so",
    "/system/lib64/libhwui.so",
    "/system/framework/services.jar",
    "/vendor/lib64/egl/libGLESv2_adreno.so",
    "/vendor/etc/media_profiles_V1_0.xml",
    "/data/app/com.example.gallery-1/base.apk",
    "/data/data/com.example.gallery/shared_prefs/settings.xml",
    "/system/usr/share/zoneinfo/tzdata",
];

#[test]
fn test_compile_without_duration() {
    let dir = TempDir::new().unwrap();
    let bytes = compile_fixture(&dir, "full.trace", None);
    let trace = CompiledTrace::decode(&bytes).unwrap();

    assert_eq!(trace.version, FORMAT_VERSION);
    assert_eq!(paths(&trace), LAUNCH_ORDER.to_vec());

    let stamps: Vec<u64> = trace.records.iter().map(|r| r.first_timestamp_us).collect();
    assert_eq!(
        stamps,
        vec![0, 910, 2004, 5733, 7010, 9999, 10000, 10001, 18020, 27650]
    );
}

#[test]
fn test_duplicate_catalog_entry_keeps_first_path() {
    let dir = TempDir::new().unwrap();
    let trace = CompiledTrace::decode(&compile_fixture(&dir, "full.trace", None)).unwrap();

    let framework = &trace.records[0];
    assert_eq!(framework.identity, FileIdentity::new(64774, 7580));
    assert_eq!(framework.size, 12582912);
    assert!(trace
        .records
        .iter()
        .all(|r| r.path != "/system/framework/framework-res.apk"));
}

#[test]
fn test_extents_coalesce_contiguous_pages() {
    let dir = TempDir::new().unwrap();
    let trace = CompiledTrace::decode(&compile_fixture(&dir, "full.trace", None)).unwrap();

    assert_eq!(
        trace.records[0].extents,
        vec![Extent::new(0, 12288), Extent::new(65536, 4096)]
    );
    assert_eq!(trace.records[1].extents, vec![Extent::new(0, 12288)]);
    assert_eq!(
        trace.records[3].extents,
        vec![Extent::new(0, 8192), Extent::new(12288, 4096)]
    );
}

#[test]
fn test_uncataloged_inodes_never_appear() {
    let dir = TempDir::new().unwrap();
    let trace = CompiledTrace::decode(&compile_fixture(&dir, "full.trace", None)).unwrap();

    for record in &trace.records {
        assert_ne!(record.identity.inode, 9999);
        assert_ne!(record.identity.inode, 424242);
    }
}

#[test]
fn test_duration_past_last_event_equals_no_duration() {
    let dir = TempDir::new().unwrap();
    let unbounded = compile_fixture(&dir, "a.trace", None);
    let thirty = compile_fixture(&dir, "b.trace", Some("30"));
    assert_eq!(unbounded, thirty);
}

#[test]
fn test_ten_millisecond_duration_is_prefix() {
    let dir = TempDir::new().unwrap();
    let full = CompiledTrace::decode(&compile_fixture(&dir, "a.trace", None)).unwrap();
    let ten = CompiledTrace::decode(&compile_fixture(&dir, "b.trace", Some("10"))).unwrap();

    // 10ms boundary is inclusive: the record at exactly 10000us stays
    assert_eq!(paths(&ten), LAUNCH_ORDER[..7].to_vec());
    assert_eq!(ten.records[..], full.records[..7]);
}

#[test]
fn test_compilation_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let first = compile_fixture(&dir, "a.trace", Some("10"));
    let second = compile_fixture(&dir, "b.trace", Some("10"));
    assert_eq!(first, second);
}

#[test]
fn test_malformed_systrace_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let systrace = dir.path().join("systrace");
    let mut text = fs::read_to_string(fixture("common_systrace")).unwrap();
    text.push_str("   droid.gallery-8814  ( 8814) [000] ....  2153.500000: mm_filemap_add_to_page_cache: dev 253:6 ino zz page=0 pfn=1 ofs=0\n");
    fs::write(&systrace, text).unwrap();

    let output = dir.path().join("out.trace");
    let config =
        CompileConfig::new(fixture("common_textcache"), &systrace, &output, None, &[]).unwrap();

    let err = compile(&config).unwrap_err();
    assert!(matches!(err, CompileError::Parse { .. }));
    assert!(!output.exists());
}

#[test]
fn test_failed_run_keeps_previous_artifact() {
    let dir = TempDir::new().unwrap();
    let good = compile_fixture(&dir, "out.trace", None);

    let textcache = dir.path().join("textcache");
    fs::write(&textcache, "64774 7580 not-a-size 2 /x\n").unwrap();
    let output = dir.path().join("out.trace");
    let config =
        CompileConfig::new(&textcache, fixture("common_systrace"), &output, None, &[]).unwrap();

    assert!(compile(&config).is_err());
    assert_eq!(fs::read(&output).unwrap(), good);
}
