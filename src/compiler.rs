//! Compilation pipeline: parse -> merge -> filter -> serialize -> write
//!
//! [`compile_sources`] is the pure in-memory pipeline; [`compile`] adds
//! reading the two inputs and writing the artifact atomically.

use crate::compiled_trace::CompiledTrace;
use crate::duration::{self, DurationThreshold};
use crate::error::{CompileError, Result};
use crate::merger;
use crate::path_filter::PathFilter;
use crate::systrace::SysTrace;
use crate::textcache::Catalog;
use crate::writer;
use std::fs;
use std::path::{Path, PathBuf};

/// Knobs that shape which records end up in the trace
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Keep only records first accessed within this many ms of launch
    pub duration: Option<DurationThreshold>,
    /// Keep only records whose path matches (empty = all)
    pub path_filter: PathFilter,
}

/// Full configuration for one compilation run
#[derive(Debug, Clone)]
pub struct CompileConfig {
    pub textcache: PathBuf,
    pub systrace: PathBuf,
    pub output: PathBuf,
    pub options: CompileOptions,
}

impl CompileConfig {
    /// Build a configuration from caller-supplied values.
    ///
    /// `duration` and `filters` are parsed here so that bad values surface
    /// as configuration errors before any input is opened.
    pub fn new(
        textcache: impl Into<PathBuf>,
        systrace: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        duration: Option<&str>,
        filters: &[String],
    ) -> Result<Self> {
        let config = Self {
            textcache: textcache.into(),
            systrace: systrace.into(),
            output: output.into(),
            options: CompileOptions {
                duration: duration.map(str::parse::<DurationThreshold>).transpose()?,
                path_filter: PathFilter::from_patterns(filters)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("textcache", &self.textcache),
            ("systrace", &self.systrace),
            ("output", &self.output),
        ] {
            if path.as_os_str().is_empty() {
                return Err(CompileError::Config(format!("{} path is empty", name)));
            }
        }

        let output = resolve(&self.output);
        if output == resolve(&self.textcache) || output == resolve(&self.systrace) {
            return Err(CompileError::Config(format!(
                "output {} would overwrite an input",
                self.output.display()
            )));
        }

        Ok(())
    }
}

/// Counters gathered along the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub catalog_entries: usize,
    pub duplicate_entries: usize,
    pub events: usize,
    pub unmatched_events: usize,
    pub unmatched_files: usize,
    pub merged_records: usize,
    pub path_filtered_records: usize,
    pub duration_filtered_records: usize,
    pub records: usize,
    pub extents: usize,
    pub total_bytes: u64,
    pub output_bytes: usize,
}

/// Run the pipeline over in-memory sources
pub fn compile_sources(
    textcache: &str,
    systrace: &str,
    options: &CompileOptions,
) -> Result<(CompiledTrace, CompileStats)> {
    let catalog = Catalog::parse(textcache)?;
    let trace = SysTrace::parse(systrace)?;
    Ok(compile_parsed(&catalog, &trace, options))
}

fn compile_parsed(
    catalog: &Catalog,
    trace: &SysTrace,
    options: &CompileOptions,
) -> (CompiledTrace, CompileStats) {
    let merged = merger::merge(catalog, &trace.events);
    for (identity, count) in &merged.unmatched_by_identity {
        tracing::warn!(
            "Skipping {} because it is not in the textcache ({} events)",
            identity,
            count
        );
    }

    let mut stats = CompileStats {
        catalog_entries: catalog.len(),
        duplicate_entries: catalog.duplicates(),
        events: trace.len(),
        unmatched_events: merged.unmatched_events,
        unmatched_files: merged.unmatched_by_identity.len(),
        merged_records: merged.records.len(),
        ..CompileStats::default()
    };

    let (records, path_filtered) = options.path_filter.apply(merged.records);
    let (records, duration_filtered) = duration::apply(records, options.duration);
    stats.path_filtered_records = path_filtered;
    stats.duration_filtered_records = duration_filtered;

    let compiled = CompiledTrace::new(records);
    stats.records = compiled.records.len();
    stats.extents = compiled.extent_count();
    stats.total_bytes = compiled.total_bytes();

    for record in &compiled.records {
        tracing::debug!("{},{}", record.path, record.total_bytes());
    }

    (compiled, stats)
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| CompileError::io(path, e))
}

/// Resolve `.`/`..` and symlinks so aliases of one file compare equal.
/// A path that does not exist yet is resolved through its parent.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match (fs::canonicalize(parent), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

/// Compile the configured inputs and write the artifact
///
/// Nothing is written unless every stage succeeds.
pub fn compile(config: &CompileConfig) -> Result<CompileStats> {
    config.validate()?;

    let catalog = Catalog::parse_bytes(&read_source(&config.textcache)?)?;
    let trace = SysTrace::parse_bytes(&read_source(&config.systrace)?)?;

    let (compiled, mut stats) = compile_parsed(&catalog, &trace, &config.options);
    let bytes = compiled.encode()?;
    stats.output_bytes = bytes.len();

    writer::write_atomic(&config.output, &bytes)?;

    tracing::info!(
        "Compiled {} records ({} extents, {} bytes) into {}",
        stats.records,
        stats.extents,
        stats.total_bytes,
        config.output.display()
    );

    Ok(stats)
}
