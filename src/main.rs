use anyhow::{Context, Result};
use clap::Parser;
use iotrace_compiler::{
    cli::Cli, compile, json_output::JsonCompiledTrace, CompileConfig, CompileError,
    CompileStats, CompiledTrace,
};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber
///
/// Warnings (skipped inodes, duplicate catalog entries) are always shown;
/// `--debug` lowers the level to DEBUG.
fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Print the run summary
fn print_summary(stats: &CompileStats, output: &Path) {
    println!(
        "Parsed {} textcache entries ({} duplicates ignored)",
        stats.catalog_entries, stats.duplicate_entries
    );
    println!(
        "Parsed {} page cache events ({} for {} uncataloged files skipped)",
        stats.events, stats.unmatched_events, stats.unmatched_files
    );
    println!("Merged into {} file records", stats.merged_records);
    if stats.path_filtered_records > 0 {
        println!("Filter: {} files removed", stats.path_filtered_records);
    }
    if stats.duration_filtered_records > 0 {
        println!(
            "Duration: {} files removed",
            stats.duration_filtered_records
        );
    }
    println!(
        "Wrote {} records, {} extents, sum of lengths {} bytes ({} byte artifact) to {}",
        stats.records,
        stats.extents,
        stats.total_bytes,
        stats.output_bytes,
        output.display()
    );
}

/// Decode a compiled trace and print it as JSON
fn dump(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).map_err(|e| CompileError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let trace = CompiledTrace::decode(&bytes)?;
    let json = JsonCompiledTrace::from_trace(&trace, &bytes)
        .to_json()
        .context("Failed to render compiled trace as JSON")?;
    println!("{}", json);
    Ok(())
}

fn run(args: Cli) -> Result<()> {
    if let Some(path) = &args.dump {
        return dump(path);
    }

    // clap enforces these unless --dump is given
    let (Some(textcache), Some(systrace), Some(output)) =
        (args.textcache, args.systrace, args.output)
    else {
        anyhow::bail!("-i, -t and -o are required. Usage: iotrace-compiler -i TEXTCACHE -t SYSTRACE -o OUTPUT");
    };

    let config = CompileConfig::new(
        textcache,
        systrace,
        output,
        args.duration.as_deref(),
        &args.filters,
    )?;

    let stats = compile(&config)?;
    if !args.quiet {
        print_summary(&stats, &config.output);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Cli::parse();

    init_tracing(args.debug);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .downcast_ref::<CompileError>()
                .map(CompileError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}
