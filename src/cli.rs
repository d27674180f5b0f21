//! CLI argument parsing for iotrace-compiler

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "iotrace-compiler")]
#[command(version)]
#[command(about = "Compile a textcache and systrace into a compiled prefetch trace", long_about = None)]
pub struct Cli {
    /// Textcache with the (device, inode) -> path catalog
    #[arg(
        short = 'i',
        long = "textcache",
        value_name = "FILE",
        required_unless_present = "dump"
    )]
    pub textcache: Option<PathBuf>,

    /// Systrace (ftrace text or trace.html) with page cache events
    #[arg(
        short = 't',
        long = "systrace",
        value_name = "FILE",
        required_unless_present = "dump"
    )]
    pub systrace: Option<PathBuf>,

    /// Output compiled trace
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        required_unless_present = "dump"
    )]
    pub output: Option<PathBuf>,

    /// Only keep files first accessed within this many milliseconds of launch
    #[arg(
        short = 'd',
        long = "duration",
        value_name = "MS",
        allow_hyphen_values = true
    )]
    pub duration: Option<String>,

    /// Keep only files whose path matches one of these regexes (repeatable)
    #[arg(short = 'f', long = "filter", value_name = "REGEX")]
    pub filters: Vec<String>,

    /// Do not print the summary
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,

    /// Print an existing compiled trace as JSON instead of compiling
    #[arg(
        long = "dump",
        value_name = "FILE",
        conflicts_with_all = ["textcache", "systrace", "output", "duration", "filters"]
    )]
    pub dump: Option<PathBuf>,
}
