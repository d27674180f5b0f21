//! iotrace-compiler - compile startup I/O traces for page cache prefetching
//!
//! This library joins a static textcache catalog with the page cache events
//! of an ftrace capture, applies the optional path and duration filters, and
//! serializes the result into the versioned binary format a prefetcher
//! reads on the next launch.

pub mod cli;
pub mod compiled_trace;
pub mod compiler;
pub mod duration;
pub mod error;
pub mod file_identity;
pub mod json_output;
pub mod merger;
pub mod path_filter;
pub mod systrace;
pub mod textcache;
pub mod writer;

pub use compiled_trace::CompiledTrace;
pub use compiler::{compile, compile_sources, CompileConfig, CompileOptions, CompileStats};
pub use error::{CompileError, InputKind};
