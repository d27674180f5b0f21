//! Error kinds for a compilation run
//!
//! Every error is fatal to the invocation that raised it. The binary maps
//! each kind to its own exit status (see [`CompileError::exit_code`]).

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which input a [`CompileError::Parse`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    TextCache,
    SysTrace,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::TextCache => write!(f, "textcache"),
            InputKind::SysTrace => write!(f, "systrace"),
        }
    }
}

/// Errors raised while compiling or decoding a trace
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("{input} line {line}: {message}")]
    Parse {
        input: InputKind,
        line: usize,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid compiled trace: {0}")]
    Format(String),
}

/// Result type for compilation operations
pub type Result<T> = std::result::Result<T, CompileError>;

impl CompileError {
    pub(crate) fn parse(input: InputKind, line: usize, message: impl Into<String>) -> Self {
        CompileError::Parse {
            input,
            line,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.into(),
            source,
        }
    }

    /// Decode a whole input as UTF-8
    ///
    /// Invalid bytes are a parse error on the line that holds them.
    pub(crate) fn utf8_source(input: InputKind, bytes: &[u8]) -> Result<&str> {
        std::str::from_utf8(bytes).map_err(|e| {
            let line = bytes[..e.valid_up_to()]
                .iter()
                .filter(|&&b| b == b'\n')
                .count()
                + 1;
            CompileError::parse(input, line, "invalid UTF-8")
        })
    }

    /// Process exit status for this error kind (sysexits.h values)
    pub fn exit_code(&self) -> u8 {
        match self {
            CompileError::Config(_) => 64,
            CompileError::Parse { .. } | CompileError::Format(_) => 65,
            CompileError::Io { .. } => 74,
        }
    }
}
