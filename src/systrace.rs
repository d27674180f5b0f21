//! SysTrace parser: ftrace page-cache events in source order
//!
//! Reads the text form of an ftrace capture (a raw `trace` dump, or a
//! systrace `trace.html` whose text block contains one) and extracts every
//! `mm_filemap_add_to_page_cache` event:
//!
//! ```text
//! <task>-<pid> ( <tgid>) [<cpu>] <flags> <secs>.<usecs>: mm_filemap_add_to_page_cache: dev 253:6 ino 1d9c page=... pfn=... ofs=8192
//! ```
//!
//! Everything else (comments, other events, HTML) is ignored. Timestamps
//! are made relative to the earliest event, which is taken as launch.

use crate::error::{CompileError, InputKind, Result};
use crate::file_identity::{Extent, FileIdentity};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// ftrace event that records a page entering the page cache
pub const PAGE_CACHE_EVENT: &str = "mm_filemap_add_to_page_cache";

const MICROS_PER_SEC: u64 = 1_000_000;

/// A single observed file access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub identity: FileIdentity,
    /// Microseconds since the trace origin
    pub timestamp_us: u64,
    pub extent: Option<Extent>,
    /// 1-based line in the source
    pub line: usize,
}

/// Parsed systrace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SysTrace {
    /// Absolute timestamp (microseconds) of the earliest event
    pub origin_us: u64,
    /// Events in the order they appear in the source
    pub events: Vec<AccessEvent>,
}

/// ftrace entry line. Compiled once at first use.
/// Pattern: `<task>-<pid> [( <tgid>)] [<cpu>] [<flags>] <timestamp>: <event>: <payload>`
static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<task>.+?)-(?P<pid>\d+)\s+(?:\(\s*[\d-]+\)\s+)?\[(?P<cpu>\d+)\]\s+(?:\S+\s+)?(?P<ts>-?[\d.]+):\s+(?P<event>\w+):\s*(?P<payload>.*)$",
    )
    .expect("Invalid ftrace entry regex pattern")
});

/// `mm_filemap_add_to_page_cache` payload; the kernel prints the inode in hex.
static PAYLOAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^dev (?P<major>\d+):(?P<minor>\d+) ino (?P<ino>[0-9a-fA-F]+)(?:\s+page=\S+)?(?:\s+pfn=\S+)?(?:\s+ofs=(?P<ofs>\d+))?\s*$",
    )
    .expect("Invalid page cache payload regex pattern")
});

impl SysTrace {
    /// Parse a whole systrace source
    ///
    /// Fails on the first malformed page-cache entry; no partial trace is
    /// returned.
    pub fn parse(text: &str) -> Result<Self> {
        let mut events = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            if !line.contains(PAGE_CACHE_EVENT) || line.trim_start().starts_with('#') {
                continue;
            }

            if let Some(event) = parse_entry(line, line_no)
                .map_err(|msg| CompileError::parse(InputKind::SysTrace, line_no, msg))?
            {
                events.push(event);
            }
        }

        // absolute -> relative to launch
        let origin_us = events.iter().map(|e| e.timestamp_us).min().unwrap_or(0);
        for event in &mut events {
            event.timestamp_us -= origin_us;
        }

        tracing::debug!(
            "Parsed systrace: {} page cache events, origin {}us",
            events.len(),
            origin_us
        );

        Ok(SysTrace { origin_us, events })
    }

    /// Parse a systrace read as raw bytes
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        Self::parse(CompileError::utf8_source(InputKind::SysTrace, bytes)?)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Parse one line that mentions the page-cache event. The returned event
/// carries its absolute timestamp.
///
/// Returns `Ok(None)` for well-formed entries of some other event whose
/// payload merely mentions the name.
fn parse_entry(line: &str, line_no: usize) -> std::result::Result<Option<AccessEvent>, String> {
    let caps = ENTRY_RE
        .captures(line)
        .ok_or_else(|| format!("malformed ftrace entry: '{}'", line.trim()))?;

    if &caps["event"] != PAGE_CACHE_EVENT {
        return Ok(None);
    }

    let timestamp_us = parse_timestamp_us(&caps["ts"])?;

    let payload = caps["payload"].trim();
    let fields = PAYLOAD_RE
        .captures(payload)
        .ok_or_else(|| format!("malformed {} payload: '{}'", PAGE_CACHE_EVENT, payload))?;

    let major: u32 = fields["major"]
        .parse()
        .map_err(|_| format!("invalid device major '{}'", &fields["major"]))?;
    let minor: u32 = fields["minor"]
        .parse()
        .map_err(|_| format!("invalid device minor '{}'", &fields["minor"]))?;
    let inode = u64::from_str_radix(&fields["ino"], 16)
        .map_err(|_| format!("invalid inode '{}'", &fields["ino"]))?;
    let extent = match fields.name("ofs") {
        Some(ofs) => Some(Extent::page(
            ofs.as_str()
                .parse()
                .map_err(|_| format!("invalid offset '{}'", ofs.as_str()))?,
        )),
        None => None,
    };

    Ok(Some(AccessEvent {
        identity: FileIdentity::from_major_minor(major, minor, inode),
        timestamp_us,
        extent,
        line: line_no,
    }))
}

/// Parse an ftrace `secs.usecs` timestamp into whole microseconds.
///
/// Digits past the sixth fractional place are truncated.
fn parse_timestamp_us(text: &str) -> std::result::Result<u64, String> {
    if text.starts_with('-') {
        return Err(format!("negative timestamp '{}'", text));
    }

    let invalid = || format!("invalid timestamp '{}'", text);
    let (secs, frac) = text.split_once('.').unwrap_or((text, ""));
    if secs.is_empty() || frac.contains('.') {
        return Err(invalid());
    }
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let secs: u64 = secs.parse().map_err(|_| invalid())?;
    let mut micros: u64 = 0;
    for position in 0..6 {
        let digit = frac
            .as_bytes()
            .get(position)
            .map(|b| u64::from(b - b'0'))
            .unwrap_or(0);
        micros = micros * 10 + digit;
    }

    secs.checked_mul(MICROS_PER_SEC)
        .and_then(|us| us.checked_add(micros))
        .ok_or_else(invalid)
}
