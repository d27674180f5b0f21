//! TextCache parser: static (device, inode) -> path catalog
//!
//! One file per line:
//!
//! ```text
//! <device> <inode> <file_size> <path_length> <path>
//! ```
//!
//! The path is the remainder of the line and may contain spaces; its byte
//! length must equal `path_length`. Blank lines are skipped. The first entry
//! for an identity wins and later duplicates are ignored.

use crate::error::{CompileError, InputKind, Result};
use crate::file_identity::FileIdentity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A cataloged file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub identity: FileIdentity,
    pub path: String,
    pub size: u64,
}

/// Parsed textcache, keyed by file identity
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<FileIdentity, CatalogEntry>,
    duplicates: usize,
}

impl Catalog {
    /// Parse a whole textcache source
    ///
    /// Fails on the first malformed line; no partial catalog is returned.
    pub fn parse(text: &str) -> Result<Self> {
        let mut catalog = Catalog::default();

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if line.trim().is_empty() {
                continue;
            }

            let entry = parse_line(line)
                .map_err(|msg| CompileError::parse(InputKind::TextCache, line_no, msg))?;
            catalog.insert(entry, line_no);
        }

        tracing::debug!(
            "Parsed textcache: {} entries, {} duplicates ignored",
            catalog.len(),
            catalog.duplicates
        );

        Ok(catalog)
    }

    /// Parse a textcache read as raw bytes
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        Self::parse(CompileError::utf8_source(InputKind::TextCache, bytes)?)
    }

    fn insert(&mut self, entry: CatalogEntry, line_no: usize) {
        if let Some(existing) = self.entries.get(&entry.identity) {
            tracing::warn!(
                "textcache line {}: duplicate {} ({}), keeping {}",
                line_no,
                entry.identity,
                entry.path,
                existing.path
            );
            self.duplicates += 1;
            return;
        }
        self.entries.insert(entry.identity, entry);
    }

    /// Look up a file by identity
    pub fn get(&self, identity: &FileIdentity) -> Option<&CatalogEntry> {
        self.entries.get(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lines ignored because their identity was already cataloged
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

fn parse_line(line: &str) -> std::result::Result<CatalogEntry, String> {
    let mut fields = line.splitn(5, ' ');
    let mut next_number = |name: &str| -> std::result::Result<u64, String> {
        let field = fields
            .next()
            .ok_or_else(|| format!("missing {} field", name))?;
        field
            .parse::<u64>()
            .map_err(|_| format!("invalid {} '{}'", name, field))
    };

    let device = next_number("device")?;
    let inode = next_number("inode")?;
    let size = next_number("file size")?;
    let path_length = next_number("path length")?;

    let path = fields.next().ok_or("missing path field")?;
    if path.is_empty() {
        return Err("empty path".to_string());
    }
    if path.len() as u64 != path_length {
        return Err(format!(
            "path length {} does not match path '{}' ({} bytes)",
            path_length,
            path,
            path.len()
        ));
    }

    Ok(CatalogEntry {
        identity: FileIdentity::new(device, inode),
        path: path.to_string(),
        size,
    })
}
