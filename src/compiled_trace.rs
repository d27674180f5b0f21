//! Compiled trace binary format
//!
//! The artifact handed to the prefetcher. All integers are little-endian.
//!
//! ```text
//! header   magic "IOTR" | version u16 | flags u16 | record_count u32 | extent_count u32
//! record   device u64 | inode u64 | file_size u64 | first_timestamp_us u64
//!          | path_len u32 | path (UTF-8) | extent_count u32 | (offset u64, length u64) * extent_count
//! trailer  SHA-256 over every preceding byte
//! ```
//!
//! Encoding is a pure function of the record list, so equal inputs give
//! byte-identical artifacts. Readers reject any version other than
//! [`FORMAT_VERSION`] instead of guessing at the layout.

use crate::error::{CompileError, Result};
use crate::file_identity::{Extent, FileIdentity};
use crate::merger::ResolvedRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// File magic
pub const MAGIC: [u8; 4] = *b"IOTR";

/// Current (and only readable) format version
pub const FORMAT_VERSION: u16 = 1;

/// Bytes before the first record
pub const HEADER_LEN: usize = 16;

/// SHA-256 digest length
pub const DIGEST_LEN: usize = 32;

/// An immutable, ordered set of records ready to be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledTrace {
    pub version: u16,
    pub records: Vec<ResolvedRecord>,
}

impl CompiledTrace {
    pub fn new(records: Vec<ResolvedRecord>) -> Self {
        Self {
            version: FORMAT_VERSION,
            records,
        }
    }

    /// Total number of extents across all records
    pub fn extent_count(&self) -> usize {
        self.records.iter().map(|r| r.extents.len()).sum()
    }

    /// Total bytes covered by all extents
    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.total_bytes()).sum()
    }

    /// Serialize to the binary format, trailer included
    pub fn encode(&self) -> Result<Vec<u8>> {
        let record_count = checked_u32(self.records.len(), "record count")?;
        let extent_count = checked_u32(self.extent_count(), "extent count")?;

        let mut buf = Vec::with_capacity(HEADER_LEN + self.records.len() * 64 + DIGEST_LEN);
        encode::header(&mut buf, self.version, record_count, extent_count);
        for record in &self.records {
            encode::record(&mut buf, record)?;
        }

        let digest = Sha256::digest(&buf);
        buf.extend_from_slice(&digest);
        Ok(buf)
    }

    /// Parse and validate a binary artifact
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN + DIGEST_LEN {
            return Err(CompileError::Format(format!(
                "{} bytes is too short for a compiled trace",
                bytes.len()
            )));
        }

        let (body, trailer) = bytes.split_at(bytes.len() - DIGEST_LEN);
        let mut reader = decode::Reader::new(body);

        let magic = reader.take(4)?;
        if magic != MAGIC {
            return Err(CompileError::Format(format!(
                "bad magic {}",
                hex::encode(magic)
            )));
        }

        let version = reader.u16()?;
        if version != FORMAT_VERSION {
            return Err(CompileError::Format(format!(
                "unsupported version {} (expected {})",
                version, FORMAT_VERSION
            )));
        }

        if Sha256::digest(body).as_slice() != trailer {
            return Err(CompileError::Format("digest mismatch".to_string()));
        }

        let _flags = reader.u16()?;
        let record_count = reader.u32()? as usize;
        let extent_count = reader.u32()? as usize;

        let mut records = Vec::with_capacity(record_count.min(body.len() / 36));
        for _ in 0..record_count {
            records.push(decode::record(&mut reader)?);
        }

        if !reader.is_empty() {
            return Err(CompileError::Format(format!(
                "{} unexpected bytes after last record",
                reader.remaining()
            )));
        }

        let trace = CompiledTrace { version, records };
        if trace.extent_count() != extent_count {
            return Err(CompileError::Format(format!(
                "header declares {} extents, found {}",
                extent_count,
                trace.extent_count()
            )));
        }

        Ok(trace)
    }
}

fn checked_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| CompileError::Format(format!("{} {} does not fit in u32", what, value)))
}

mod encode {
    use super::*;

    pub fn header(buf: &mut Vec<u8>, version: u16, record_count: u32, extent_count: u32) {
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&version.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&record_count.to_le_bytes());
        buf.extend_from_slice(&extent_count.to_le_bytes());
    }

    pub fn record(buf: &mut Vec<u8>, record: &ResolvedRecord) -> Result<()> {
        buf.extend_from_slice(&record.identity.device.to_le_bytes());
        buf.extend_from_slice(&record.identity.inode.to_le_bytes());
        buf.extend_from_slice(&record.size.to_le_bytes());
        buf.extend_from_slice(&record.first_timestamp_us.to_le_bytes());
        string(buf, &record.path)?;

        buf.extend_from_slice(&checked_u32(record.extents.len(), "extent count")?.to_le_bytes());
        for extent in &record.extents {
            buf.extend_from_slice(&extent.offset.to_le_bytes());
            buf.extend_from_slice(&extent.length.to_le_bytes());
        }
        Ok(())
    }

    /// Serialize string as its u32 length and data.
    fn string(buf: &mut Vec<u8>, s: &str) -> Result<()> {
        buf.extend_from_slice(&checked_u32(s.len(), "path length")?.to_le_bytes());
        buf.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

mod decode {
    use super::*;

    pub struct Reader<'a> {
        bytes: &'a [u8],
        pos: usize,
    }

    impl<'a> Reader<'a> {
        pub fn new(bytes: &'a [u8]) -> Self {
            Self { bytes, pos: 0 }
        }

        pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
            let end = self
                .pos
                .checked_add(len)
                .filter(|&end| end <= self.bytes.len())
                .ok_or_else(|| {
                    CompileError::Format(format!(
                        "truncated: need {} bytes at offset {}",
                        len, self.pos
                    ))
                })?;
            let slice = &self.bytes[self.pos..end];
            self.pos = end;
            Ok(slice)
        }

        fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
            let mut out = [0u8; N];
            out.copy_from_slice(self.take(N)?);
            Ok(out)
        }

        pub fn u16(&mut self) -> Result<u16> {
            Ok(u16::from_le_bytes(self.array()?))
        }

        pub fn u32(&mut self) -> Result<u32> {
            Ok(u32::from_le_bytes(self.array()?))
        }

        pub fn u64(&mut self) -> Result<u64> {
            Ok(u64::from_le_bytes(self.array()?))
        }

        pub fn remaining(&self) -> usize {
            self.bytes.len() - self.pos
        }

        pub fn is_empty(&self) -> bool {
            self.remaining() == 0
        }
    }

    pub fn record(reader: &mut Reader<'_>) -> Result<ResolvedRecord> {
        let device = reader.u64()?;
        let inode = reader.u64()?;
        let size = reader.u64()?;
        let first_timestamp_us = reader.u64()?;

        let path_len = reader.u32()? as usize;
        let path = std::str::from_utf8(reader.take(path_len)?)
            .map_err(|e| CompileError::Format(format!("path is not UTF-8: {}", e)))?
            .to_string();

        let extent_count = reader.u32()? as usize;
        let mut extents = Vec::with_capacity(extent_count.min(reader.remaining() / 16));
        for _ in 0..extent_count {
            let offset = reader.u64()?;
            let length = reader.u64()?;
            extents.push(Extent::new(offset, length));
        }

        Ok(ResolvedRecord {
            identity: FileIdentity::new(device, inode),
            path,
            size,
            first_timestamp_us,
            extents,
        })
    }
}
