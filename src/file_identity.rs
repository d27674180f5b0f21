//! File identity and byte extents shared by every pipeline stage

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of a memory page in bytes; one page-cache event touches one page
pub const PAGE_SIZE: u64 = 4096;

/// (device, inode) pair identifying a file independent of its path
///
/// `device` uses the Linux userspace `dev_t` encoding, the same value
/// `stat(2)` reports in `st_dev`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileIdentity {
    pub device: u64,
    pub inode: u64,
}

impl FileIdentity {
    pub fn new(device: u64, inode: u64) -> Self {
        Self { device, inode }
    }

    /// Build an identity from the `major:minor` pair ftrace prints
    pub fn from_major_minor(major: u32, minor: u32, inode: u64) -> Self {
        Self::new(encode_dev(major, minor), inode)
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev {} ino {}", self.device, self.inode)
    }
}

/// Encode a device number the way glibc's `makedev` does
pub const fn encode_dev(major: u32, minor: u32) -> u64 {
    let major = major as u64;
    let minor = minor as u64;
    ((major & 0xffff_f000) << 32)
        | ((major & 0x0000_0fff) << 8)
        | ((minor & 0xffff_ff00) << 12)
        | (minor & 0x0000_00ff)
}

/// A contiguous byte range of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent {
    pub offset: u64,
    pub length: u64,
}

impl Extent {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// The single page starting at `offset`
    pub fn page(offset: u64) -> Self {
        Self::new(offset, PAGE_SIZE)
    }

    /// First byte past the end of the extent
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }
}
