//! JSON rendering of a compiled trace for `--dump`

use crate::compiled_trace::{CompiledTrace, DIGEST_LEN};
use serde::{Deserialize, Serialize};

/// One extent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonExtent {
    pub offset: u64,
    pub length: u64,
}

/// One file record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRecord {
    pub path: String,
    pub device: u64,
    pub inode: u64,
    pub size: u64,
    pub first_timestamp_us: u64,
    pub extents: Vec<JsonExtent>,
}

/// Complete JSON view of an artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonCompiledTrace {
    pub version: u16,
    pub record_count: usize,
    pub extent_count: usize,
    pub total_bytes: u64,
    /// Hex SHA-256 trailer as stored in the file
    pub digest: String,
    pub records: Vec<JsonRecord>,
}

impl JsonCompiledTrace {
    /// Build the view from a decoded trace and the raw bytes it came from
    pub fn from_trace(trace: &CompiledTrace, bytes: &[u8]) -> Self {
        let digest = bytes
            .len()
            .checked_sub(DIGEST_LEN)
            .map(|start| hex::encode(&bytes[start..]))
            .unwrap_or_default();

        Self {
            version: trace.version,
            record_count: trace.records.len(),
            extent_count: trace.extent_count(),
            total_bytes: trace.total_bytes(),
            digest,
            records: trace
                .records
                .iter()
                .map(|r| JsonRecord {
                    path: r.path.clone(),
                    device: r.identity.device,
                    inode: r.identity.inode,
                    size: r.size,
                    first_timestamp_us: r.first_timestamp_us,
                    extents: r
                        .extents
                        .iter()
                        .map(|e| JsonExtent {
                            offset: e.offset,
                            length: e.length,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Serialize to pretty JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_identity::{Extent, FileIdentity};
    use crate::merger::ResolvedRecord;

    #[test]
    fn test_json_view_of_trace() {
        let trace = CompiledTrace::new(vec![ResolvedRecord {
            identity: FileIdentity::new(64774, 7580),
            path: "/system/framework/framework.jar".to_string(),
            size: 1048576,
            first_timestamp_us: 1500,
            extents: vec![Extent::new(0, 8192)],
        }]);
        let bytes = trace.encode().unwrap();

        let view = JsonCompiledTrace::from_trace(&trace, &bytes);
        assert_eq!(view.record_count, 1);
        assert_eq!(view.total_bytes, 8192);
        assert_eq!(view.digest.len(), 64);

        let json = view.to_json().unwrap();
        assert!(json.contains("\"path\": \"/system/framework/framework.jar\""));
        assert!(json.contains("\"first_timestamp_us\": 1500"));

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["records"][0]["extents"][0]["length"], 8192);
    }
}
