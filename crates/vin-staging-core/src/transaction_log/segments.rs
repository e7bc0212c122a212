//! Segment identifiers and per-load segment metadata.
//!
//! Every load that produces at least one row writes exactly one JSON-Lines
//! segment under `data/` and records it with an `AddSegment` action.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier for a data segment.
///
/// A newtype so segment IDs are not mixed up with other string fields.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SegmentId(pub String);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Metadata about one data segment.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SegmentMeta {
    /// Logical identifier for this segment.
    pub segment_id: SegmentId,

    /// File path relative to the table root (for example `"data/seg-….jsonl"`).
    pub path: String,

    /// Number of records in this segment.
    pub row_count: u64,

    /// Source files read (fully or partially) by the load.
    #[serde(default)]
    pub files_loaded: u64,

    /// Source files skipped by the on-error policy during the load.
    #[serde(default)]
    pub files_skipped: u64,

    /// When the load that wrote this segment was prepared.
    pub loaded_at: DateTime<Utc>,
}

/// Derive a segment id for the given commit version and segment bytes.
///
/// The version is part of the hash so loading the same documents twice
/// yields two distinct segments. The id is `seg-` plus 32 hex chars of the
/// BLAKE3 digest.
pub fn segment_id_v1(version: u64, data: &[u8]) -> SegmentId {
    let mut h = blake3::Hasher::new();
    h.update(b"vin-staging-segment-v1");
    h.update(b"\0");
    h.update(&version.to_le_bytes());
    h.update(b"\0");
    h.update(data);
    let hex = h.finalize().to_hex();
    SegmentId(format!("seg-{}", &hex[..32]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_id_is_stable_and_version_scoped() {
        let a = segment_id_v1(2, b"{\"vin\":\"X\"}\n");
        let b = segment_id_v1(2, b"{\"vin\":\"X\"}\n");
        let c = segment_id_v1(3, b"{\"vin\":\"X\"}\n");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.0.starts_with("seg-"));
        assert_eq!(a.0.len(), 4 + 32);
    }

    #[test]
    fn segment_id_serializes_as_plain_string() {
        let id = SegmentId("seg-1".to_string());
        assert_eq!(serde_json::to_string(&id).expect("serialize"), r#""seg-1""#);
    }

    #[test]
    fn load_counters_default_when_absent() {
        let json = r#"{
            "segment_id": "seg-1",
            "path": "data/seg-1.jsonl",
            "row_count": 4,
            "loaded_at": "2025-01-01T00:00:00Z"
        }"#;
        let meta: SegmentMeta = serde_json::from_str(json).expect("deserialize");
        assert_eq!(meta.files_loaded, 0);
        assert_eq!(meta.files_skipped, 0);
    }
}
