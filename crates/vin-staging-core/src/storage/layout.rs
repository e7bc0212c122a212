//! On-disk layout helpers for a table root.
//!
//! All functions return paths *relative* to the table root; callers join them
//! with a [`crate::storage::TableLocation`] before doing IO.

use std::path::PathBuf;

use crate::transaction_log::SegmentId;

/// Directory where data segments are stored.
pub const DATA_DIR_NAME: &str = "data";

/// File extension for JSON-Lines data segments.
pub const SEGMENT_EXT: &str = "jsonl";

/// Name of the subdirectory containing the commit log.
pub const LOG_DIR_NAME: &str = "_vin_staging_log";

/// Name of the file that stores the current version pointer.
pub const CURRENT_FILE_NAME: &str = "CURRENT";

/// Number of digits used in zero-padded commit file names.
pub const COMMIT_FILENAME_DIGITS: usize = 10;

/// Relative path: `data/`
pub fn data_rel_dir() -> PathBuf {
    PathBuf::from(DATA_DIR_NAME)
}

/// Relative path: `data/<segment_id>.jsonl`
pub fn segment_rel_path(segment_id: &SegmentId) -> PathBuf {
    data_rel_dir().join(format!("{}.{SEGMENT_EXT}", segment_id.0))
}

/// Relative path: `_vin_staging_log/`
pub fn log_rel_dir() -> PathBuf {
    PathBuf::from(LOG_DIR_NAME)
}

/// Relative path: `_vin_staging_log/CURRENT`
pub fn current_rel_path() -> PathBuf {
    log_rel_dir().join(CURRENT_FILE_NAME)
}

/// Relative path: `_vin_staging_log/<zero-padded>.json`
pub fn commit_rel_path(version: u64) -> PathBuf {
    let file_name = format!("{:0width$}.json", version, width = COMMIT_FILENAME_DIGITS);
    log_rel_dir().join(file_name)
}

/// Render a relative path with `/` separators for storage in the log.
pub fn to_log_path(rel: &std::path::Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_paths_are_zero_padded() {
        assert_eq!(
            to_log_path(&commit_rel_path(3)),
            "_vin_staging_log/0000000003.json"
        );
        assert_eq!(to_log_path(&current_rel_path()), "_vin_staging_log/CURRENT");
    }

    #[test]
    fn segment_path_lives_under_data_dir() {
        let id = SegmentId("seg-abc".to_string());
        assert_eq!(to_log_path(&segment_rel_path(&id)), "data/seg-abc.jsonl");
    }
}
