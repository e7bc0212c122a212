//! Async helpers for persisting and reading the metadata log.
//!
//! This module owns all on-disk interactions with `_vin_staging_log/`:
//! - Tracking the `CURRENT` pointer and interpreting the "no file" case as
//!   version `0` (no table yet).
//! - Writing zero-padded commit files with optimistic concurrency control so
//!   each version is created exactly once.
//! - Mapping storage failures into [`CommitError`] variants.
use crate::storage::{self, StorageError, TableLocation, layout};
use crate::transaction_log::actions::{Commit, LogAction};
use crate::transaction_log::*;
use chrono::Utc;
use snafu::{Backtrace, prelude::*};

/// Reads and writes the commit log under a table root.
#[derive(Debug, Clone)]
pub struct TransactionLogStore {
    location: TableLocation,
}

impl TransactionLogStore {
    /// Create a new store rooted at a table directory.
    pub fn new(location: TableLocation) -> Self {
        Self { location }
    }

    /// The table location this store writes to.
    pub fn location(&self) -> &TableLocation {
        &self.location
    }

    /// Load a single commit by version.
    ///
    /// - On storage-layer failures, returns `CommitError::Storage`.
    /// - On JSON parse failures, returns `CommitError::CorruptState`.
    pub async fn load_commit(&self, version: u64) -> Result<Commit, CommitError> {
        let rel = layout::commit_rel_path(version);
        let json = storage::read_to_string(self.location.as_ref(), &rel)
            .await
            .context(StorageSnafu)?;

        serde_json::from_str(&json).map_err(|e| CommitError::CorruptState {
            msg: format!("failed to parse commit {version}: {e}"),
            backtrace: Backtrace::capture(),
        })
    }

    /// Load the CURRENT version pointer.
    ///
    /// - If CURRENT does not exist, return 0.
    /// - If CURRENT is empty or not a number, return `CorruptState`.
    pub async fn load_current_version(&self) -> Result<u64, CommitError> {
        let rel = layout::current_rel_path();

        let contents = match storage::read_to_string(self.location.as_ref(), &rel).await {
            Ok(s) => s,
            Err(StorageError::NotFound { .. }) => return Ok(0),
            Err(source) => return Err(CommitError::Storage { source }),
        };

        let trimmed = contents.trim();
        ensure!(
            !trimmed.is_empty(),
            CorruptStateSnafu {
                msg: format!("CURRENT has empty content at {rel:?}"),
            }
        );

        trimmed
            .parse::<u64>()
            .map_err(|e| CommitError::CorruptState {
                msg: format!("CURRENT has invalid content {trimmed:?}: {e}"),
                backtrace: Backtrace::capture(),
            })
    }

    /// Commit a new version with an optimistic concurrency guard.
    ///
    /// The CURRENT check is advisory. The real guard is creating the commit
    /// file with create-new semantics: if another writer already created it,
    /// this fails with `CommitError::Storage` wrapping
    /// `StorageError::AlreadyExists`.
    ///
    /// A crash between writing the commit file and updating CURRENT leaves an
    /// orphaned commit file; readers only replay up to CURRENT, so it is
    /// ignored, and the next writer for that version fails with
    /// `AlreadyExists`.
    pub async fn commit_with_expected_version(
        &self,
        expected: u64,
        actions: Vec<LogAction>,
    ) -> Result<u64, CommitError> {
        let current = self.load_current_version().await?;
        ensure!(
            current == expected,
            ConflictSnafu {
                expected,
                found: current,
            }
        );

        let version = expected.checked_add(1).context(CorruptStateSnafu {
            msg: "version counter overflow".to_string(),
        })?;

        let commit = Commit {
            version,
            base_version: expected,
            timestamp: Utc::now(),
            actions,
        };

        let json = serde_json::to_vec(&commit).map_err(|e| CommitError::CorruptState {
            msg: format!("failed to serialize commit {version}: {e}"),
            backtrace: Backtrace::capture(),
        })?;

        storage::write_new(
            self.location.as_ref(),
            &layout::commit_rel_path(version),
            &json,
        )
        .await
        .context(StorageSnafu)?;

        storage::write_atomic(
            self.location.as_ref(),
            &layout::current_rel_path(),
            format!("{version}\n").as_bytes(),
        )
        .await
        .context(StorageSnafu)?;

        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn create_test_log_store() -> (TempDir, TransactionLogStore) {
        let tmp = TempDir::new().expect("create temp dir");
        let location = TableLocation::local(tmp.path());
        let store = TransactionLogStore::new(location);
        (tmp, store)
    }

    async fn write_current(tmp: &TempDir, contents: &str) -> std::io::Result<()> {
        let log_dir = tmp.path().join(layout::LOG_DIR_NAME);
        tokio::fs::create_dir_all(&log_dir).await?;
        tokio::fs::write(log_dir.join(layout::CURRENT_FILE_NAME), contents).await
    }

    #[tokio::test]
    async fn load_current_version_returns_zero_when_no_current_file() -> TestResult {
        let (_tmp, store) = create_test_log_store();
        assert_eq!(store.load_current_version().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn load_current_version_handles_whitespace() -> TestResult {
        let (tmp, store) = create_test_log_store();
        write_current(&tmp, "  42  \n").await?;
        assert_eq!(store.load_current_version().await?, 42);
        Ok(())
    }

    #[tokio::test]
    async fn load_current_version_rejects_empty_and_garbage() -> TestResult {
        let (tmp, store) = create_test_log_store();

        write_current(&tmp, "").await?;
        let err = store.load_current_version().await.expect_err("empty");
        assert!(matches!(err, CommitError::CorruptState { .. }));

        write_current(&tmp, "not-a-number").await?;
        let err = store.load_current_version().await.expect_err("garbage");
        assert!(matches!(err, CommitError::CorruptState { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn commits_advance_current_and_write_files() -> TestResult {
        let (tmp, store) = create_test_log_store();

        assert_eq!(store.commit_with_expected_version(0, vec![]).await?, 1);
        assert_eq!(store.commit_with_expected_version(1, vec![]).await?, 2);

        assert_eq!(store.load_current_version().await?, 2);
        let current = tokio::fs::read_to_string(
            tmp.path()
                .join(layout::LOG_DIR_NAME)
                .join(layout::CURRENT_FILE_NAME),
        )
        .await?;
        assert_eq!(current, "2\n");

        let commit = store.load_commit(2).await?;
        assert_eq!(commit.version, 2);
        assert_eq!(commit.base_version, 1);
        Ok(())
    }

    #[tokio::test]
    async fn stale_expected_version_is_a_conflict() -> TestResult {
        let (_tmp, store) = create_test_log_store();
        store.commit_with_expected_version(0, vec![]).await?;

        let err = store
            .commit_with_expected_version(0, vec![])
            .await
            .expect_err("stale writer");
        match err {
            CommitError::Conflict {
                expected, found, ..
            } => {
                assert_eq!(expected, 0);
                assert_eq!(found, 1);
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn pre_existing_commit_file_surfaces_already_exists() -> TestResult {
        let (tmp, store) = create_test_log_store();
        let log_dir = tmp.path().join(layout::LOG_DIR_NAME);
        tokio::fs::create_dir_all(&log_dir).await?;
        tokio::fs::write(log_dir.join("0000000001.json"), b"{}").await?;

        let result = store.commit_with_expected_version(0, vec![]).await;
        assert!(
            matches!(
                result,
                Err(CommitError::Storage {
                    source: StorageError::AlreadyExists { .. }
                })
            ),
            "expected Storage(AlreadyExists), got: {result:?}",
        );
        Ok(())
    }

    #[tokio::test]
    async fn malformed_commit_is_corrupt_state() -> TestResult {
        let (tmp, store) = create_test_log_store();
        let log_dir = tmp.path().join(layout::LOG_DIR_NAME);
        tokio::fs::create_dir_all(&log_dir).await?;
        tokio::fs::write(log_dir.join("0000000001.json"), b"{not json").await?;

        let err = store.load_commit(1).await.expect_err("malformed commit");
        assert!(matches!(err, CommitError::CorruptState { .. }));
        Ok(())
    }
}
