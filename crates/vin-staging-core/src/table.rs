//! Table layer.
//!
//! This is the user-facing API surface: create or open a staging table, load
//! a stage into it, and scan it back. All state lives in the transaction log
//! under the table root; a [`StagingTable`] holds the replayed
//! [`TableState`] and keeps it current across its own loads.

pub mod error;
pub mod load;
pub mod scan;

use log::info;
use snafu::prelude::*;

use crate::{
    storage::TableLocation,
    transaction_log::{LogAction, TableMeta, TableState, TransactionLogStore},
};

pub use error::TableError;
use error::{AlreadyExistsSnafu, TableNotFoundSnafu, TransactionLogSnafu};

/// What `create` does when the location already holds a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CreateMode {
    /// Fail with [`TableError::AlreadyExists`].
    #[default]
    ErrorIfExists,
    /// Open the existing table unchanged.
    IfNotExists,
    /// Commit a fresh `CreateTable`, discarding every existing row.
    Replace,
}

/// A staging table backed by a local transaction log.
#[derive(Debug)]
pub struct StagingTable {
    location: TableLocation,
    log: TransactionLogStore,
    state: TableState,
}

impl StagingTable {
    /// Create a table at `location` with the given metadata.
    ///
    /// - Empty location: writes the first `CreateTable` commit.
    /// - Existing table: behaviour depends on `mode`. `Replace` commits a new
    ///   `CreateTable` on top of the log, so earlier segments stop being
    ///   live but their files stay on disk.
    pub async fn create(
        location: TableLocation,
        meta: TableMeta,
        mode: CreateMode,
    ) -> Result<Self, TableError> {
        let log = TransactionLogStore::new(location.clone());
        let current_version = log
            .load_current_version()
            .await
            .context(TransactionLogSnafu)?;

        if current_version > 0 {
            match mode {
                CreateMode::ErrorIfExists => {
                    return AlreadyExistsSnafu { current_version }.fail();
                }
                CreateMode::IfNotExists => {
                    info!(
                        "Table already exists at {} (version {current_version}); leaving it as is",
                        location.as_ref().display()
                    );
                    return Self::open(location).await;
                }
                CreateMode::Replace => {
                    info!(
                        "Replacing table at {} (was version {current_version})",
                        location.as_ref().display()
                    );
                }
            }
        }

        let table_name = meta.name.clone();
        let version = log
            .commit_with_expected_version(current_version, vec![LogAction::CreateTable(meta)])
            .await
            .context(TransactionLogSnafu)?;

        let state = log.rebuild_table_state().await.context(TransactionLogSnafu)?;
        info!(
            "Created table {table_name:?} {} at version {version}",
            state.table_meta.schema
        );

        Ok(StagingTable {
            location,
            log,
            state,
        })
    }

    /// Open an existing table by replaying its log.
    pub async fn open(location: TableLocation) -> Result<Self, TableError> {
        let log = TransactionLogStore::new(location.clone());
        let current_version = log
            .load_current_version()
            .await
            .context(TransactionLogSnafu)?;

        ensure!(
            current_version > 0,
            TableNotFoundSnafu {
                location: location.as_ref().display(),
            }
        );

        let state = log.rebuild_table_state().await.context(TransactionLogSnafu)?;
        Ok(StagingTable {
            location,
            log,
            state,
        })
    }

    /// Re-read the log, picking up commits made by other writers.
    pub async fn refresh(&mut self) -> Result<(), TableError> {
        self.state = self
            .log
            .rebuild_table_state()
            .await
            .context(TransactionLogSnafu)?;
        Ok(())
    }

    /// Where this table lives.
    pub fn location(&self) -> &TableLocation {
        &self.location
    }

    /// Replayed log state as of the last create, open, refresh or load.
    pub fn state(&self) -> &TableState {
        &self.state
    }

    /// Table metadata from the latest `CreateTable`.
    pub fn meta(&self) -> &TableMeta {
        &self.state.table_meta
    }

    /// Latest committed version.
    pub fn version(&self) -> u64 {
        self.state.version
    }

    /// Number of live records.
    pub fn row_count(&self) -> u64 {
        self.state.row_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::staging_table_meta;
    use tempfile::TempDir;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[tokio::test]
    async fn create_then_open_round_trips_meta() -> TestResult {
        let tmp = TempDir::new()?;
        let location = TableLocation::local(tmp.path());

        let created = StagingTable::create(
            location.clone(),
            staging_table_meta("vin_staging"),
            CreateMode::default(),
        )
        .await?;
        assert_eq!(created.version(), 1);
        assert_eq!(created.row_count(), 0);

        let opened = StagingTable::open(location).await?;
        assert_eq!(opened.meta(), created.meta());
        assert_eq!(opened.meta().schema.to_string(), "(vin CHAR(17), raw_json VARIANT)");
        Ok(())
    }

    #[tokio::test]
    async fn create_twice_is_already_exists() -> TestResult {
        let tmp = TempDir::new()?;
        let location = TableLocation::local(tmp.path());
        StagingTable::create(location.clone(), staging_table_meta("t"), CreateMode::ErrorIfExists)
            .await?;

        let err = StagingTable::create(location, staging_table_meta("t"), CreateMode::ErrorIfExists)
            .await
            .expect_err("second create");
        assert!(matches!(err, TableError::AlreadyExists { current_version: 1 }));
        Ok(())
    }

    #[tokio::test]
    async fn if_not_exists_keeps_the_original_table() -> TestResult {
        let tmp = TempDir::new()?;
        let location = TableLocation::local(tmp.path());
        StagingTable::create(location.clone(), staging_table_meta("first"), CreateMode::default())
            .await?;

        let again =
            StagingTable::create(location, staging_table_meta("second"), CreateMode::IfNotExists)
                .await?;
        assert_eq!(again.meta().name, "first");
        assert_eq!(again.version(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn replace_commits_a_new_version() -> TestResult {
        let tmp = TempDir::new()?;
        let location = TableLocation::local(tmp.path());
        StagingTable::create(location.clone(), staging_table_meta("first"), CreateMode::default())
            .await?;

        let replaced =
            StagingTable::create(location, staging_table_meta("second"), CreateMode::Replace)
                .await?;
        assert_eq!(replaced.meta().name, "second");
        assert_eq!(replaced.version(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn open_empty_location_is_not_found() -> TestResult {
        let tmp = TempDir::new()?;
        let err = StagingTable::open(TableLocation::local(tmp.path()))
            .await
            .expect_err("no table");
        assert!(matches!(err, TableError::TableNotFound { .. }));
        Ok(())
    }
}
