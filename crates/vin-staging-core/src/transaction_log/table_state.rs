//! Reconstructing the current table state by replaying log commits.
use crate::transaction_log::*;

/// In-memory view of table metadata and live segments, rebuilt from the log.
///
/// Invariant: `version` matches CURRENT, and `table_meta` / `segments` are
/// the result of applying commits `1..=version` in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    /// Latest committed version recorded in CURRENT.
    pub version: u64,
    /// Metadata from the most recent `CreateTable`.
    pub table_meta: TableMeta,
    /// Live segments in commit order.
    pub segments: Vec<SegmentMeta>,
}

impl TableState {
    /// Total number of records across live segments.
    pub fn row_count(&self) -> u64 {
        self.segments.iter().map(|s| s.row_count).sum()
    }
}

impl TransactionLogStore {
    /// Rebuild the current TableState by replaying all commits up to CURRENT.
    ///
    /// - CURRENT == 0 is `CorruptState`; callers check for that first.
    /// - A `CreateTable` action replaces the metadata and drops every
    ///   segment added before it.
    /// - A commit whose payload version differs from its file name is
    ///   `CorruptState`.
    pub async fn rebuild_table_state(&self) -> Result<TableState, CommitError> {
        let current_version = self.load_current_version().await?;

        ensure!(
            current_version != 0,
            CorruptStateSnafu {
                msg: "Cannot rebuild TableState: CURRENT is 0 (no commits)".to_string(),
            }
        );

        let mut table_meta: Option<TableMeta> = None;
        let mut segments: Vec<SegmentMeta> = Vec::new();

        for v in 1..=current_version {
            let commit = self.load_commit(v).await?;

            ensure!(
                commit.version == v,
                CorruptStateSnafu {
                    msg: format!(
                        "Commit version mismatch: expected {v}, found {} in payload",
                        commit.version
                    ),
                }
            );

            for action in commit.actions {
                match action {
                    LogAction::CreateTable(meta) => {
                        table_meta = Some(meta);
                        segments.clear();
                    }
                    LogAction::AddSegment(meta) => {
                        ensure!(
                            table_meta.is_some(),
                            CorruptStateSnafu {
                                msg: format!(
                                    "Segment {} added at version {v} before any CreateTable",
                                    meta.segment_id
                                ),
                            }
                        );
                        segments.push(meta);
                    }
                }
            }
        }

        let table_meta = table_meta.context(CorruptStateSnafu {
            msg: format!("No CreateTable found in commits up to version {current_version}"),
        })?;

        Ok(TableState {
            version: current_version,
            table_meta,
            segments,
        })
    }
}
