//! Append-only metadata log and table state.
//!
//! A staging table is described entirely by a sequence of JSON commits under
//! `_vin_staging_log/`:
//!
//! ```text
//! table_root/
//!   _vin_staging_log/
//!     CURRENT                  # latest committed version (e.g. "3\n")
//!     0000000001.json          # CreateTable
//!     0000000002.json          # AddSegment (first load)
//!     0000000003.json          # AddSegment (second load)
//!   data/
//!     seg-<hash>.jsonl         # one staged record per line
//! ```
//!
//! Commits never mutate existing files and versions only increase. Writers
//! guard on the version they read (optimistic concurrency); table state is
//! rebuilt by replaying commits `1..=CURRENT`.
pub mod actions;
pub mod log_store;
pub mod segments;
pub mod table_metadata;
pub mod table_state;

pub use actions::{Commit, LogAction};
pub use log_store::TransactionLogStore;
pub use segments::{SegmentId, SegmentMeta};
pub use table_metadata::{ColumnDef, ColumnType, SchemaError, TableMeta, TableSchema};
pub use table_state::TableState;

use snafu::{Backtrace, prelude::*};

use crate::storage::StorageError;

/// Errors that can occur while reading or writing the commit log.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CommitError {
    /// The caller's expected version does not match the CURRENT pointer.
    #[snafu(display("Commit conflict: expected version {expected}, but CURRENT is {found}"))]
    Conflict {
        /// The version the caller expected to be current.
        expected: u64,
        /// The actual current version found.
        found: u64,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },

    /// Underlying storage error while working with the log or CURRENT file.
    #[snafu(display("Storage error while accessing commit log: {source}"))]
    Storage {
        /// Underlying storage error returned by the storage backend.
        #[snafu(backtrace)]
        source: StorageError,
    },

    /// The log or CURRENT file is in an unexpected or malformed state.
    #[snafu(display("Corrupt log state: {msg}"))]
    CorruptState {
        /// A description of the corrupt state.
        msg: String,
        /// Backtrace for debugging.
        backtrace: Backtrace,
    },
}
