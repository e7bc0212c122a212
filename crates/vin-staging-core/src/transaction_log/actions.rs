//! Log actions and commit payload definitions.
//!
//! Each commit file stores a [`Commit`] containing ordered [`LogAction`]
//! values. This module only defines the log's "verbs"; the data they carry
//! lives in the sibling modules.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transaction_log::{segments::SegmentMeta, table_metadata::TableMeta};

/// An action recorded in a commit.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogAction {
    /// Define (or redefine) the table. Drops every live segment.
    CreateTable(TableMeta),

    /// Append a data segment.
    AddSegment(SegmentMeta),
}

/// A single, immutable commit in the metadata log.
///
/// `version` must match the file name; `base_version` records what the
/// writer believed was current when the commit was prepared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Commit {
    /// The version number of this commit (monotonic, starting from 1).
    pub version: u64,

    /// The version the writer expected to be current.
    pub base_version: u64,

    /// Commit creation timestamp, stored as RFC3339 UTC.
    pub timestamp: DateTime<Utc>,

    /// Ordered list of actions applied by this commit.
    pub actions: Vec<LogAction>,
}
