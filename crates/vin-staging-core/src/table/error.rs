//! Error types and SNAFU context selectors for the staging table API.
//!
//! Selectors are `pub(crate)` so the loader and the table modules can attach
//! context without exposing them at the crate root.

use snafu::prelude::*;

use crate::{
    identifier::IdentifierError, loader::FileParseError, schema::LoadTargetError,
    storage::StorageError, transaction_log::CommitError,
};

/// Errors from high-level staging table operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TableError {
    /// Any error coming from the transaction log / commit machinery
    /// (for example, OCC conflicts, storage failures, or corrupt commits).
    #[snafu(display("Transaction log error: {source}"))]
    TransactionLog {
        /// Underlying transaction log / commit error.
        #[snafu(source, backtrace)]
        source: CommitError,
    },

    /// Attempt to create a table where commits already exist.
    #[snafu(display("Table already exists; current transaction log version is {current_version}"))]
    AlreadyExists {
        /// Current transaction log version that indicates the table already exists.
        current_version: u64,
    },

    /// Attempting to open a location that has no commits (CURRENT == 0).
    #[snafu(display("No staging table at {location}"))]
    TableNotFound {
        /// Display form of the table location.
        location: String,
    },

    /// The table cannot receive `(vin, raw_json)` inserts.
    #[snafu(display("Table {table:?} is not a valid load target: {source}"))]
    SchemaMismatch {
        /// Logical table name.
        table: String,
        /// What is wrong with the table's columns.
        source: LoadTargetError,
    },

    /// The stage could not be listed or one of its files could not be read.
    #[snafu(display("Stage {stage} is unreachable: {source}"))]
    StorageUnreachable {
        /// Display form of the stage location.
        stage: String,
        /// Underlying storage error.
        #[snafu(source, backtrace)]
        source: StorageError,
    },

    /// Storage error while accessing table data (read/write failure at the storage layer).
    #[snafu(display("Storage error while accessing table data: {source}"))]
    Storage {
        /// Underlying storage error while reading or writing table data.
        source: StorageError,
    },

    /// A source file could not be parsed and the policy is `AbortStatement`.
    #[snafu(display("Load aborted: {source}"))]
    FileParse {
        /// The per-file parse failure.
        source: FileParseError,
    },

    /// No identifier could be derived and the policy is `AbortStatement`.
    #[snafu(display("Load aborted: {source}"))]
    IdentifierExtraction {
        /// The per-file extraction failure.
        source: IdentifierError,
    },

    /// A committed data segment does not decode.
    #[snafu(display("Corrupt segment {path} at line {line}: {source}"))]
    CorruptSegment {
        /// Segment path relative to the table root.
        path: String,
        /// 1-based line number of the bad record.
        line: usize,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Records could not be serialized into a segment.
    #[snafu(display("Failed to serialize segment: {source}"))]
    Serialize {
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}
