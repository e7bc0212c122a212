//! Path-keyed bulk loader.
//!
//! A load enumerates every file under a stage prefix, cuts the record
//! identifier out of each file's stage path, parses the file as JSON and
//! pairs every document with that identifier. Files that fail are handled
//! by an [`OnErrorPolicy`]; with the default `SkipFile` a bad file
//! contributes nothing and the batch carries on.
//!
//! This module only produces records and a report. Writing them into a
//! table (and the schema check that precedes it) is done by
//! [`crate::table::StagingTable::load`].

pub mod file_format;

use std::{fmt, str::FromStr};

use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    identifier::IdentifierRule,
    record::StagedRecord,
    storage::{self, StageLocation},
    table::error::{
        FileParseSnafu, IdentifierExtractionSnafu, StorageUnreachableSnafu, TableError,
    },
};

pub use file_format::{FileParseError, JsonFileFormat, ParsedFile};

/// What to do when one file cannot be loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnErrorPolicy {
    /// Fail the whole load; nothing is committed.
    AbortStatement,
    /// Discard every record of the failing file and continue.
    #[default]
    SkipFile,
    /// Keep the documents read before the error and continue. A file that
    /// yields nothing is skipped.
    Continue,
}

impl fmt::Display for OnErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OnErrorPolicy::AbortStatement => "ABORT_STATEMENT",
            OnErrorPolicy::SkipFile => "SKIP_FILE",
            OnErrorPolicy::Continue => "CONTINUE",
        };
        f.write_str(s)
    }
}

/// Error returned when parsing an unknown policy name.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(display(
    "Unknown on-error policy {value:?} (expected ABORT_STATEMENT, SKIP_FILE or CONTINUE)"
))]
pub struct ParseOnErrorPolicyError {
    value: String,
}

impl FromStr for OnErrorPolicy {
    type Err = ParseOnErrorPolicyError;

    /// Accepts `SKIP_FILE`, `skip_file` and `skip-file` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "ABORT_STATEMENT" => Ok(OnErrorPolicy::AbortStatement),
            "SKIP_FILE" => Ok(OnErrorPolicy::SkipFile),
            "CONTINUE" => Ok(OnErrorPolicy::Continue),
            _ => ParseOnErrorPolicySnafu { value: s }.fail(),
        }
    }
}

/// Everything a single load needs besides the destination table.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Where the source files live.
    pub stage: StageLocation,
    /// String prefix of the stage paths to load.
    pub prefix: String,
    /// Optional filter on the stage path.
    pub pattern: Option<Regex>,
    /// How file contents are decoded.
    pub format: JsonFileFormat,
    /// How the identifier is cut out of the stage path.
    pub identifier: IdentifierRule,
    /// Per-file error handling.
    pub on_error: OnErrorPolicy,
}

impl LoadRequest {
    /// A request with the default format, identifier rule and `SkipFile`.
    pub fn new(stage: StageLocation, prefix: impl Into<String>) -> Self {
        LoadRequest {
            stage,
            prefix: prefix.into(),
            pattern: None,
            format: JsonFileFormat::default(),
            identifier: IdentifierRule::default(),
            on_error: OnErrorPolicy::default(),
        }
    }

    /// Only load paths matching `pattern`.
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Use a different file format.
    pub fn with_format(mut self, format: JsonFileFormat) -> Self {
        self.format = format;
        self
    }

    /// Use a different identifier rule.
    pub fn with_identifier(mut self, identifier: IdentifierRule) -> Self {
        self.identifier = identifier;
        self
    }

    /// Use a different on-error policy.
    pub fn with_on_error(mut self, on_error: OnErrorPolicy) -> Self {
        self.on_error = on_error;
        self
    }
}

/// A file that did not load cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    /// Stage path of the file.
    pub path: String,
    /// Human-readable cause.
    pub reason: String,
    /// Records kept from this file (non-zero only under `Continue`).
    pub rows_kept: u64,
}

/// Outcome of one load.
///
/// Only the counters are persisted (on the segment); the failure list lives
/// as long as the report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Version committed by this load, or `None` when nothing was written.
    pub version: Option<u64>,
    /// Files considered after prefix and pattern filtering.
    pub files_scanned: u64,
    /// Files parsed without error.
    pub files_loaded: u64,
    /// Files that failed part-way and kept their leading records.
    pub files_partially_loaded: u64,
    /// Files whose contribution was discarded.
    pub files_skipped: u64,
    /// Records produced by the load.
    pub rows_loaded: u64,
    /// Per-file failures, in stage path order.
    pub failures: Vec<FileFailure>,
}

impl LoadReport {
    fn skip(&mut self, path: &str, reason: String) {
        warn!("Skipping {path}: {reason}");
        self.files_skipped += 1;
        self.failures.push(FileFailure {
            path: path.to_string(),
            reason,
            rows_kept: 0,
        });
    }
}

/// Records and report produced by [`collect_records`].
#[derive(Debug)]
pub(crate) struct CollectedLoad {
    pub(crate) records: Vec<StagedRecord>,
    pub(crate) report: LoadReport,
}

/// Enumerate, extract and parse every file named by `request`.
///
/// The full listing is taken before any file is read, so a stage that cannot
/// be listed fails before any work is done. Reading a listed file that has
/// become unreadable is fatal as well; only identifier and parse failures are
/// subject to the on-error policy.
pub(crate) async fn collect_records(request: &LoadRequest) -> Result<CollectedLoad, TableError> {
    let stage_display = request.stage.as_ref().display();

    let listed = storage::list_files(&request.stage, &request.prefix)
        .await
        .context(StorageUnreachableSnafu {
            stage: stage_display.clone(),
        })?;

    debug!(
        "Listed {} file(s) under {stage_display} with prefix {:?}",
        listed.len(),
        request.prefix
    );

    let mut records = Vec::new();
    let mut report = LoadReport::default();

    for file in listed {
        if let Some(pattern) = &request.pattern {
            if !pattern.is_match(&file.path) {
                continue;
            }
        }
        report.files_scanned += 1;

        let vin = match request.identifier.extract(&file.path) {
            Ok(vin) => vin,
            Err(e) if request.on_error == OnErrorPolicy::AbortStatement => {
                return Err(e).context(IdentifierExtractionSnafu);
            }
            Err(e) => {
                report.skip(&file.path, e.to_string());
                continue;
            }
        };

        let bytes = storage::read_all_bytes(request.stage.as_ref(), &file.rel_path)
            .await
            .context(StorageUnreachableSnafu {
                stage: stage_display.clone(),
            })?;

        let ParsedFile { documents, error } = request.format.parse(&file.path, &bytes);

        let parsed_rows = documents.len() as u64;
        let rows = documents.into_iter().map(|doc| StagedRecord::new(vin.clone(), doc));

        match error {
            None => {
                debug!("{}: {parsed_rows} document(s) as {vin:?}", file.path);
                report.files_loaded += 1;
                records.extend(rows);
            }
            Some(e) => match request.on_error {
                OnErrorPolicy::AbortStatement => return Err(e).context(FileParseSnafu),
                OnErrorPolicy::SkipFile => report.skip(&file.path, e.to_string()),
                OnErrorPolicy::Continue if parsed_rows == 0 => {
                    report.skip(&file.path, e.to_string())
                }
                OnErrorPolicy::Continue => {
                    warn!("Partially loaded {} ({parsed_rows} row(s) kept): {e}", file.path);
                    report.files_partially_loaded += 1;
                    report.failures.push(FileFailure {
                        path: file.path.clone(),
                        reason: e.to_string(),
                        rows_kept: parsed_rows,
                    });
                    records.extend(rows);
                }
            },
        }
    }

    report.rows_loaded = records.len() as u64;
    info!(
        "Collected {} row(s) from {} file(s) ({} skipped, {} partial) under {stage_display}",
        report.rows_loaded,
        report.files_scanned,
        report.files_skipped,
        report.files_partially_loaded
    );

    Ok(CollectedLoad { records, report })
}
