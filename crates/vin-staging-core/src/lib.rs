//! Core engine for a path-keyed VIN staging table.
//!
//! This crate provides the pieces behind `vinstage`:
//!
//! - A staging table with a fixed two-column schema,
//!   `(vin CHAR(17), raw_json VARIANT)` (`schema` module).
//! - An append-only JSON metadata log with version-guard optimistic
//!   concurrency control (`transaction_log` module).
//! - A local stage abstraction that lists files under a prefix
//!   (`storage` module).
//! - Identifier rules that cut a VIN out of a file's stage path
//!   (`identifier` module).
//! - A bulk loader that pairs every JSON document in a stage with the VIN of
//!   its path, skipping files that fail to parse (`loader` module).
//! - A `StagingTable` type tying it together (`table` module).
#![deny(missing_docs)]
pub mod identifier;
pub mod loader;
pub mod record;
pub mod schema;
pub mod storage;
pub mod table;
pub mod transaction_log;

pub use identifier::{IdentifierError, IdentifierRule};
pub use loader::{FileFailure, JsonFileFormat, LoadReport, LoadRequest, OnErrorPolicy};
pub use record::StagedRecord;
pub use storage::{StageLocation, TableLocation};
pub use table::{CreateMode, StagingTable, TableError};
