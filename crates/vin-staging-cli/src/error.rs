use vin_staging_core::{TableError, storage::StorageError};

use snafu::Snafu;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("Invalid location {path}: {source}"))]
    Storage { path: String, source: StorageError },

    #[snafu(display("Invalid --pattern '{pattern}': {source}"))]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[snafu(display(
        "Failed to create staging table at {table}: {source}. \
         Pass --if-not-exists or --replace to reuse an existing table."
    ))]
    CreateTable {
        table: String,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display(
        "Failed to open staging table at {table}: {source}. \
         Run `vinstage create` first."
    ))]
    OpenTable {
        table: String,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display("Load into {table} failed: {source}"))]
    Load {
        table: String,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display("Scan of {table} failed: {source}"))]
    Scan {
        table: String,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display("Failed to render record: {source}"))]
    Render { source: serde_json::Error },
}
