//! Staging table schema definition and load-target checks.
//!
//! The staging table has exactly two columns, in this order:
//!
//! | column     | type       |
//! |------------|------------|
//! | `vin`      | `CHAR(17)` |
//! | `raw_json` | `VARIANT`  |
//!
//! Loads insert into those two columns, so before any file is read the
//! loader verifies the table still offers a compatible target.

use snafu::prelude::*;

use crate::{
    identifier::{IdentifierRule, VIN_LENGTH},
    transaction_log::{ColumnDef, ColumnType, TableMeta, TableSchema},
};

/// Name of the identifier column.
pub const VIN_COLUMN: &str = "vin";

/// Name of the payload column.
pub const RAW_JSON_COLUMN: &str = "raw_json";

/// Default table name.
pub const DEFAULT_TABLE_NAME: &str = "vin_staging";

/// The two-column staging schema: `(vin CHAR(17), raw_json VARIANT)`.
pub fn staging_schema() -> TableSchema {
    TableSchema::new_unchecked(vec![
        ColumnDef::new(
            VIN_COLUMN,
            ColumnType::FixedChar {
                length: VIN_LENGTH as u32,
            },
        ),
        ColumnDef::new(RAW_JSON_COLUMN, ColumnType::Variant),
    ])
}

/// Metadata for a new staging table called `name`.
pub fn staging_table_meta(name: impl Into<String>) -> TableMeta {
    TableMeta::new(name, staging_schema())
}

/// Why a table cannot accept `(vin, raw_json)` inserts.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum LoadTargetError {
    /// A target column is missing.
    #[snafu(display("Column {column:?} does not exist"))]
    MissingColumn {
        /// Name of the missing column.
        column: String,
    },

    /// A target column has an incompatible type.
    #[snafu(display("Column {column:?} is {found}, expected {expected}"))]
    IncompatibleType {
        /// Name of the column.
        column: String,
        /// Declared type.
        found: ColumnType,
        /// Description of what the loader needs.
        expected: String,
    },

    /// A column outside the load target cannot be left empty.
    #[snafu(display("Column {column:?} is NOT NULL but is not populated by loads"))]
    UnpopulatedRequiredColumn {
        /// Name of the column.
        column: String,
    },
}

/// Check that `schema` can receive records produced with `rule`.
///
/// - `vin` must be `CHAR(n)` with `n` at least the rule's length.
/// - `raw_json` must be `VARIANT`.
/// - Every other column must be nullable.
pub fn ensure_load_target(
    schema: &TableSchema,
    rule: &IdentifierRule,
) -> Result<(), LoadTargetError> {
    let (_, vin) = schema.column(VIN_COLUMN).context(MissingColumnSnafu {
        column: VIN_COLUMN,
    })?;
    match vin.column_type {
        ColumnType::FixedChar { length } if length as usize >= rule.length() => {}
        found => {
            return IncompatibleTypeSnafu {
                column: VIN_COLUMN,
                found,
                expected: format!("CHAR(n) with n >= {}", rule.length()),
            }
            .fail();
        }
    }

    let (_, raw) = schema.column(RAW_JSON_COLUMN).context(MissingColumnSnafu {
        column: RAW_JSON_COLUMN,
    })?;
    ensure!(
        raw.column_type == ColumnType::Variant,
        IncompatibleTypeSnafu {
            column: RAW_JSON_COLUMN,
            found: raw.column_type,
            expected: "VARIANT".to_string(),
        }
    );

    if let Some(col) = schema
        .columns()
        .iter()
        .find(|c| c.name != VIN_COLUMN && c.name != RAW_JSON_COLUMN && !c.nullable)
    {
        return UnpopulatedRequiredColumnSnafu {
            column: col.name.clone(),
        }
        .fail();
    }

    Ok(())
}
