//! Table-level metadata and the logical column model.
//!
//! A staging table has an ordered list of typed columns. Only two column
//! types exist: a fixed-length character column (`CHAR(n)`) and an opaque
//! semi-structured `VARIANT` column holding any JSON value.
use std::{collections::HashSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Current table format version.
pub const TABLE_FORMAT_VERSION: u32 = 1;

/// Logical type of a staging column.
///
/// JSON layout examples: `{"FixedChar":{"length":17}}`, `"Variant"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ColumnType {
    /// Character string declared with a fixed maximum length in characters.
    FixedChar {
        /// Declared length in characters.
        length: u32,
    },
    /// Arbitrary semi-structured document.
    Variant,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::FixedChar { length } => write!(f, "CHAR({length})"),
            ColumnType::Variant => write!(f, "VARIANT"),
        }
    }
}

/// One column in a table schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Logical column type.
    pub column_type: ColumnType,
    /// Whether the column allows nulls.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnDef {
    /// A nullable column of the given type.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        ColumnDef {
            name: name.into(),
            column_type,
            nullable: true,
        }
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.column_type)?;
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        Ok(())
    }
}

/// Errors raised when a schema definition is invalid.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum SchemaError {
    /// A schema needs at least one column.
    #[snafu(display("Schema has no columns"))]
    NoColumns,

    /// Column names must be non-empty.
    #[snafu(display("Column at position {position} has an empty name"))]
    EmptyColumnName {
        /// Zero-based position of the column.
        position: usize,
    },

    /// Column names must be unique within a schema.
    #[snafu(display("Duplicate column name {column:?}"))]
    DuplicateColumn {
        /// The repeated column name.
        column: String,
    },

    /// Fixed-length character columns need a positive length.
    #[snafu(display("Column {column:?} declares CHAR(0)"))]
    ZeroLength {
        /// Column with the invalid length.
        column: String,
    },
}

/// Ordered, validated list of columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Vec<ColumnDef>", into = "Vec<ColumnDef>")]
pub struct TableSchema {
    columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Validate and build a schema.
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self, SchemaError> {
        ensure!(!columns.is_empty(), NoColumnsSnafu);

        let mut seen = HashSet::with_capacity(columns.len());
        for (position, col) in columns.iter().enumerate() {
            ensure!(!col.name.is_empty(), EmptyColumnNameSnafu { position });
            ensure!(
                seen.insert(col.name.as_str()),
                DuplicateColumnSnafu {
                    column: col.name.clone()
                }
            );
            if let ColumnType::FixedChar { length: 0 } = col.column_type {
                return ZeroLengthSnafu {
                    column: col.name.clone(),
                }
                .fail();
            }
        }

        Ok(TableSchema { columns })
    }

    /// Build a schema from columns the caller already knows to be valid.
    pub(crate) fn new_unchecked(columns: Vec<ColumnDef>) -> Self {
        debug_assert!(TableSchema::new(columns.clone()).is_ok());
        TableSchema { columns }
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Look up a column by name, returning its position and definition.
    pub fn column(&self, name: &str) -> Option<(usize, &ColumnDef)> {
        self.columns.iter().enumerate().find(|(_, c)| c.name == name)
    }
}

impl TryFrom<Vec<ColumnDef>> for TableSchema {
    type Error = SchemaError;

    fn try_from(columns: Vec<ColumnDef>) -> Result<Self, Self::Error> {
        TableSchema::new(columns)
    }
}

impl From<TableSchema> for Vec<ColumnDef> {
    fn from(schema: TableSchema) -> Self {
        schema.columns
    }
}

impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{col}")?;
        }
        write!(f, ")")
    }
}

/// Table-level metadata recorded by `CreateTable` actions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableMeta {
    /// Logical table name.
    pub name: String,
    /// Ordered column list.
    pub schema: TableSchema,
    /// Creation timestamp, stored as RFC3339 UTC.
    pub created_at: DateTime<Utc>,
    /// Format version for future evolution of the log format.
    pub format_version: u32,
}

impl TableMeta {
    /// Build metadata for a new table with the given schema.
    pub fn new(name: impl Into<String>, schema: TableSchema) -> Self {
        TableMeta {
            name: name.into(),
            schema,
            created_at: Utc::now(),
            format_version: TABLE_FORMAT_VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_rejects_duplicate_columns() {
        let err = TableSchema::new(vec![
            ColumnDef::new("vin", ColumnType::FixedChar { length: 17 }),
            ColumnDef::new("vin", ColumnType::Variant),
        ])
        .expect_err("duplicate names");
        assert_eq!(
            err,
            SchemaError::DuplicateColumn {
                column: "vin".to_string()
            }
        );
    }

    #[test]
    fn schema_rejects_empty_and_zero_length() {
        assert_eq!(TableSchema::new(vec![]), Err(SchemaError::NoColumns));

        let err = TableSchema::new(vec![ColumnDef::new("", ColumnType::Variant)])
            .expect_err("empty name");
        assert_eq!(err, SchemaError::EmptyColumnName { position: 0 });

        let err = TableSchema::new(vec![ColumnDef::new(
            "vin",
            ColumnType::FixedChar { length: 0 },
        )])
        .expect_err("zero length");
        assert!(matches!(err, SchemaError::ZeroLength { .. }));
    }

    #[test]
    fn schema_deserialization_is_validated() {
        let json = r#"[
            {"name": "a", "column_type": "Variant"},
            {"name": "a", "column_type": "Variant"}
        ]"#;
        let res: Result<TableSchema, _> = serde_json::from_str(json);
        assert!(res.is_err());
    }

    #[test]
    fn column_nullable_defaults_to_true() {
        let col: ColumnDef =
            serde_json::from_str(r#"{"name": "raw_json", "column_type": "Variant"}"#)
                .expect("deserialize");
        assert!(col.nullable);
    }

    #[test]
    fn schema_display_reads_like_ddl() {
        let schema = TableSchema::new(vec![
            ColumnDef::new("vin", ColumnType::FixedChar { length: 17 }),
            ColumnDef::new("raw_json", ColumnType::Variant),
        ])
        .expect("valid schema");
        assert_eq!(schema.to_string(), "(vin CHAR(17), raw_json VARIANT)");
    }
}
