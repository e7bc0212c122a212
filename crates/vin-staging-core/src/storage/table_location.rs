//! Table root location newtype.

use std::path::PathBuf;

use crate::storage::{StorageLocation, StorageResult};

/// Table root location with table-scoped semantics.
///
/// Wraps a [`StorageLocation`] that holds the commit log and data segments
/// of one staging table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLocation(StorageLocation);

impl From<TableLocation> for StorageLocation {
    fn from(t: TableLocation) -> Self {
        t.0
    }
}

impl AsRef<StorageLocation> for TableLocation {
    fn as_ref(&self) -> &StorageLocation {
        &self.0
    }
}

impl TableLocation {
    /// Creates a new `TableLocation` for a local filesystem path.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        TableLocation(StorageLocation::Local(root.into()))
    }

    /// Parse a user-facing table location string.
    pub fn parse(spec: &str) -> StorageResult<Self> {
        StorageLocation::parse(spec).map(TableLocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_wraps_local_path() {
        let loc = TableLocation::parse("file:///var/lib/vin_staging").expect("valid location");
        assert_eq!(loc, TableLocation::local("/var/lib/vin_staging"));
        assert_eq!(
            StorageLocation::from(loc),
            StorageLocation::Local(PathBuf::from("/var/lib/vin_staging"))
        );
    }
}
