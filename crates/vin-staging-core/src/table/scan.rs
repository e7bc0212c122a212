//! Reading staged records back out of a table.

use std::path::Path;

use snafu::prelude::*;

use crate::{
    record::{StagedRecord, decode_segment},
    storage,
    table::{
        StagingTable,
        error::{StorageSnafu, TableError},
    },
};

impl StagingTable {
    /// All live records, in commit order and then file order within a segment.
    pub async fn scan(&self) -> Result<Vec<StagedRecord>, TableError> {
        let mut out = Vec::with_capacity(self.row_count() as usize);

        for segment in &self.state.segments {
            let text = storage::read_to_string(self.location.as_ref(), Path::new(&segment.path))
                .await
                .context(StorageSnafu)?;

            let records =
                decode_segment(&text).map_err(|(line, source)| TableError::CorruptSegment {
                    path: segment.path.clone(),
                    line,
                    source,
                })?;
            out.extend(records);
        }

        Ok(out)
    }

    /// Live records whose `vin` equals `vin` exactly.
    pub async fn scan_vin(&self, vin: &str) -> Result<Vec<StagedRecord>, TableError> {
        let mut records = self.scan().await?;
        records.retain(|r| r.vin == vin);
        Ok(records)
    }
}
