//! Loading a stage into a staging table.

use chrono::Utc;
use log::info;
use snafu::prelude::*;

use crate::{
    loader::{CollectedLoad, LoadReport, LoadRequest, collect_records},
    record::encode_segment,
    schema::ensure_load_target,
    storage::{self, layout},
    table::{
        StagingTable,
        error::{SchemaMismatchSnafu, SerializeSnafu, StorageSnafu, TableError, TransactionLogSnafu},
    },
    transaction_log::{LogAction, SegmentMeta, segments::segment_id_v1},
};

impl StagingTable {
    /// Load every file named by `request` into this table.
    ///
    /// Steps:
    /// 1) Check the table can take `(vin, raw_json)` rows for the request's
    ///    identifier rule.
    /// 2) List, extract and parse the stage under the on-error policy.
    /// 3) If any rows were produced, write them as one new segment and commit
    ///    a single `AddSegment` with OCC on the current version.
    /// 4) Update in-memory state.
    ///
    /// A load with zero rows commits nothing and returns a report whose
    /// `version` is `None`. Loading the same files twice stores every record
    /// twice. If the commit fails the segment file is left behind
    /// unreferenced.
    pub async fn load(&mut self, request: &LoadRequest) -> Result<LoadReport, TableError> {
        ensure_load_target(&self.state.table_meta.schema, &request.identifier).context(
            SchemaMismatchSnafu {
                table: self.state.table_meta.name.clone(),
            },
        )?;

        let CollectedLoad {
            records,
            mut report,
        } = collect_records(request).await?;

        if records.is_empty() {
            info!(
                "Nothing to load into {:?}: {} file(s) scanned, {} skipped",
                self.state.table_meta.name, report.files_scanned, report.files_skipped
            );
            return Ok(report);
        }

        let expected_version = self.state.version;
        let bytes = encode_segment(&records).context(SerializeSnafu)?;

        let segment_id = segment_id_v1(expected_version.saturating_add(1), &bytes);
        let rel_path = layout::segment_rel_path(&segment_id);

        storage::write_new(self.location.as_ref(), &rel_path, &bytes)
            .await
            .context(StorageSnafu)?;

        let segment_meta = SegmentMeta {
            segment_id,
            path: layout::to_log_path(&rel_path),
            row_count: report.rows_loaded,
            files_loaded: report.files_loaded + report.files_partially_loaded,
            files_skipped: report.files_skipped,
            loaded_at: Utc::now(),
        };

        let new_version = self
            .log
            .commit_with_expected_version(
                expected_version,
                vec![LogAction::AddSegment(segment_meta.clone())],
            )
            .await
            .context(TransactionLogSnafu)?;

        self.state.version = new_version;
        self.state.segments.push(segment_meta);
        report.version = Some(new_version);

        info!(
            "Loaded {} row(s) into {:?} at version {new_version} ({} file(s) skipped)",
            report.rows_loaded, self.state.table_meta.name, report.files_skipped
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        identifier::IdentifierRule,
        loader::OnErrorPolicy,
        schema::staging_table_meta,
        storage::{StageLocation, TableLocation},
        table::CreateMode,
        transaction_log::{ColumnDef, ColumnType, TableMeta, TableSchema},
    };
    use std::path::Path;
    use tempfile::TempDir;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn put(root: &Path, rel: &str, contents: &[u8]) -> std::io::Result<()> {
        let abs = root.join(rel);
        if let Some(parent) = abs.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(abs, contents)
    }

    async fn fresh_table(root: &Path) -> Result<StagingTable, TableError> {
        StagingTable::create(
            TableLocation::local(root),
            staging_table_meta("vin_staging"),
            CreateMode::default(),
        )
        .await
    }

    #[tokio::test]
    async fn load_writes_one_segment_and_one_commit() -> TestResult {
        let table_dir = TempDir::new()?;
        let stage_dir = TempDir::new()?;
        put(stage_dir.path(), "s3/nhtsa/json_pl/1HGCM82633A004352.json", br#"{"make":"Honda"}"#)?;
        put(stage_dir.path(), "s3/nhtsa/json_pl/5YJSA1E26HF000001.json", br#"{"make":"Tesla"}"#)?;

        let mut table = fresh_table(table_dir.path()).await?;
        let request = LoadRequest::new(StageLocation::local(stage_dir.path()), "s3/nhtsa/json_pl/");
        let report = table.load(&request).await?;

        assert_eq!(report.version, Some(2));
        assert_eq!(report.rows_loaded, 2);
        assert_eq!(table.state().segments.len(), 1);

        let seg = &table.state().segments[0];
        assert!(seg.path.starts_with("data/seg-"));
        assert!(seg.path.ends_with(".jsonl"));
        assert_eq!(seg.row_count, 2);
        assert_eq!(seg.files_loaded, 2);
        assert!(table_dir.path().join(&seg.path).is_file());

        let reopened = StagingTable::open(TableLocation::local(table_dir.path())).await?;
        assert_eq!(reopened.state(), table.state());
        Ok(())
    }

    #[tokio::test]
    async fn zero_row_load_commits_nothing() -> TestResult {
        let table_dir = TempDir::new()?;
        let stage_dir = TempDir::new()?;
        put(stage_dir.path(), "s3/nhtsa/json_pl/1HGCM82633A004352.json", b"{broken")?;

        let mut table = fresh_table(table_dir.path()).await?;
        let request = LoadRequest::new(StageLocation::local(stage_dir.path()), "s3/nhtsa/json_pl/");
        let report = table.load(&request).await?;

        assert_eq!(report.version, None);
        assert_eq!(report.files_skipped, 1);
        assert_eq!(table.version(), 1);
        assert!(!table_dir.path().join("data").exists());
        Ok(())
    }

    #[tokio::test]
    async fn abort_statement_leaves_table_untouched() -> TestResult {
        let table_dir = TempDir::new()?;
        let stage_dir = TempDir::new()?;
        put(stage_dir.path(), "s3/nhtsa/json_pl/1HGCM82633A004352.json", b"{}")?;
        put(stage_dir.path(), "s3/nhtsa/json_pl/2HGCM82633A004353.json", b"[1,")?;

        let mut table = fresh_table(table_dir.path()).await?;
        let request = LoadRequest::new(StageLocation::local(stage_dir.path()), "s3/nhtsa/json_pl/")
            .with_on_error(OnErrorPolicy::AbortStatement);
        let err = table.load(&request).await.expect_err("abort");

        assert!(matches!(err, TableError::FileParse { .. }));
        assert_eq!(table.version(), 1);
        assert_eq!(table.row_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn narrow_vin_column_is_schema_mismatch() -> TestResult {
        let table_dir = TempDir::new()?;
        let stage_dir = TempDir::new()?;
        let schema = TableSchema::new(vec![
            ColumnDef::new("vin", ColumnType::FixedChar { length: 8 }),
            ColumnDef::new("raw_json", ColumnType::Variant),
        ])?;
        let mut table = StagingTable::create(
            TableLocation::local(table_dir.path()),
            TableMeta::new("narrow", schema),
            CreateMode::default(),
        )
        .await?;

        let request = LoadRequest::new(StageLocation::local(stage_dir.path()), "")
            .with_identifier(IdentifierRule::default());
        let err = table.load(&request).await.expect_err("mismatch");
        assert!(matches!(err, TableError::SchemaMismatch { .. }));
        Ok(())
    }
}
