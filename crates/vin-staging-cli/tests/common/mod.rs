#![allow(dead_code)]

use std::path::{Path, PathBuf};

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub const NHTSA_PREFIX: &str = "s3/nhtsa/json_pl/";

pub fn write_stage_file(stage: &Path, rel: &str, contents: &str) -> TestResult {
    let abs = stage.join(rel);
    if let Some(parent) = abs.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(abs, contents)?;
    Ok(())
}

/// A stage with two decodable NHTSA responses and one truncated download.
pub fn write_nhtsa_stage(stage: &Path) -> TestResult {
    write_stage_file(
        stage,
        "s3/nhtsa/json_pl/1HGCM82633A004352.json",
        r#"{"Count":1,"Results":[{"Make":"HONDA","ModelYear":"2003"}]}"#,
    )?;
    write_stage_file(
        stage,
        "s3/nhtsa/json_pl/5YJSA1E26HF000001.json",
        r#"{"Count":1,"Results":[{"Make":"TESLA","ModelYear":"2017"}]}"#,
    )?;
    write_stage_file(
        stage,
        "s3/nhtsa/json_pl/3VWDX7AJ5DM000003.json",
        r#"{"Count":1,"Results":[{"Make":"VOLKS"#,
    )?;
    Ok(())
}

pub fn table_root(tmp: &tempfile::TempDir, name: &str) -> PathBuf {
    tmp.path().join(name)
}

pub fn stage_root(tmp: &tempfile::TempDir) -> PathBuf {
    tmp.path().join("stage")
}
