//! Staged records and their JSON-Lines segment encoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of a staging table.
///
/// `vin` comes from the source file's path and is never checked against
/// anything inside `raw_json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedRecord {
    /// Identifier extracted from the stage path.
    pub vin: String,
    /// Full parsed document.
    pub raw_json: Value,
}

impl StagedRecord {
    /// Build a record.
    pub fn new(vin: impl Into<String>, raw_json: Value) -> Self {
        StagedRecord {
            vin: vin.into(),
            raw_json,
        }
    }
}

/// Encode records as JSON Lines (one compact object per line).
pub fn encode_segment(records: &[StagedRecord]) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.push(b'\n');
    }
    Ok(out)
}

/// Decode a JSON-Lines segment. Blank lines are ignored.
///
/// On failure returns the 1-based line number together with the error.
pub fn decode_segment(text: &str) -> Result<Vec<StagedRecord>, (usize, serde_json::Error)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| serde_json::from_str(line).map_err(|e| (idx + 1, e)))
        .collect()
}
