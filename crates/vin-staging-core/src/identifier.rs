//! Deriving record identifiers from source file paths.
//!
//! The identifier of a staged record never comes from the document itself;
//! it is cut out of the path the stage reports for the file. Two rules exist:
//!
//! - [`IdentifierRule::FixedOffset`] takes `length` characters starting at a
//!   fixed 0-based character offset. With the default `start = 17,
//!   length = 17` this is `P[17:34]`, which assumes a 17-character prefix
//!   such as `s3/nhtsa/json_pl/`. It never fails: a different prefix length
//!   silently yields the wrong characters, and a short path yields a
//!   truncated (possibly empty) identifier.
//! - [`IdentifierRule::AfterPrefix`] names the prefix explicitly and takes
//!   `length` characters after it. Paths that do not carry the prefix are
//!   rejected per file instead of producing a wrong identifier.
//!
//! Offsets and lengths count Unicode scalar values, not bytes.

use std::fmt;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Length of a vehicle identification number.
pub const VIN_LENGTH: usize = 17;

/// Default 0-based offset of the VIN inside the stage path.
pub const DEFAULT_VIN_OFFSET: usize = 17;

/// Rule for extracting an identifier from a stage-reported file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierRule {
    /// `length` characters starting at character `start` (0-based).
    FixedOffset {
        /// 0-based character offset.
        start: usize,
        /// Number of characters to take.
        length: usize,
    },
    /// `length` characters immediately after `prefix`.
    AfterPrefix {
        /// Literal prefix every path is expected to start with.
        prefix: String,
        /// Number of characters to take.
        length: usize,
    },
}

impl Default for IdentifierRule {
    fn default() -> Self {
        IdentifierRule::FixedOffset {
            start: DEFAULT_VIN_OFFSET,
            length: VIN_LENGTH,
        }
    }
}

impl fmt::Display for IdentifierRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierRule::FixedOffset { start, length } => {
                write!(f, "path[{start}..{}]", start + length)
            }
            IdentifierRule::AfterPrefix { prefix, length } => {
                write!(f, "{length} chars after {prefix:?}")
            }
        }
    }
}

/// A path could not yield an identifier under the configured rule.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum IdentifierError {
    /// The path does not start with the configured prefix.
    #[snafu(display("Path {path:?} does not start with prefix {prefix:?}"))]
    PrefixMismatch {
        /// The offending path.
        path: String,
        /// The prefix that was expected.
        prefix: String,
    },
}

impl IdentifierRule {
    /// Build the named-prefix rule for VINs.
    pub fn vin_after_prefix(prefix: impl Into<String>) -> Self {
        IdentifierRule::AfterPrefix {
            prefix: prefix.into(),
            length: VIN_LENGTH,
        }
    }

    /// Maximum number of characters this rule can produce.
    pub fn length(&self) -> usize {
        match self {
            IdentifierRule::FixedOffset { length, .. }
            | IdentifierRule::AfterPrefix { length, .. } => *length,
        }
    }

    /// Extract the identifier from `path`.
    pub fn extract(&self, path: &str) -> Result<String, IdentifierError> {
        match self {
            IdentifierRule::FixedOffset { start, length } => Ok(substr(path, *start, *length)),
            IdentifierRule::AfterPrefix { prefix, length } => {
                let rest = path.strip_prefix(prefix.as_str()).context(PrefixMismatchSnafu {
                    path: path.to_string(),
                    prefix: prefix.clone(),
                })?;
                Ok(substr(rest, 0, *length))
            }
        }
    }
}

/// Character-based substring that clamps to the end of the input.
fn substr(s: &str, start: usize, length: usize) -> String {
    s.chars().skip(start).take(length).collect()
}
