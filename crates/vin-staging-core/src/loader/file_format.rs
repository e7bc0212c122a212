//! JSON file-format configuration and per-file document parsing.
//!
//! By default a source file holds exactly one JSON document and yields
//! exactly one record. An empty file, or anything after the first value, is a
//! parse failure. Concatenated or newline-delimited documents are only read
//! when [`JsonFileFormat::multiple_documents`] is set.
//!
//! Parsing never panics and never aborts the batch on its own: it returns
//! the documents read so far together with the error that stopped it, and
//! the caller's on-error policy decides what to keep.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::prelude::*;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// How source files are decoded into documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonFileFormat {
    /// Split a top-level array into one document per element.
    #[serde(default)]
    pub strip_outer_array: bool,

    /// Read every concatenated or newline-delimited value in the file
    /// instead of requiring exactly one.
    #[serde(default)]
    pub multiple_documents: bool,

    /// Keep a leading UTF-8 byte order mark instead of ignoring it.
    #[serde(default)]
    pub keep_byte_order_mark: bool,
}

/// Why a file's contents could not be (fully) parsed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FileParseError {
    /// The file is not valid UTF-8.
    #[snafu(display("{path}: invalid UTF-8 at byte {}", source.valid_up_to()))]
    InvalidUtf8 {
        /// Stage path of the file.
        path: String,
        /// Underlying decoding error.
        source: std::str::Utf8Error,
    },

    /// The file is empty or holds only whitespace.
    #[snafu(display("{path}: file contains no JSON document"))]
    EmptyFile {
        /// Stage path of the file.
        path: String,
    },

    /// The file is not well-formed JSON.
    #[snafu(display(
        "{path}: malformed JSON after {documents_read} document(s) at line {}, column {}: {source}",
        source.line(),
        source.column()
    ))]
    MalformedJson {
        /// Stage path of the file.
        path: String,
        /// Documents successfully read before the error.
        documents_read: usize,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Something follows the single document the file may hold.
    #[snafu(display("{path}: unexpected content after the JSON document at byte {offset}"))]
    TrailingContent {
        /// Stage path of the file.
        path: String,
        /// Byte offset where the extra content begins.
        offset: usize,
    },
}

/// Result of parsing one file.
#[derive(Debug)]
pub struct ParsedFile {
    /// Documents read before any error, in file order.
    pub documents: Vec<Value>,
    /// The error that stopped parsing, if any.
    pub error: Option<FileParseError>,
}

impl ParsedFile {
    fn failed(error: FileParseError) -> Self {
        ParsedFile {
            documents: Vec::new(),
            error: Some(error),
        }
    }

    /// True when the whole file was read without error.
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}

impl JsonFileFormat {
    /// Parse `bytes` (the contents of the stage file at `path`).
    pub fn parse(&self, path: &str, bytes: &[u8]) -> ParsedFile {
        let bytes = if self.keep_byte_order_mark {
            bytes
        } else {
            bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
        };

        let text = match std::str::from_utf8(bytes).context(InvalidUtf8Snafu { path }) {
            Ok(text) => text,
            Err(e) => return ParsedFile::failed(e),
        };

        if text.trim().is_empty() {
            return ParsedFile::failed(FileParseError::EmptyFile {
                path: path.to_string(),
            });
        }

        let mut documents = Vec::new();
        let mut error = None;
        let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();

        while let Some(item) = stream.next() {
            match item {
                Ok(Value::Array(elements)) if self.strip_outer_array => documents.extend(elements),
                Ok(doc) => documents.push(doc),
                Err(source) => {
                    error = Some(FileParseError::MalformedJson {
                        path: path.to_string(),
                        documents_read: documents.len(),
                        source,
                    });
                    break;
                }
            }

            if !self.multiple_documents {
                let offset = stream.byte_offset();
                let rest = text.get(offset..).unwrap_or_default();
                if !rest.trim().is_empty() {
                    let offset = offset + (rest.len() - rest.trim_start().len());
                    error = Some(FileParseError::TrailingContent {
                        path: path.to_string(),
                        offset,
                    });
                }
                break;
            }
        }

        ParsedFile { documents, error }
    }
}
