//! Storage backend and path utilities.
//!
//! This module centralizes all filesystem access for `vin-staging-core`:
//!
//! - [`StorageLocation`] is the backend-level root that every relative path
//!   is resolved against.
//! - [`TableLocation`] wraps a location that holds a staging table (commit
//!   log plus data segments).
//! - [`StageLocation`] wraps a location whose files are enumerated and read
//!   by the loader.
//! - Small helpers for atomic writes (write-then-rename), create-new writes
//!   used by the commit protocol, whole-file reads, and recursive listing.
//!
//! Only the local filesystem is supported, but callers never touch paths
//! directly so another backend can be slotted in behind the same functions.

pub mod layout;
pub mod stage;
pub mod table_location;

pub use stage::{ListedFile, StageLocation, list_files};
pub use table_location::TableLocation;

use snafu::{Backtrace, prelude::*};
use std::{
    error::Error,
    fmt, io,
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
};

/// General result type used by storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Backend-level root for relative paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageLocation {
    /// A directory on the local filesystem.
    Local(PathBuf),
}

impl StorageLocation {
    /// Parse a user-facing location string.
    ///
    /// Only local paths are accepted; an optional `file://` scheme is stripped.
    pub fn parse(spec: &str) -> StorageResult<Self> {
        let trimmed = spec.trim();
        let raw = trimmed.strip_prefix("file://").unwrap_or(trimmed);
        if raw.is_empty() {
            return Err(StorageError::NotFound {
                path: spec.to_string(),
                source: BackendError::Local(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "empty location",
                )),
                backtrace: Backtrace::capture(),
            });
        }
        Ok(StorageLocation::Local(PathBuf::from(raw)))
    }

    /// Display form of the root, used in error messages and logs.
    pub fn display(&self) -> String {
        match self {
            StorageLocation::Local(root) => root.display().to_string(),
        }
    }
}

/// Errors produced by the storage backend implementation.
///
/// Backend-specific I/O errors are wrapped here so higher layers can map them
/// into [`StorageError`] variants with additional context.
#[derive(Debug)]
pub enum BackendError {
    /// A local filesystem I/O error.
    Local(io::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Local(e) => write!(f, "local I/O error: {e}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BackendError::Local(e) => Some(e),
        }
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    /// The specified path was not found.
    #[snafu(display("Path not found: {path}"))]
    NotFound {
        /// The path that was not found.
        path: String,
        /// Underlying backend error that caused the failure.
        source: BackendError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The specified path already exists when creation was requested with
    /// create-new semantics.
    #[snafu(display("Path already exists: {path}"))]
    AlreadyExists {
        /// The path that was found to already exist.
        path: String,
        /// Underlying backend error that indicates the existing resource.
        source: BackendError,
        /// The backtrace captured when the error occurred.
        backtrace: Backtrace,
    },

    /// Any other I/O error on the backend.
    #[snafu(display("Local I/O error at {path}: {source}"))]
    OtherIo {
        /// The path where the I/O error occurred.
        path: String,
        /// Underlying backend I/O error with platform-specific details.
        source: BackendError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// A relative path would resolve outside the storage root.
    #[snafu(display("Path {path:?} escapes the storage root"))]
    InvalidPath {
        /// The rejected relative path.
        path: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

/// Classify an `io::Error` into the matching `StorageError` variant.
pub(crate) fn classify_io(path: String, e: io::Error) -> StorageError {
    let kind = e.kind();
    let source = BackendError::Local(e);
    let backtrace = Backtrace::capture();
    match kind {
        io::ErrorKind::NotFound => StorageError::NotFound {
            path,
            source,
            backtrace,
        },
        io::ErrorKind::AlreadyExists => StorageError::AlreadyExists {
            path,
            source,
            backtrace,
        },
        _ => StorageError::OtherIo {
            path,
            source,
            backtrace,
        },
    }
}

fn join_local(location: &StorageLocation, rel: &Path) -> PathBuf {
    match location {
        StorageLocation::Local(root) => root.join(rel),
    }
}

async fn create_parent_dir(abs: &Path) -> StorageResult<()> {
    if let Some(parent) = abs.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(BackendError::Local)
            .context(OtherIoSnafu {
                path: parent.display().to_string(),
            })?;
    }
    Ok(())
}

/// Removes a temporary file on drop unless disarmed.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Write `contents` to `rel_path` inside `location` using an atomic write.
///
/// The payload goes to a temporary sibling file which is synced and then
/// renamed over the target, so readers see either the old or the new
/// contents and never a torn write. Parent directories are created.
pub async fn write_atomic(
    location: &StorageLocation,
    rel_path: &Path,
    contents: &[u8],
) -> StorageResult<()> {
    let abs = join_local(location, rel_path);
    create_parent_dir(&abs).await?;

    let tmp_path = abs.with_extension("tmp");
    let mut guard = TempFileGuard::new(tmp_path.clone());
    let tmp_str = tmp_path.display().to_string();

    {
        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(BackendError::Local)
            .context(OtherIoSnafu {
                path: tmp_str.clone(),
            })?;

        file.write_all(contents)
            .await
            .map_err(BackendError::Local)
            .context(OtherIoSnafu {
                path: tmp_str.clone(),
            })?;

        file.sync_all()
            .await
            .map_err(BackendError::Local)
            .context(OtherIoSnafu { path: tmp_str })?;
    }

    fs::rename(&tmp_path, &abs)
        .await
        .map_err(BackendError::Local)
        .context(OtherIoSnafu {
            path: abs.display().to_string(),
        })?;

    guard.disarm();
    Ok(())
}

/// Create a *new* file at `rel_path` and write `contents`, failing with
/// [`StorageError::AlreadyExists`] if the file is already there.
///
/// Used for commit files and data segments, which are written exactly once.
pub async fn write_new(
    location: &StorageLocation,
    rel_path: &Path,
    contents: &[u8],
) -> StorageResult<()> {
    let abs = join_local(location, rel_path);
    create_parent_dir(&abs).await?;

    let path_str = abs.display().to_string();

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&abs)
        .await
        .map_err(|e| classify_io(path_str.clone(), e))?;

    file.write_all(contents)
        .await
        .map_err(BackendError::Local)
        .context(OtherIoSnafu {
            path: path_str.clone(),
        })?;

    file.sync_all()
        .await
        .map_err(BackendError::Local)
        .context(OtherIoSnafu { path: path_str })?;

    Ok(())
}

/// Read the file at `rel_path` within `location` as UTF-8 text.
///
/// A missing file is reported as [`StorageError::NotFound`].
pub async fn read_to_string(location: &StorageLocation, rel_path: &Path) -> StorageResult<String> {
    let abs = join_local(location, rel_path);
    fs::read_to_string(&abs)
        .await
        .map_err(|e| classify_io(abs.display().to_string(), e))
}

/// Read the full contents of the file at `rel_path` within `location`.
///
/// A missing file is reported as [`StorageError::NotFound`].
pub async fn read_all_bytes(location: &StorageLocation, rel_path: &Path) -> StorageResult<Vec<u8>> {
    let abs = join_local(location, rel_path);
    fs::read(&abs)
        .await
        .map_err(|e| classify_io(abs.display().to_string(), e))
}
