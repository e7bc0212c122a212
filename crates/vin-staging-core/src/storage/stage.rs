//! Stage locations and recursive file listing.
//!
//! A stage is a directory tree whose files are loaded into a table. Files are
//! reported by their path relative to the stage root, always with `/`
//! separators (for example `s3/nhtsa/json_pl/1HGCM82633A004352.json`). That
//! string is the "full path as known to the storage layer" that identifier
//! rules operate on.
//!
//! Listing follows object-store prefix semantics: `prefix` is matched as a
//! plain string prefix of the reported path, not as a directory name.

use std::{
    io,
    path::{Component, Path, PathBuf},
};

use log::warn;
use snafu::{Backtrace, prelude::*};
use walkdir::WalkDir;

use crate::storage::{
    BackendError, InvalidPathSnafu, OtherIoSnafu, StorageError, StorageLocation, StorageResult,
    classify_io,
};

/// Root of a set of source files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLocation(StorageLocation);

impl AsRef<StorageLocation> for StageLocation {
    fn as_ref(&self) -> &StorageLocation {
        &self.0
    }
}

impl StageLocation {
    /// Creates a new `StageLocation` for a local directory.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        StageLocation(StorageLocation::Local(root.into()))
    }

    /// Parse a user-facing stage location string.
    pub fn parse(spec: &str) -> StorageResult<Self> {
        StorageLocation::parse(spec).map(StageLocation)
    }
}

/// One file found under a stage prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    /// Path relative to the stage root, `/`-separated. Name components that
    /// are not valid UTF-8 are converted lossily.
    pub path: String,
    /// The same path as it exists on disk; use this to read the file.
    pub rel_path: PathBuf,
}

/// Recursively list every regular file under `prefix` within `stage`.
///
/// - The stage root must exist and be a directory, otherwise this returns
///   [`StorageError::NotFound`] (or `OtherIo` for other failures).
/// - A prefix with `..` or root components is [`StorageError::InvalidPath`].
/// - A prefix that matches nothing yields an empty list.
/// - Any I/O failure during the walk aborts the listing.
/// - Results are sorted by path.
pub async fn list_files(stage: &StageLocation, prefix: &str) -> StorageResult<Vec<ListedFile>> {
    ensure!(
        Path::new(prefix)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir)),
        InvalidPathSnafu { path: prefix }
    );

    match stage.as_ref() {
        StorageLocation::Local(root) => {
            let root = root.clone();
            let root_str = root.display().to_string();
            let prefix = prefix.to_string();

            tokio::task::spawn_blocking(move || list_local_files(&root, &prefix))
                .await
                .map_err(|e| BackendError::Local(io::Error::other(e)))
                .context(OtherIoSnafu { path: root_str })?
        }
    }
}

fn list_local_files(root: &Path, prefix: &str) -> StorageResult<Vec<ListedFile>> {
    let root_str = root.display().to_string();
    let meta = std::fs::metadata(root).map_err(|e| classify_io(root_str.clone(), e))?;
    if !meta.is_dir() {
        return Err(StorageError::NotFound {
            path: root_str,
            source: BackendError::Local(io::Error::other("stage root is not a directory")),
            backtrace: Backtrace::capture(),
        });
    }

    // Walk from the deepest directory named by the prefix; the remainder is
    // matched against file paths below.
    let walk_root = match prefix.rfind('/') {
        Some(idx) if idx > 0 => root.join(&prefix[..idx]),
        _ => root.to_path_buf(),
    };

    match std::fs::metadata(&walk_root) {
        Ok(m) if m.is_dir() => {}
        Ok(_) => return Ok(Vec::new()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(classify_io(walk_root.display().to_string(), e)),
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&walk_root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| walk_root.display().to_string());
                return Err(BackendError::Local(io::Error::from(e))).context(OtherIoSnafu { path });
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let path = to_stage_path(rel);
        if !path.starts_with(prefix) {
            continue;
        }
        if rel.to_str().is_none() {
            warn!("Stage file {path:?} has a non-UTF-8 name");
        }

        files.push(ListedFile {
            path,
            rel_path: rel.to_path_buf(),
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn to_stage_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn touch(root: &Path, rel: &str, contents: &str) -> io::Result<()> {
        let abs = root.join(rel);
        if let Some(parent) = abs.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(abs, contents)
    }

    #[tokio::test]
    async fn lists_recursively_with_slash_paths_sorted() -> TestResult {
        let tmp = TempDir::new()?;
        touch(tmp.path(), "s3/nhtsa/json_pl/B.json", "{}")?;
        touch(tmp.path(), "s3/nhtsa/json_pl/A.json", "{}")?;
        touch(tmp.path(), "s3/nhtsa/json_pl/2024/C.json", "{\"x\":1}")?;
        touch(tmp.path(), "s3/other/D.json", "{}")?;

        let stage = StageLocation::local(tmp.path());
        let files = list_files(&stage, "s3/nhtsa/json_pl/").await?;
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();

        assert_eq!(
            paths,
            vec![
                "s3/nhtsa/json_pl/2024/C.json",
                "s3/nhtsa/json_pl/A.json",
                "s3/nhtsa/json_pl/B.json",
            ]
        );
        assert_eq!(files[0].rel_path, Path::new("s3/nhtsa/json_pl/2024/C.json"));
        Ok(())
    }

    #[tokio::test]
    async fn prefix_is_a_string_prefix_not_a_directory() -> TestResult {
        let tmp = TempDir::new()?;
        touch(tmp.path(), "raw/json_pl/a.json", "{}")?;
        touch(tmp.path(), "raw/json_other/b.json", "{}")?;

        let stage = StageLocation::local(tmp.path());
        let files = list_files(&stage, "raw/json_p").await?;

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "raw/json_pl/a.json");
        Ok(())
    }

    #[tokio::test]
    async fn empty_prefix_lists_the_whole_stage() -> TestResult {
        let tmp = TempDir::new()?;
        touch(tmp.path(), "a.json", "{}")?;
        touch(tmp.path(), "nested/b.json", "{}")?;

        let files = list_files(&StageLocation::local(tmp.path()), "").await?;
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn missing_prefix_directory_yields_no_files() -> TestResult {
        let tmp = TempDir::new()?;
        let files = list_files(&StageLocation::local(tmp.path()), "nope/nothing/").await?;
        assert!(files.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_stage_root_is_not_found() -> TestResult {
        let tmp = TempDir::new()?;
        let stage = StageLocation::local(tmp.path().join("does-not-exist"));

        let err = list_files(&stage, "").await.expect_err("missing root");
        assert!(matches!(err, StorageError::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn stage_root_that_is_a_file_is_not_found() -> TestResult {
        let tmp = TempDir::new()?;
        touch(tmp.path(), "plain.json", "{}")?;
        let stage = StageLocation::local(tmp.path().join("plain.json"));

        let err = list_files(&stage, "").await.expect_err("file root");
        assert!(matches!(err, StorageError::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn prefix_leaving_the_root_is_rejected() -> TestResult {
        let tmp = TempDir::new()?;
        touch(tmp.path(), "outside/secret.json", "{}")?;
        let stage = StageLocation::local(tmp.path().join("stage"));
        std::fs::create_dir_all(tmp.path().join("stage"))?;

        for prefix in ["../", "../outside/", "s3/../../outside", "/etc/"] {
            let err = list_files(&stage, prefix).await.expect_err("escaping prefix");
            assert!(
                matches!(err, StorageError::InvalidPath { .. }),
                "{prefix}: {err:?}"
            );
        }
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn non_utf8_names_keep_their_on_disk_path() -> TestResult {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let tmp = TempDir::new()?;
        let dir = tmp.path().join("s3/nhtsa/json_pl");
        std::fs::create_dir_all(&dir)?;
        let name = OsStr::from_bytes(b"5YJSA1E26HF000001\xff.json");
        std::fs::write(dir.join(name), "{}")?;

        let files = list_files(&StageLocation::local(tmp.path()), "s3/").await?;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "s3/nhtsa/json_pl/5YJSA1E26HF000001\u{FFFD}.json");
        assert_eq!(files[0].rel_path, Path::new("s3/nhtsa/json_pl").join(name));
        Ok(())
    }
}
