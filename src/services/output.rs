//! Output directory planning and the marker files written beside each output.

use crate::{Error, Result, ToolError};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Hex content hash of the input, written after a successful decompile.
pub const HASH_FILE: &str = "hash.txt";
/// Diagnostics of a decompiler failure that did not abort the run.
pub const FAILURE_LOG: &str = "decompile-failure.log";
/// Note left for a file skipped as a content duplicate.
pub const IGNORED_LOG: &str = "ignored.log";

/// Map an input file to its own output directory.
///
/// The result is `output_root` joined with the file's path relative to
/// `search_root`, so the output tree mirrors the input tree and files with the
/// same name in different directories never share a directory. Root, prefix
/// and `..` components are dropped so the result always stays under
/// `output_root`.
#[must_use]
pub fn resolve_output_dir(search_root: &Path, file: &Path, output_root: &Path) -> PathBuf {
    let relative = file.strip_prefix(search_root).unwrap_or(file);

    let mut out = output_root.to_path_buf();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            out.push(part);
        }
    }
    out
}

/// Create `dir` and any missing parents. Succeeds if it already exists.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }

    builder.create(dir).map_err(|source| Error::Setup {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_marker(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options
        .open(&path)
        .and_then(|mut file| file.write_all(contents.as_bytes()))
        .map_err(|source| Error::Report { path, source })
}

pub fn write_hash_marker(dir: &Path, hash: &str) -> Result<()> {
    write_marker(dir, HASH_FILE, &format!("{hash}\n"))
}

pub fn write_failure_log(dir: &Path, err: &ToolError) -> Result<()> {
    write_marker(dir, FAILURE_LOG, &err.to_string())
}

pub fn write_ignored_log(dir: &Path, first_seen_at: &Path, hash: &str) -> Result<()> {
    write_marker(
        dir,
        IGNORED_LOG,
        &format!(
            "file has already been seen at '{}', hash of file is {hash}\n",
            first_seen_at.display()
        ),
    )
}
