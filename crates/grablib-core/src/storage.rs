//! Disk I/O and file lifecycle for downloaded and built outputs.
//!
//! Writes go to a `.part` temp file next to the destination, are synced, then
//! renamed into place so an interrupted run never leaves a truncated output.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{GrabError, Result};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `lib.js` → `lib.js.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Writes `data` to `final_path`, creating parent directories as needed.
pub fn write_atomic(final_path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent).map_err(GrabError::io("create dir", parent))?;
    }
    let tp = temp_path(final_path);
    let mut file = File::create(&tp).map_err(GrabError::io("create", &tp))?;
    file.write_all(data).map_err(GrabError::io("write", &tp))?;
    file.sync_all().map_err(GrabError::io("sync", &tp))?;
    drop(file);
    fs::rename(&tp, final_path).map_err(GrabError::io("rename", final_path))?;
    Ok(())
}

/// Removes `path`, then each parent directory that became empty, stopping at
/// (and never removing) `root`. Returns the directories removed.
pub fn remove_and_prune(path: &Path, root: &Path) -> Result<Vec<PathBuf>> {
    fs::remove_file(path).map_err(GrabError::io("delete", path))?;
    let mut removed = Vec::new();
    let mut dir = path.parent();
    while let Some(d) = dir {
        if d == root || !d.starts_with(root) {
            break;
        }
        let empty = fs::read_dir(d)
            .map_err(GrabError::io("list", d))?
            .next()
            .is_none();
        if !empty {
            break;
        }
        fs::remove_dir(d).map_err(GrabError::io("delete", d))?;
        removed.push(d.to_path_buf());
        dir = d.parent();
    }
    Ok(removed)
}

/// Recursively copies the directory tree at `from` to `to`.
pub fn copy_tree(from: &Path, to: &Path) -> Result<u64> {
    let mut copied = 0;
    for entry in walkdir::WalkDir::new(from) {
        let entry = entry.map_err(|e| walk_error(from, e))?;
        let rel = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let dest = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(GrabError::io("create dir", &dest))?;
        } else {
            fs::copy(entry.path(), &dest).map_err(GrabError::io("copy", entry.path()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

pub(crate) fn walk_error(root: &Path, e: walkdir::Error) -> GrabError {
    let path = e.path().unwrap_or(root).to_path_buf();
    GrabError::Io {
        action: "walk",
        path,
        source: e.into(),
    }
}
