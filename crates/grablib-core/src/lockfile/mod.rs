//! Lock file: the previous run's snapshot plus the snapshot being built.
//!
//! Loaded once at the start of a download run, drained by [`LockStore::confirm`]
//! as entries are processed, and persisted once at the end. Whatever the run did
//! not confirm is stale and written back under the [`STALE`] sentinel, so other
//! checkouts delete it on their next run.

mod parse;

pub use parse::{parse, LockLine};

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{GrabError, Result};
use crate::storage;

/// Sentinel path holding the digest of a zip target's routing rules.
pub const ZIP_VALUE_REF: &str = ":zip-lookup";
/// Sentinel path holding the digest of the raw zip archive.
pub const ZIP_RAW_REF: &str = ":zip-raw";
/// Sentinel source for stale files still awaiting deletion.
pub const STALE: &str = ":stale";

const STALE_HEADER: &str = "# \"stale\" files which grablib should delete where found, \
                            you can delete these once everyone has run grablib";

#[derive(Debug, Default)]
pub struct LockStore {
    path: Option<PathBuf>,
    current: HashMap<String, Vec<(String, String)>>,
    stale: BTreeMap<String, String>,
    new_lock: BTreeMap<(String, String), String>,
}

impl LockStore {
    /// Loads the snapshot at `path`. `None` disables locking; a missing file is
    /// an empty snapshot.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut store = LockStore {
            path: path.map(Path::to_path_buf),
            ..Default::default()
        };
        let Some(path) = path else {
            return Ok(store);
        };
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("lock file {} not found, starting empty", path.display());
                return Ok(store);
            }
            Err(e) => return Err(GrabError::io("read", path)(e)),
        };
        for line in parse(&text)? {
            store
                .current
                .entry(line.source)
                .or_default()
                .push((line.path, line.digest));
        }
        for entries in store.current.values() {
            for (path, digest) in entries {
                if !path.starts_with(':') {
                    store.stale.insert(path.clone(), digest.clone());
                }
            }
        }
        tracing::debug!(
            sources = store.current.len(),
            "loaded lock file {}",
            path.display()
        );
        Ok(store)
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Entries recorded for `source` by the previous run, in file order.
    pub fn previous(&self, source: &str) -> &[(String, String)] {
        self.current.get(source).map_or(&[], Vec::as_slice)
    }

    /// Records `(source, path, digest)` in the new snapshot and clears `path`
    /// from the stale set.
    pub fn confirm(&mut self, source: &str, path: &str, digest: &str) {
        self.new_lock
            .insert((source.to_string(), path.to_string()), digest.to_string());
        self.stale.remove(path);
    }

    /// Paths from the previous snapshot not confirmed so far, sorted.
    pub fn stale(&self) -> &BTreeMap<String, String> {
        &self.stale
    }

    /// Lock file text for the new snapshot.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self
            .new_lock
            .iter()
            .map(|((source, path), digest)| parse::render_line(digest, source, path))
            .collect();
        if !self.stale.is_empty() {
            lines.push(STALE_HEADER.to_string());
            lines.extend(
                self.stale
                    .iter()
                    .map(|(path, digest)| parse::render_line(digest, STALE, path)),
            );
        }
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }

    /// Writes the new snapshot atomically. No-op when locking is disabled.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        storage::write_atomic(path, self.render().as_bytes())?;
        tracing::debug!(entries = self.new_lock.len(), "saved lock file {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_lock(dir: &Path, text: &str) -> PathBuf {
        let p = dir.join(".grablib.lock");
        fs::write(&p, text).unwrap();
        p
    }

    #[test]
    fn missing_file_is_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = LockStore::load(Some(&dir.path().join("nope.lock"))).unwrap();
        assert!(store.is_enabled());
        assert!(store.previous("http://x/a.js").is_empty());
        assert!(store.stale().is_empty());
    }

    #[test]
    fn entries_accumulate_per_source_and_feed_stale_set() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_lock(
            dir.path(),
            "r1 http://x/a.zip :zip-lookup\n\
             r2 http://x/a.zip :zip-raw\n\
             h1 http://x/a.zip out/one.txt\n\
             h2 http://x/a.zip out/two.txt\n\
             h3 :stale old/thing.js\n",
        );
        let store = LockStore::load(Some(&p)).unwrap();
        let prev = store.previous("http://x/a.zip");
        assert_eq!(prev.len(), 4);
        assert_eq!(prev[2], ("out/one.txt".to_string(), "h1".to_string()));
        let stale: Vec<&str> = store.stale().keys().map(String::as_str).collect();
        assert_eq!(stale, vec!["old/thing.js", "out/one.txt", "out/two.txt"]);
    }

    #[test]
    fn confirm_drains_stale_and_render_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_lock(dir.path(), "h1 http://b/x.js x.js\nh2 http://a/y.js y.js\n");
        let mut store = LockStore::load(Some(&p)).unwrap();
        store.confirm("http://b/x.js", "x.js", "h1");
        store.confirm("http://a/z.js", "z.js", "h3");
        assert_eq!(
            store.render(),
            "h3 http://a/z.js z.js\n\
             h1 http://b/x.js x.js\n\
             # \"stale\" files which grablib should delete where found, you can delete these once everyone has run grablib\n\
             h2 :stale y.js\n"
        );
    }

    #[test]
    fn confirm_replaces_duplicate_pair() {
        let mut store = LockStore::load(None).unwrap();
        store.confirm("s", "p", "old");
        store.confirm("s", "p", "new");
        assert_eq!(store.render(), "new s p\n");
    }

    #[test]
    fn save_disabled_is_noop_and_enabled_is_reloadable() {
        let store = LockStore::load(None).unwrap();
        assert!(!store.is_enabled());
        store.save().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("sub/.grablib.lock");
        let mut store = LockStore::load(Some(&p)).unwrap();
        store.confirm("http://x/a.js", "a.js", "b5a3344a4b3651ebd60a1e15309d737c");
        store.save().unwrap();
        assert_eq!(
            fs::read_to_string(&p).unwrap(),
            "b5a3344a4b3651ebd60a1e15309d737c http://x/a.js a.js\n"
        );
        let reloaded = LockStore::load(Some(&p)).unwrap();
        assert_eq!(reloaded.previous("http://x/a.js").len(), 1);
    }

    #[test]
    fn empty_snapshot_renders_single_newline() {
        let store = LockStore::load(None).unwrap();
        assert_eq!(store.render(), "\n");
    }
}
