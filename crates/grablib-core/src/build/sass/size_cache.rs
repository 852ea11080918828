//! Output sizes from the previous build, for reporting how each css file changed.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::checksum;
use crate::error::{GrabError, Result};
use crate::storage;

pub struct SizeCache {
    path: PathBuf,
    old: HashMap<String, u64>,
    new: BTreeMap<String, u64>,
}

impl SizeCache {
    /// Cache for `input_dir`, stored under the XDG cache directory (or the
    /// system temp dir when that is unavailable).
    pub fn for_input_dir(input_dir: &Path) -> Self {
        let name = format!(
            "grablib_cache.{}.json",
            checksum::md5_hex(input_dir.to_string_lossy().as_bytes())
        );
        Self::load(cache_dir().join(name))
    }

    /// A missing or unreadable cache file starts empty.
    pub fn load(path: PathBuf) -> Self {
        let old = match fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|e| {
                tracing::debug!("ignoring invalid size cache {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            old,
            new: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn previous_size(&self, output: &Path) -> Option<u64> {
        self.old.get(&*output.to_string_lossy()).copied()
    }

    pub fn record(&mut self, output: &Path, size: u64) {
        self.new.insert(output.to_string_lossy().into_owned(), size);
    }

    /// Replaces the cache file with the sizes recorded this build.
    pub fn save(&self) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.new)
            .map_err(|e| GrabError::config(format!("serialising size cache: {}", e)))?;
        storage::write_atomic(&self.path, &data)
    }
}

fn cache_dir() -> PathBuf {
    xdg::BaseDirectories::with_prefix("grablib")
        .map(|x| x.get_cache_home().join("grablib"))
        .unwrap_or_else(|_| std::env::temp_dir())
}

/// Percentage change from `old` to `new`, only when it is worth reporting.
pub fn size_delta(old: u64, new: u64) -> Option<f64> {
    if old == 0 {
        return None;
    }
    let delta = (new as f64 - old as f64) / old as f64 * 100.0;
    (delta.abs() > 0.5).then_some(delta)
}
