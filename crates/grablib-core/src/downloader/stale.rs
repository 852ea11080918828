//! Deletion of files the previous run downloaded but this run did not confirm.

use crate::checksum;
use crate::error::{GrabError, Result};
use crate::fetch::Fetcher;
use crate::storage;
use crate::template;

use super::Downloader;

impl<F: Fetcher> Downloader<F> {
    /// Deletes each stale path whose on-disk digest still matches the lock,
    /// pruning emptied directories. A locally modified stale file aborts the
    /// run and is left untouched.
    pub(super) fn delete_stale(&mut self) -> Result<()> {
        let stale: Vec<(String, String)> = self
            .lock
            .stale()
            .iter()
            .map(|(p, d)| (p.clone(), d.clone()))
            .collect();
        for (name, digest) in stale {
            let path = self.download_root.join(template::normalize_relative(&name)?);
            let Some(current) = checksum::md5_path(&path)? else {
                continue;
            };
            if current != digest {
                tracing::error!(
                    "not deleting \"{}\": in the lock file but modified since it was downloaded",
                    name
                );
                return Err(GrabError::StaleConflict { path: name });
            }
            tracing::info!("deleting: {} which is stale...", name);
            let removed = storage::remove_and_prune(&path, &self.download_root)?;
            for dir in removed {
                let shown = dir.strip_prefix(&self.download_root).unwrap_or(&dir);
                tracing::info!("deleting: {} which is stale..", shown.display());
            }
            self.stats.stale_deleted += 1;
        }
        Ok(())
    }
}
