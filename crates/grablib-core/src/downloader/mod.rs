//! Download run: fetch, verify and write every configured source, then purge
//! stale files and persist the lock snapshot.
//!
//! Entries are processed sequentially in declaration order. The first failing
//! entry aborts the run; its error is wrapped in [`GrabError::Entry`].

mod archive;
mod plain;
mod stale;

use regex::Regex;
use std::path::{Path, PathBuf};

use crate::checksum;
use crate::config::{AliasTable, GrabConfig};
use crate::error::{GrabError, Result};
use crate::fetch::Fetcher;
use crate::lockfile::LockStore;
use crate::spec::{DownloadSpec, Target};
use crate::storage;
use crate::template::{self, URL_FILENAME_PATTERN};

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadStats {
    pub downloaded: usize,
    pub skipped: usize,
    pub stale_deleted: usize,
}

pub struct Downloader<F: Fetcher> {
    download_root: PathBuf,
    spec: DownloadSpec,
    aliases: AliasTable,
    lock: LockStore,
    fetcher: F,
    url_filename: Regex,
    stats: DownloadStats,
}

impl<F: Fetcher> Downloader<F> {
    pub fn new(
        download_root: impl Into<PathBuf>,
        spec: DownloadSpec,
        aliases: AliasTable,
        lock: LockStore,
        fetcher: F,
    ) -> Result<Self> {
        let url_filename = Regex::new(URL_FILENAME_PATTERN)
            .map_err(|e| GrabError::config(format!("invalid url pattern: {}", e)))?;
        Ok(Self {
            download_root: download_root.into(),
            spec,
            aliases,
            lock,
            fetcher,
            url_filename,
            stats: DownloadStats::default(),
        })
    }

    /// Builds a downloader from a loaded config, reading its lock file.
    pub fn from_config(config: &GrabConfig, fetcher: F) -> Result<Self> {
        let lock = LockStore::load(config.lock_path())?;
        Self::new(
            config.download_root.clone(),
            config.download.clone().unwrap_or_default(),
            config.alias_table(),
            lock,
            fetcher,
        )
    }

    pub fn run(mut self) -> Result<DownloadStats> {
        tracing::info!("downloading files to: {}", self.download_root.display());
        if !self.lock.is_enabled() {
            tracing::debug!("lock file disabled, downloads are not verified or recorded");
        }
        let spec = std::mem::take(&mut self.spec);
        for (source, target) in &spec {
            let url = self.aliases.expand(source);
            let res = if url.contains(char::is_whitespace) {
                Err(GrabError::config(format!(
                    "source \"{}\" must not contain whitespace",
                    url
                )))
            } else {
                match target {
                    Target::Plain(dest) => self.process_plain(&url, dest),
                    Target::Zip(rules) => self.process_zip(&url, rules),
                }
            };
            res.map_err(|e| GrabError::Entry {
                source_id: url.clone(),
                target: target.describe(),
                source: Box::new(e),
            })?;
        }
        self.delete_stale()?;
        self.lock.save()?;
        tracing::info!(
            "download finished: {} files downloaded, {} stale files deleted, {} existing and ignored",
            self.stats.downloaded,
            self.stats.stale_deleted,
            self.stats.skipped
        );
        Ok(self.stats)
    }

    /// Writes `data` under the download root and confirms its on-disk digest.
    fn write(&mut self, source: &str, rel: &Path, data: &[u8]) -> Result<()> {
        let path = self.download_root.join(rel);
        storage::write_atomic(&path, data)?;
        let digest = checksum::md5_path(&path)?.unwrap_or_else(|| checksum::md5_hex(data));
        self.lock.confirm(source, &template::to_slash(rel), &digest);
        Ok(())
    }
}
