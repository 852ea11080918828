//! Single-file sources: one URL, one destination.

use crate::checksum;
use crate::error::{GrabError, Result};
use crate::fetch::Fetcher;
use crate::template;

use super::Downloader;

impl<F: Fetcher> Downloader<F> {
    pub(super) fn process_plain(&mut self, url: &str, dest: &str) -> Result<()> {
        let rel = template::resolve(url, dest, &self.url_filename)?;
        let name = template::to_slash(&rel);
        let path = self.download_root.join(&rel);

        let locked = match self.lock.previous(url) {
            [(locked_name, digest)] if !locked_name.starts_with(':') => {
                Some((locked_name.clone(), digest.clone()))
            }
            _ => None,
        };
        if let Some((locked_name, locked_digest)) = &locked {
            if *locked_name == name
                && checksum::md5_path(&path)?.as_deref() == Some(locked_digest.as_str())
            {
                self.lock.confirm(url, locked_name, locked_digest);
                self.stats.skipped += 1;
                tracing::debug!("{} already exists unchanged, not downloading", url);
                return Ok(());
            }
        }

        tracing::info!("downloading: {} ➤ {}...", url, name);
        let content = self.fetcher.fetch(url)?;
        let remote = checksum::md5_hex(&content);
        if let Some((_, expected)) = locked {
            if expected != remote {
                tracing::error!("security warning: hash of remote file {} has changed!", url);
                return Err(GrabError::Integrity {
                    url: url.to_string(),
                    expected,
                    actual: remote,
                });
            }
        }
        self.write(url, &rel, &content)?;
        self.stats.downloaded += 1;
        Ok(())
    }
}
