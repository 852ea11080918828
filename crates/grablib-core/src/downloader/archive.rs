//! Zip sources: fetch once, route members by regex, extract to every target.

use std::io::{Cursor, Read};

use crate::checksum;
use crate::error::{GrabError, Result};
use crate::fetch::Fetcher;
use crate::lockfile::{ZIP_RAW_REF, ZIP_VALUE_REF};
use crate::spec::ZipRules;
use crate::template;
use crate::zip_router;

use super::Downloader;

impl<F: Fetcher> Downloader<F> {
    pub(super) fn process_zip(&mut self, url: &str, rules: &ZipRules) -> Result<()> {
        let rules_digest = rules.digest()?;
        let (locked_raw, unchanged) = self.zip_unchanged(url, &rules_digest)?;
        if unchanged {
            for (name, digest) in self.lock.previous(url).to_vec() {
                self.lock.confirm(url, &name, &digest);
            }
            self.stats.skipped += 1;
            tracing::debug!("{} already exists unchanged, not downloading", url);
            return Ok(());
        }

        tracing::info!("downloading zip: {}...", url);
        let content = self.fetcher.fetch(url)?;
        let remote = checksum::md5_hex(&content);
        if let Some(expected) = locked_raw {
            if expected != remote {
                tracing::error!("security warning: hash of remote file {} has changed!", url);
                return Err(GrabError::Integrity {
                    url: url.to_string(),
                    expected,
                    actual: remote,
                });
            }
        }
        self.lock.confirm(url, ZIP_VALUE_REF, &rules_digest);
        self.lock.confirm(url, ZIP_RAW_REF, &remote);
        let copied = self.extract(url, &content, rules)?;
        tracing::info!("  {} files copied from zip archive", copied);
        self.stats.downloaded += 1;
        Ok(())
    }

    /// Returns the locked archive digest and whether the source can be skipped:
    /// the rules are unchanged, an archive digest is recorded and every
    /// extracted file still matches its recorded digest.
    fn zip_unchanged(&self, url: &str, rules_digest: &str) -> Result<(Option<String>, bool)> {
        let prior = self.lock.previous(url);
        if prior.is_empty() {
            return Ok((None, false));
        }
        let mut locked_raw = None;
        let mut changed = false;
        for (name, digest) in prior {
            let current = match name.as_str() {
                ZIP_RAW_REF => {
                    locked_raw = Some(digest.clone());
                    continue;
                }
                ZIP_VALUE_REF => Some(rules_digest.to_string()),
                _ => {
                    let rel = template::normalize_relative(name)?;
                    checksum::md5_path(&self.download_root.join(rel))?
                }
            };
            if current.as_deref() != Some(digest.as_str()) {
                changed = true;
            }
        }
        let unchanged = !changed && locked_raw.is_some();
        Ok((locked_raw, unchanged))
    }

    fn extract(&mut self, url: &str, content: &[u8], rules: &ZipRules) -> Result<usize> {
        let mut archive = zip::ZipArchive::new(Cursor::new(content))?;
        let mut names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            names.push(archive.by_index(i)?.name().to_string());
        }
        tracing::debug!("{} files in zip archive", names.len());

        let mut copied = 0;
        for route in zip_router::route(&names, rules) {
            let rule = &rules.rules[route.rule_index];
            let mut data = Vec::new();
            archive
                .by_name(&route.member)?
                .read_to_end(&mut data)
                .map_err(|e| GrabError::Archive(e.into()))?;
            for dest in &route.destinations {
                let rel = template::resolve(&route.member, dest, &rule.pattern)?;
                tracing::debug!(
                    "\"{}\" ➤ \"{}\" (regex: \"{}\")",
                    route.member,
                    rel.display(),
                    rule.pattern.as_str()
                );
                self.write(url, &rel, &data)?;
                copied += 1;
            }
        }
        Ok(copied)
    }
}
