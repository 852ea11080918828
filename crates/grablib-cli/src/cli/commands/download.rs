//! Download command: fetch everything under `download` and update the lock file.

use anyhow::Result;
use grablib_core::config::GrabConfig;
use grablib_core::{CurlFetcher, Downloader};

pub fn run_download(cfg: &GrabConfig) -> Result<()> {
    if cfg.download.is_none() {
        tracing::warn!("no \"download\" section found in the config, nothing to download");
        return Ok(());
    }
    let stats = Downloader::from_config(cfg, CurlFetcher::new())?.run()?;
    tracing::debug!(?stats, "download complete");
    Ok(())
}
