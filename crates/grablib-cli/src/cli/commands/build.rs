//! Build command: wipe, concatenate and compile into the build root.

use anyhow::Result;
use grablib_core::config::GrabConfig;
use grablib_core::Builder;

pub fn run_build(cfg: &GrabConfig) -> Result<()> {
    if cfg.build.is_none() {
        tracing::warn!("no \"build\" section found in the config, nothing to build");
        return Ok(());
    }
    let stats = Builder::from_config(cfg)?.run()?;
    tracing::debug!(?stats, "build complete");
    Ok(())
}
