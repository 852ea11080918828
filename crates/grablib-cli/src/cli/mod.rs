//! CLI for grablib.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use grablib_core::config::{self, GrabConfig};
use grablib_core::logging::Verbosity;
use std::path::{Path, PathBuf};

use commands::{run_build, run_download};

/// Top-level CLI for grablib.
#[derive(Debug, Parser)]
#[command(name = "grablib", version)]
#[command(
    about = "Download static files (javascript, css, fonts) by lock file and build them",
    long_about = None
)]
pub struct Cli {
    /// Action to run; `download` when omitted.
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    /// Root directory to put downloaded files in, overrides the config value.
    #[arg(short = 'd', long, global = true, value_name = "DIR")]
    pub download_root: Option<PathBuf>,

    /// Build in debug mode: no minification, expanded css.
    #[arg(long, global = true)]
    pub debug: bool,

    #[arg(short, long, value_enum, default_value_t = VerbosityArg::Medium, global = true)]
    pub verbosity: VerbosityArg,
}

#[derive(Debug, Clone, Subcommand, PartialEq, Eq)]
pub enum CliCommand {
    /// Download the files listed under `download`.
    Download {
        /// Config file; grablib.yml, grablib.yaml, grablib.json or grablib.toml when omitted.
        config_file: Option<PathBuf>,
    },

    /// Run the `build` steps: wipe, cat, sass.
    Build {
        /// Config file; grablib.yml, grablib.yaml, grablib.json or grablib.toml when omitted.
        config_file: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VerbosityArg {
    Low,
    Medium,
    High,
}

impl From<VerbosityArg> for Verbosity {
    fn from(v: VerbosityArg) -> Self {
        match v {
            VerbosityArg::Low => Verbosity::Low,
            VerbosityArg::Medium => Verbosity::Medium,
            VerbosityArg::High => Verbosity::High,
        }
    }
}

impl Cli {
    /// The requested action, defaulting to `download`.
    pub fn action(&self) -> CliCommand {
        self.command
            .clone()
            .unwrap_or(CliCommand::Download { config_file: None })
    }

    pub fn run(self) -> Result<()> {
        match self.action() {
            CliCommand::Download { config_file } => {
                let cfg = self.load_config(config_file.as_deref())?;
                run_download(&cfg)?;
            }
            CliCommand::Build { config_file } => {
                let cfg = self.load_config(config_file.as_deref())?;
                run_build(&cfg)?;
            }
        }
        Ok(())
    }

    /// Loads the config file and applies command-line overrides.
    fn load_config(&self, config_file: Option<&Path>) -> Result<GrabConfig> {
        let cwd = std::env::current_dir().context("reading current directory")?;
        let path = match config_file {
            Some(p) => p.to_path_buf(),
            None => config::find_config_file(&cwd)?,
        };
        let mut cfg = config::load(&path)?;
        tracing::debug!("loaded config {}: {:?}", path.display(), cfg);
        apply_overrides(&mut cfg, &cwd, self.download_root.as_deref(), self.debug);
        Ok(cfg)
    }
}

/// Command-line values win over the config file; a relative download root is
/// taken relative to the working directory.
fn apply_overrides(cfg: &mut GrabConfig, cwd: &Path, download_root: Option<&Path>, debug: bool) {
    if let Some(root) = download_root {
        cfg.download_root = cwd.join(root);
    }
    if debug {
        cfg.debug = true;
    }
}

#[cfg(test)]
mod tests;
