//! CLI command handlers.

mod build;
mod download;

pub use build::run_build;
pub use download::run_download;
