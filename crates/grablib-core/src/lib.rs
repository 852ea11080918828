//! Locked downloads of static assets and a small asset build pipeline.
//!
//! [`downloader::Downloader`] fetches the files and zip archives listed in a
//! config, verifying them against a lock file. [`build::Builder`] wipes,
//! concatenates and compiles SASS into a build root.

pub mod build;
pub mod checksum;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod lockfile;
pub mod logging;
pub mod spec;
pub mod storage;
pub mod template;
pub mod zip_router;

pub use build::{BuildStats, Builder};
pub use config::GrabConfig;
pub use downloader::{DownloadStats, Downloader};
pub use error::{GrabError, Result};
pub use fetch::{CurlFetcher, Fetcher};
