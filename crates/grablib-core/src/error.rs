//! Typed errors for downloads and builds.
//!
//! Download failures are fail-fast: the first error aborts the run, wrapped in
//! [`GrabError::Entry`] so the offending source and target are visible. SASS
//! compile failures are counted and surface once as [`GrabError::Compile`].

use std::io;
use std::path::{Path, PathBuf};

pub type Result<T, E = GrabError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum GrabError {
    /// Bad configuration: path templates, lock file syntax, regexes, config files.
    #[error("{0}")]
    Config(String),

    /// Network failure or a non-200 response.
    #[error("request to {url} failed: {message}")]
    Transport {
        url: String,
        status: Option<u32>,
        message: String,
    },

    /// Remote content no longer matches the digest recorded in the lock file.
    #[error("security warning: hash of remote file {url} has changed (locked {expected}, fetched {actual})")]
    Integrity {
        url: String,
        expected: String,
        actual: String,
    },

    /// A stale file scheduled for deletion was edited locally.
    #[error(
        "not deleting \"{path}\" which is in the lock file but not the definition file, \
         however appears to have been modified since it was downloaded; \
         check and delete the file manually"
    )]
    StaleConflict { path: String },

    /// Downloaded bytes were not a readable zip archive.
    #[error("invalid zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Aggregated SASS failures, raised after every file was attempted.
    #[error("{errors} sass error(s)")]
    Compile { errors: usize },

    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Context for a failure inside one download entry.
    #[error("error downloading \"{source_id}\" to \"{target}\"")]
    Entry {
        source_id: String,
        target: String,
        #[source]
        source: Box<GrabError>,
    },
}

impl GrabError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        GrabError::Config(msg.into())
    }

    /// Builds a `map_err` adapter that attaches an action and path to an I/O error.
    pub(crate) fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> GrabError + 'a {
        move |source| GrabError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Innermost error, skipping any [`GrabError::Entry`] wrappers.
    pub fn root(&self) -> &GrabError {
        match self {
            GrabError::Entry { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_wraps_and_root_unwraps() {
        let err = GrabError::Entry {
            source_id: "https://x/a.js".to_string(),
            target: "a.js".to_string(),
            source: Box::new(GrabError::Transport {
                url: "https://x/a.js".to_string(),
                status: Some(403),
                message: "HTTP 403".to_string(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "error downloading \"https://x/a.js\" to \"a.js\""
        );
        assert!(matches!(
            err.root(),
            GrabError::Transport {
                status: Some(403),
                ..
            }
        ));
    }

    #[test]
    fn io_adapter_keeps_path() {
        let err = GrabError::io("read", Path::new("/nope"))(io::Error::from(io::ErrorKind::NotFound));
        assert!(err.to_string().starts_with("read /nope:"));
    }
}
