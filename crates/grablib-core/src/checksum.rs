//! Content digests for the lock file and cache-busting file names.
//!
//! MD5 is used for change detection only (lock entries, size-cache keys);
//! it is not a security boundary beyond noticing drift.

use md5::Md5;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{GrabError, Result};

const BUF_SIZE: usize = 64 * 1024;

/// Hash algorithm used for hashed output file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl HashAlgorithm {
    pub fn hex_digest(self, data: &[u8]) -> String {
        match self {
            HashAlgorithm::Md5 => md5_hex(data),
            HashAlgorithm::Sha256 => sha256_hex(data),
        }
    }
}

/// MD5 of `data` as lowercase hex.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// SHA-256 of `data` as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// MD5 of a file as lowercase hex, or `None` if the file does not exist.
/// Reads in chunks to keep memory use bounded.
pub fn md5_path(path: &Path) -> Result<Option<String>> {
    let mut f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(GrabError::io("open", path)(e)),
    };
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf).map_err(GrabError::io("read", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Some(hex::encode(hasher.finalize())))
}
