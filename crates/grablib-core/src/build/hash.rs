//! Cache-busting file names and human readable sizes.

use std::path::{Path, PathBuf};

use crate::checksum::HashAlgorithm;

/// Default digest prefix length, same as a short git commit reference.
pub const DEFAULT_HASH_LENGTH: usize = 7;

/// Inserts a content digest into the file name after the first dot
/// (`main.css` → `main.<hash>.css`), or appends it when there is no dot.
pub fn insert_hash(path: &Path, content: &[u8], length: usize, algorithm: HashAlgorithm) -> PathBuf {
    let digest = algorithm.hex_digest(content);
    let short = &digest[..length.min(digest.len())];
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let new_name = match name.split_once('.') {
        Some((stem, rest)) => format!("{}.{}.{}", stem, short, rest),
        None => format!("{}.{}", name, short),
    };
    path.with_file_name(new_name)
}

const KB: u64 = 1024;
const MB: u64 = 1024 * 1024;

pub fn fmt_size(num: u64) -> String {
    if num <= KB {
        format!("{}B", num)
    } else if num <= MB {
        format!("{:.1}KB", num as f64 / KB as f64)
    } else {
        format!("{:.1}MB", num as f64 / MB as f64)
    }
}
