use regex::Regex;
use std::fs;

use crate::error::{GrabError, Result};
use crate::storage;
use crate::template;

use super::Builder;

impl Builder {
    /// Deletes every path under the build root whose relative path fully
    /// matches one of the `wipe` regexes. Returns the number of paths deleted.
    pub fn wipe(&self) -> Result<usize> {
        let regexes = self
            .build
            .wipe
            .iter()
            .map(|r| {
                Regex::new(&format!("^(?:{})$", r))
                    .map_err(|e| GrabError::config(format!("invalid wipe regex \"{}\": {}", r, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut count = 0;
        if !self.build_root.is_dir() {
            tracing::info!("{} paths deleted", count);
            return Ok(count);
        }
        let mut it = walkdir::WalkDir::new(&self.build_root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();
        while let Some(entry) = it.next() {
            let entry = entry.map_err(|e| storage::walk_error(&self.build_root, e))?;
            let path = entry.path();
            let rel = template::to_slash(path.strip_prefix(&self.build_root).unwrap_or(path));
            let Some(re) = regexes.iter().find(|re| re.is_match(&rel)) else {
                continue;
            };
            if entry.file_type().is_dir() {
                tracing::debug!("deleting directory \"{}\" based on \"{}\"", rel, re.as_str());
                fs::remove_dir_all(path).map_err(GrabError::io("delete", path))?;
                it.skip_current_dir();
            } else {
                tracing::debug!("deleting file \"{}\" based on \"{}\"", rel, re.as_str());
                fs::remove_file(path).map_err(GrabError::io("delete", path))?;
            }
            count += 1;
        }
        tracing::info!("{} paths deleted", count);
        Ok(count)
    }
}
