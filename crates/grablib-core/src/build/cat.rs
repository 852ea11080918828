use regex::Regex;
use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::error::{GrabError, Result};
use crate::storage;

use super::Builder;

impl Builder {
    /// Concatenates each destination's sources, minifying plain `.js` files
    /// unless in debug mode. Returns the number of source files combined.
    pub fn cat(&self) -> Result<usize> {
        let start = Instant::now();
        let mut total = 0;
        for (dest, sources) in &self.build.cat {
            let mut combined = String::new();
            let mut files = 0;
            for source in sources {
                let path = self.source_path(&source.src)?;
                let mut content = self.read_source(&path)?;
                for (pattern, replacement) in &source.replace {
                    let re = Regex::new(pattern).map_err(|e| {
                        GrabError::config(format!("invalid replace regex \"{}\": {}", pattern, e))
                    })?;
                    content = re.replace_all(&content, replacement.as_str()).into_owned();
                }
                let name = file_name(&path);
                combined.push_str(&format!(
                    "/* === {} === */\n{}\n",
                    name,
                    content.trim_matches('\n')
                ));
                tracing::debug!("  appending {}", name);
                files += 1;
            }
            if files == 0 {
                tracing::warn!("no files found to form \"{}\"", dest);
                continue;
            }
            storage::write_atomic(&self.dest_path(dest)?, combined.as_bytes())?;
            total += files;
            tracing::info!("{} files combined to form \"{}\"", files, dest);
        }
        tracing::info!(
            "{} files concatenated in {:.0}ms",
            total,
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(total)
    }

    fn read_source(&self, path: &Path) -> Result<String> {
        let content = fs::read_to_string(path).map_err(GrabError::io("read", path))?;
        let name = file_name(path);
        if !self.debug && name.ends_with(".js") && !name.ends_with(".min.js") {
            return Ok(minifier::js::minify(&content).to_string());
        }
        Ok(content)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
