//! SASS compilation of a source directory into css files.

mod importer;
mod size_cache;

pub use importer::{ImportResolver, Importer, ResolvingFs};
pub(crate) use importer::DOWNLOAD_PREFIXES;
pub use size_cache::{size_delta, SizeCache};

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use crate::build::hash::{fmt_size, insert_hash};
use crate::checksum::HashAlgorithm;
use crate::config::SassEntry;
use crate::error::{GrabError, Result};
use crate::storage;
use crate::template;

/// Matches css/sass/scss files whose name does not start with `_`.
pub const DEFAULT_INCLUDE: &str = r"/[^_][^/]+\.(?:css|sass|scss)$";

type Replacements = Vec<(Regex, Vec<(Regex, String)>)>;

pub struct SassGenerator {
    input_dir: PathBuf,
    output_dir: PathBuf,
    include: Regex,
    exclude: Option<Regex>,
    replace: Replacements,
    /// Digest length and algorithm for hashed names; `None` keeps plain names.
    hash: Option<(usize, HashAlgorithm)>,
    debug: bool,
    resolver: ImportResolver,
}

impl SassGenerator {
    pub fn new(
        input_dir: &Path,
        output_dir: PathBuf,
        entry: &SassEntry,
        download_root: Option<&Path>,
        debug: bool,
    ) -> Result<Self> {
        let input_dir = fs::canonicalize(input_dir).map_err(GrabError::io("resolve", input_dir))?;
        if !input_dir.is_dir() {
            return Err(GrabError::config(format!(
                "sass source \"{}\" is not a directory",
                input_dir.display()
            )));
        }
        let include = compile(entry.include.as_deref().unwrap_or(DEFAULT_INCLUDE))?;
        let exclude = entry.exclude.as_deref().map(compile).transpose()?;
        let mut replace = Vec::with_capacity(entry.replace.len());
        for (path_pattern, map) in &entry.replace {
            let mut subs = Vec::with_capacity(map.len());
            for (pattern, repl) in map {
                subs.push((compile(pattern)?, repl.clone()));
            }
            replace.push((compile(path_pattern)?, subs));
        }
        if entry.hash && entry.hash_length == 0 {
            return Err(GrabError::config("\"hash_length\" must be at least 1"));
        }
        let resolver = ImportResolver::new(&input_dir, download_root);
        Ok(Self {
            input_dir,
            output_dir,
            include,
            exclude,
            replace,
            hash: entry.hash.then_some((entry.hash_length, entry.hash_algorithm)),
            debug,
            resolver,
        })
    }

    pub fn add_importer(&mut self, priority: i32, importer: Rc<dyn Importer>) {
        self.resolver.add_importer(priority, importer);
    }

    /// Compiles every included file. Compile failures are logged and counted;
    /// if any occurred the run ends with [`GrabError::Compile`] after all files
    /// were attempted. Returns the number of css files written.
    pub fn run(&self) -> Result<usize> {
        let start = Instant::now();
        let src_dir = if self.debug {
            let copy = self.output_dir.join(".src");
            fs::create_dir_all(&self.output_dir)
                .map_err(GrabError::io("create dir", &self.output_dir))?;
            if copy.exists() {
                return Err(GrabError::config(format!(
                    "with debug switched on the directory \"{}\" must not exist before building, \
                     you should delete it with the \"wipe\" option",
                    copy.display()
                )));
            }
            storage::copy_tree(&self.input_dir, &copy)?;
            copy
        } else {
            self.input_dir.clone()
        };

        let mut cache = SizeCache::for_input_dir(&self.input_dir);
        let resolving_fs = ResolvingFs::new(&self.resolver);
        let style = if self.debug {
            grass::OutputStyle::Expanded
        } else {
            grass::OutputStyle::Compressed
        };
        let options = grass::Options::default().style(style).fs(&resolving_fs);

        let mut errors = 0;
        let mut generated = 0;
        for entry in walkdir::WalkDir::new(&src_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| storage::walk_error(&src_dir, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file = entry.path();
            let file_str = file.to_string_lossy();
            if !self.include.is_match(&file_str)
                || self.exclude.as_ref().map_or(false, |re| re.is_match(&file_str))
            {
                continue;
            }
            let rel = file.strip_prefix(&src_dir).unwrap_or(file);
            let css = match grass::from_path(file, &options) {
                Ok(css) => css,
                Err(e) => {
                    errors += 1;
                    tracing::error!("\"{}\", compile error: {}", file.display(), e);
                    continue;
                }
            };
            let css = self.apply_replacements(rel, css);
            let mut css_path = self.output_dir.join(rel).with_extension("css");
            if let Some((length, algorithm)) = self.hash {
                css_path = insert_hash(&css_path, css.as_bytes(), length, algorithm);
            }
            self.log_file_creation(&mut cache, rel, &css_path, css.len() as u64);
            storage::write_atomic(&css_path, css.as_bytes())?;
            generated += 1;
        }

        if let Err(e) = cache.save() {
            tracing::warn!("unable to save size cache {}: {}", cache.path().display(), e);
        }
        let ms = start.elapsed().as_secs_f64() * 1000.0;
        if errors > 0 {
            tracing::error!(
                "{} css files generated in {:.0}ms, {} errors",
                generated,
                ms,
                errors
            );
            return Err(GrabError::Compile { errors });
        }
        tracing::info!("{} css files generated in {:.0}ms, 0 errors", generated, ms);
        Ok(generated)
    }

    fn apply_replacements(&self, rel: &Path, mut css: String) -> String {
        let rel_str = template::to_slash(rel);
        for (path_re, subs) in &self.replace {
            if !path_re.is_match(&rel_str) {
                continue;
            }
            tracing::debug!("{} has regex replace matches for \"{}\"", rel_str, path_re.as_str());
            for (re, repl) in subs {
                let replaced = re.replace_all(&css, repl.as_str()).into_owned();
                let verb = if replaced == css { "didn't modify" } else { "modified" };
                tracing::debug!("  \"{}\" ➤ \"{}\" {} the source", re.as_str(), repl, verb);
                css = replaced;
            }
        }
        css
    }

    fn log_file_creation(&self, cache: &mut SizeCache, rel: &Path, css_path: &Path, size: u64) {
        let dst = css_path.strip_prefix(&self.output_dir).unwrap_or(css_path);
        let delta = cache
            .previous_size(css_path)
            .and_then(|old| size_delta(old, size));
        cache.record(css_path, size);
        match delta {
            Some(d) => tracing::info!(
                "{:>30} ➤ {:<30} {:>7} {:+.0}%",
                rel.display(),
                dst.display(),
                fmt_size(size),
                d
            ),
            None => tracing::info!(
                "{:>30} ➤ {:<30} {:>7}",
                rel.display(),
                dst.display(),
                fmt_size(size)
            ),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| GrabError::config(format!("invalid regex \"{}\": {}", pattern, e)))
}
