//! Build pipeline: wipe, then cat, then sass, each step optional.

mod cat;
pub mod hash;
pub mod sass;
mod wipe;

pub use hash::{fmt_size, insert_hash};
pub use sass::{ImportResolver, Importer, SassGenerator};

use std::path::PathBuf;
use std::rc::Rc;

use crate::config::{BuildConfig, GrabConfig};
use crate::error::{GrabError, Result};
use crate::template;

/// Counters reported at the end of a build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub paths_wiped: usize,
    pub files_concatenated: usize,
    pub css_generated: usize,
}

pub struct Builder {
    build_root: PathBuf,
    build: BuildConfig,
    download_root: Option<PathBuf>,
    base_dir: PathBuf,
    debug: bool,
    importers: Vec<(i32, Rc<dyn Importer>)>,
}

impl Builder {
    pub fn new(build_root: impl Into<PathBuf>, build: BuildConfig) -> Self {
        Self {
            build_root: build_root.into(),
            build,
            download_root: None,
            base_dir: PathBuf::from("."),
            debug: false,
            importers: Vec::new(),
        }
    }

    pub fn from_config(config: &GrabConfig) -> Result<Self> {
        let build_root = config
            .build_root
            .clone()
            .ok_or_else(|| GrabError::config("\"build_root\" must be set to build"))?;
        Ok(Self::new(build_root, config.build.clone().unwrap_or_default())
            .download_root(config.download_root.clone())
            .base_dir(config.base_dir.clone())
            .debug(config.debug))
    }

    /// Root that `DOWNLOAD/` and `DL/` sources and imports refer to.
    pub fn download_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.download_root = Some(root.into());
        self
    }

    /// Directory relative sources are resolved against.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Registers a custom SASS importer; lower priorities run first.
    pub fn importer(mut self, priority: i32, importer: impl Importer + 'static) -> Self {
        let importer: Rc<dyn Importer> = Rc::new(importer);
        self.importers.push((priority, importer));
        self
    }

    pub fn run(&self) -> Result<BuildStats> {
        let mut stats = BuildStats::default();
        if !self.build.wipe.is_empty() {
            stats.paths_wiped = self.wipe()?;
        }
        if !self.build.cat.is_empty() {
            stats.files_concatenated = self.cat()?;
        }
        if !self.build.sass.is_empty() {
            stats.css_generated = self.sass()?;
        }
        Ok(stats)
    }

    /// Compiles each configured sass directory; returns css files generated.
    pub fn sass(&self) -> Result<usize> {
        let mut generated = 0;
        for (dest, entry) in &self.build.sass {
            let mut gen = SassGenerator::new(
                &self.source_path(&entry.src)?,
                self.dest_path(dest)?,
                entry,
                self.download_root.as_deref(),
                self.debug,
            )?;
            for (priority, importer) in &self.importers {
                gen.add_importer(*priority, Rc::clone(importer));
            }
            generated += gen.run()?;
        }
        Ok(generated)
    }

    /// Resolves a build source: `DOWNLOAD/` and `DL/` refer to the download
    /// root, other relative paths to the base directory.
    fn source_path(&self, src: &str) -> Result<PathBuf> {
        if let Some(rest) = strip_prefixes(src, sass::DOWNLOAD_PREFIXES) {
            let root = self.download_root.as_ref().ok_or_else(|| {
                GrabError::config(format!(
                    "\"{}\" refers to the download root, which is not set",
                    src
                ))
            })?;
            return Ok(root.join(rest));
        }
        Ok(self.base_dir.join(src))
    }

    /// Output path inside the build root.
    fn dest_path(&self, dest: &str) -> Result<PathBuf> {
        Ok(self.build_root.join(template::normalize_relative(dest)?))
    }
}

/// `s` without the first of `prefixes` it starts with.
pub(crate) fn strip_prefixes<'a>(s: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|p| s.strip_prefix(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn strip_prefixes_first_match() {
        assert_eq!(strip_prefixes("DL/x/y", &["DOWNLOAD/", "DL/"]), Some("x/y"));
        assert_eq!(strip_prefixes("DOWNLOAD/z", &["DOWNLOAD/", "DL/"]), Some("z"));
        assert_eq!(strip_prefixes("x/DL/z", &["DOWNLOAD/", "DL/"]), None);
    }

    #[test]
    fn source_and_dest_paths() {
        let builder = Builder::new("/build", BuildConfig::default())
            .base_dir("/project")
            .download_root("/project/static");
        assert_eq!(
            builder.source_path("DL/lib/a.js").unwrap(),
            PathBuf::from("/project/static/lib/a.js")
        );
        assert_eq!(
            builder.source_path("js/b.js").unwrap(),
            PathBuf::from("/project/js/b.js")
        );
        assert_eq!(
            builder.dest_path("css/out.css").unwrap(),
            PathBuf::from("/build/css/out.css")
        );
        assert!(builder.dest_path("../escape.css").is_err());

        let no_dl = Builder::new("/build", BuildConfig::default());
        assert!(matches!(no_dl.source_path("DL/x"), Err(GrabError::Config(_))));
    }

    #[test]
    fn from_config_requires_build_root() {
        let cfg: GrabConfig = serde_yaml::from_str("build:\n  wipe: x").unwrap();
        assert!(Builder::from_config(&cfg).is_err());
    }

    #[test]
    fn full_pipeline_runs_steps_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("built/old")).unwrap();
        fs::write(root.join("built/old/stale.css"), "x").unwrap();
        fs::create_dir_all(root.join("sass")).unwrap();
        fs::write(root.join("sass/site.scss"), "p { margin: 0; }").unwrap();
        fs::write(root.join("a.min.js"), "var a=1;\n").unwrap();
        fs::write(
            root.join("grablib.yml"),
            "build_root: built\n\
             build:\n  \
               wipe: 'old(/.*)?'\n  \
               cat:\n    \
                 js/all.js: ['a.min.js']\n  \
               sass:\n    \
                 css: sass\n",
        )
        .unwrap();
        let cfg = crate::config::load(&root.join("grablib.yml")).unwrap();
        let stats = Builder::from_config(&cfg).unwrap().run().unwrap();
        assert_eq!(
            stats,
            BuildStats {
                paths_wiped: 1,
                files_concatenated: 1,
                css_generated: 1,
            }
        );
        assert!(!root.join("built/old").exists());
        assert_eq!(
            fs::read_to_string(root.join("built/js/all.js")).unwrap(),
            "/* === a.min.js === */\nvar a=1;\n"
        );
        assert!(root.join("built/css/site.css").exists());
    }

    #[test]
    fn custom_importer_reaches_sass() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("themes")).unwrap();
        fs::write(root.join("themes/_dark.scss"), "$bg: #123456;").unwrap();
        fs::create_dir_all(root.join("sass")).unwrap();
        fs::write(root.join("sass/site.scss"), "@import 'THEME/dark';
body { background: $bg; }").unwrap();

        let mut build = BuildConfig::default();
        let entry: crate::config::SassEntry = serde_yaml::from_str("sass").unwrap();
        build.sass.insert("css".to_string(), entry);
        let themes = root.join("themes");
        let stats = Builder::new(root.join("built"), build)
            .base_dir(root)
            .importer(0, move |url: &str| url.strip_prefix("THEME/").map(|rest| themes.join(rest)))
            .run()
            .unwrap();
        assert_eq!(stats.css_generated, 1);
        let css = fs::read_to_string(root.join("built/css/site.css")).unwrap();
        assert_eq!(css.trim(), "body{background:#123456}");
    }
}
