//! Import resolution for SASS sources.
//!
//! Import URLs with a well-known prefix are mapped to real directories before
//! the compiler sees them:
//!
//! * `SRC/...` → the input directory itself (useful when building from the
//!   debug copy)
//! * `NM/...` or `NODE_MODULES/...` → the nearest ancestor `node_modules`
//! * `DOWNLOAD/...` or `DL/...` → the download root
//!
//! Caller-supplied [`Importer`]s are consulted afterwards in priority order.
//! Anything left unresolved falls through to the compiler's own lookup.

use regex::{Captures, Regex};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::OnceLock;

use crate::build::strip_prefixes;

const SRC_PREFIXES: &[&str] = &["SRC/"];
const NODE_MODULES_PREFIXES: &[&str] = &["NODE_MODULES/", "NM/"];
pub(crate) const DOWNLOAD_PREFIXES: &[&str] = &["DOWNLOAD/", "DL/"];

/// A custom import hook. Returning `None` passes the URL on.
pub trait Importer {
    fn resolve(&self, url: &str) -> Option<PathBuf>;
}

impl<F> Importer for F
where
    F: Fn(&str) -> Option<PathBuf>,
{
    fn resolve(&self, url: &str) -> Option<PathBuf> {
        self(url)
    }
}

#[derive(Clone)]
pub struct ImportResolver {
    src_dir: PathBuf,
    node_modules: Option<PathBuf>,
    download_root: Option<PathBuf>,
    custom: Vec<(i32, Rc<dyn Importer>)>,
}

impl fmt::Debug for ImportResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportResolver")
            .field("src_dir", &self.src_dir)
            .field("node_modules", &self.node_modules)
            .field("download_root", &self.download_root)
            .field("custom", &self.custom.len())
            .finish()
    }
}

impl ImportResolver {
    /// `src_dir` should be absolute; `node_modules` is searched for once, among
    /// its ancestors.
    pub fn new(src_dir: &Path, download_root: Option<&Path>) -> Self {
        let node_modules = src_dir
            .ancestors()
            .skip(1)
            .map(|d| d.join("node_modules"))
            .find(|p| p.is_dir());
        if let Some(nm) = &node_modules {
            tracing::debug!("using node_modules at {}", nm.display());
        }
        Self {
            src_dir: src_dir.to_path_buf(),
            node_modules,
            download_root: download_root.map(Path::to_path_buf),
            custom: Vec::new(),
        }
    }

    /// Adds a custom importer; lower priorities are consulted first, ties keep
    /// insertion order.
    pub fn add_importer(&mut self, priority: i32, importer: Rc<dyn Importer>) {
        self.custom.push((priority, importer));
        self.custom.sort_by_key(|(p, _)| *p);
    }

    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        if let Some(rest) = strip_prefixes(url, SRC_PREFIXES) {
            return Some(self.src_dir.join(rest));
        }
        if let Some(nm) = &self.node_modules {
            if let Some(rest) = strip_prefixes(url, NODE_MODULES_PREFIXES) {
                return Some(nm.join(rest));
            }
        }
        if let Some(root) = &self.download_root {
            if let Some(rest) = strip_prefixes(url, DOWNLOAD_PREFIXES) {
                return Some(root.join(rest));
            }
        }
        self.custom.iter().find_map(|(_, imp)| imp.resolve(url))
    }

    /// Rewrites every quoted URL of `@import`, `@use` and `@forward` rules in
    /// `source` that this resolver maps to a path.
    pub fn rewrite_imports(&self, source: &str) -> String {
        static RULE: OnceLock<Regex> = OnceLock::new();
        static QUOTED: OnceLock<Regex> = OnceLock::new();
        let rule = RULE.get_or_init(|| Regex::new(r"@(?:import|use|forward)\b[^;{}]*").expect("valid regex"));
        let quoted = QUOTED.get_or_init(|| Regex::new(r#""([^"\n]*)"|'([^'\n]*)'"#).expect("valid regex"));

        rule.replace_all(source, |stmt: &Captures| {
            quoted
                .replace_all(&stmt[0], |q: &Captures| {
                    let url = q.get(1).or_else(|| q.get(2)).map_or("", |m| m.as_str());
                    match self.resolve(url) {
                        Some(path) => {
                            tracing::debug!("import \"{}\" ➤ \"{}\"", url, path.display());
                            format!("\"{}\"", path.to_string_lossy().replace('\\', "/"))
                        }
                        None => q[0].to_string(),
                    }
                })
                .into_owned()
        })
        .into_owned()
    }
}

/// Filesystem seen by the SASS compiler: stylesheets have their import URLs
/// rewritten through an [`ImportResolver`] as they are read.
#[derive(Debug)]
pub struct ResolvingFs<'a> {
    resolver: &'a ImportResolver,
}

impl<'a> ResolvingFs<'a> {
    pub fn new(resolver: &'a ImportResolver) -> Self {
        Self { resolver }
    }
}

impl grass::Fs for ResolvingFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let data = fs::read(path)?;
        let is_stylesheet = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("scss" | "sass" | "css")
        );
        if !is_stylesheet {
            return Ok(data);
        }
        match String::from_utf8(data) {
            Ok(text) => Ok(self.resolver.rewrite_imports(&text).into_bytes()),
            Err(e) => Ok(e.into_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_resolve_in_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        let nm = dir.path().join("node_modules");
        fs::create_dir_all(&nm).unwrap();
        let src = dir.path().join("project/sass");
        fs::create_dir_all(&src).unwrap();
        let dl = dir.path().join("static");

        let resolver = ImportResolver::new(&src, Some(&dl));
        assert_eq!(resolver.node_modules.as_deref(), Some(nm.as_path()));
        assert_eq!(resolver.resolve("SRC/a/b"), Some(src.join("a/b")));
        assert_eq!(resolver.resolve("NM/bootstrap/x"), Some(nm.join("bootstrap/x")));
        assert_eq!(resolver.resolve("NODE_MODULES/y"), Some(nm.join("y")));
        assert_eq!(resolver.resolve("DL/lib/z"), Some(dl.join("lib/z")));
        assert_eq!(resolver.resolve("DOWNLOAD/lib/z"), Some(dl.join("lib/z")));
        assert_eq!(resolver.resolve("partial"), None);
    }

    #[test]
    fn missing_roots_fall_through() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ImportResolver::new(dir.path(), None);
        assert_eq!(resolver.resolve("DL/x"), None);
    }

    #[test]
    fn custom_importers_sorted_by_priority() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = ImportResolver::new(dir.path(), None);
        resolver.add_importer(5, Rc::new(|url: &str| Some(PathBuf::from(format!("/late/{}", url)))));
        resolver.add_importer(
            1,
            Rc::new(|url: &str| url.strip_prefix("THEME/").map(|r| PathBuf::from("/themes").join(r))),
        );
        assert_eq!(resolver.resolve("THEME/dark"), Some(PathBuf::from("/themes/dark")));
        assert_eq!(resolver.resolve("other"), Some(PathBuf::from("/late/other")));
        assert_eq!(resolver.resolve("SRC/a"), Some(dir.path().join("a")));
    }

    #[test]
    fn rewrite_only_touches_import_rules() {
        let resolver = ImportResolver::new(Path::new("/proj/sass"), Some(Path::new("/dl")));
        let src = "@import 'DL/lib/x', \"local\";\n@use \"SRC/vars\" as v;\n.a { content: \"DL/not-an-import\"; }\n";
        let out = resolver.rewrite_imports(src);
        assert_eq!(
            out,
            "@import \"/dl/lib/x\", \"local\";\n@use \"/proj/sass/vars\" as v;\n.a { content: \"DL/not-an-import\"; }\n"
        );
    }
}
