//! Project configuration loaded from `grablib.yml`, `grablib.json` or `grablib.toml`.

use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::build::hash::DEFAULT_HASH_LENGTH;
use crate::checksum::HashAlgorithm;
use crate::error::{GrabError, Result};
use crate::spec::DownloadSpec;

/// File names searched, in order, when no config file is given.
pub const STD_FILE_NAMES: &[&str] = &[
    "grablib.yml",
    "grablib.yaml",
    "grablib.json",
    "grablib.toml",
];

/// Built-in aliases substituted into source identifiers.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("GITHUB", "https://raw.githubusercontent.com"),
    ("CDNJS", "http://cdnjs.cloudflare.com/ajax/libs"),
];

fn default_download_root() -> PathBuf {
    PathBuf::from("./static/")
}

fn default_lock() -> Option<PathBuf> {
    Some(PathBuf::from(".grablib.lock"))
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GrabConfig {
    /// Directory downloads are written to.
    #[serde(default = "default_download_root")]
    pub download_root: PathBuf,
    /// Files and archives to download, in processing order.
    #[serde(default)]
    pub download: Option<DownloadSpec>,
    /// Extra aliases merged over [`DEFAULT_ALIASES`].
    #[serde(default)]
    pub aliases: IndexMap<String, String>,
    /// Lock file path; `null` (or an empty string) disables locking.
    #[serde(default = "default_lock")]
    pub lock: Option<PathBuf>,
    #[serde(default)]
    pub build_root: Option<PathBuf>,
    #[serde(default)]
    pub build: Option<BuildConfig>,
    #[serde(default)]
    pub debug: bool,
    /// Directory relative build sources are resolved against (the config file's directory).
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// `build` section: steps run in the order wipe, cat, sass.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildConfig {
    /// Regexes of build-root-relative paths to delete before building.
    #[serde(default, deserialize_with = "one_or_many")]
    pub wipe: Vec<String>,
    #[serde(default)]
    pub cat: IndexMap<String, Vec<CatSource>>,
    #[serde(default)]
    pub sass: IndexMap<String, SassEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawCatSource")]
pub struct CatSource {
    pub src: String,
    /// Regex → replacement applied to this source's content.
    pub replace: IndexMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCatSource {
    Path(String),
    Detailed {
        src: String,
        #[serde(default)]
        replace: IndexMap<String, String>,
    },
}

impl From<RawCatSource> for CatSource {
    fn from(raw: RawCatSource) -> Self {
        match raw {
            RawCatSource::Path(src) => CatSource {
                src,
                replace: IndexMap::new(),
            },
            RawCatSource::Detailed { src, replace } => CatSource { src, replace },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawSassEntry")]
pub struct SassEntry {
    pub src: String,
    pub include: Option<String>,
    pub exclude: Option<String>,
    /// Path regex → (pattern → replacement) applied to generated css.
    pub replace: IndexMap<String, IndexMap<String, String>>,
    /// Insert a content hash into output file names.
    pub hash: bool,
    /// Digest characters kept in hashed file names.
    pub hash_length: usize,
    pub hash_algorithm: HashAlgorithm,
}

fn default_hash_length() -> usize {
    DEFAULT_HASH_LENGTH
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSassEntry {
    Path(String),
    Detailed {
        src: String,
        #[serde(default)]
        include: Option<String>,
        #[serde(default)]
        exclude: Option<String>,
        #[serde(default)]
        replace: IndexMap<String, IndexMap<String, String>>,
        #[serde(default)]
        hash: bool,
        #[serde(default = "default_hash_length")]
        hash_length: usize,
        #[serde(default)]
        hash_algorithm: HashAlgorithm,
    },
}

impl From<RawSassEntry> for SassEntry {
    fn from(raw: RawSassEntry) -> Self {
        match raw {
            RawSassEntry::Path(src) => SassEntry {
                src,
                include: None,
                exclude: None,
                replace: IndexMap::new(),
                hash: false,
                hash_length: DEFAULT_HASH_LENGTH,
                hash_algorithm: HashAlgorithm::default(),
            },
            RawSassEntry::Detailed {
                src,
                include,
                exclude,
                replace,
                hash,
                hash_length,
                hash_algorithm,
            } => SassEntry {
                src,
                include,
                exclude,
                replace,
                hash,
                hash_length,
                hash_algorithm,
            },
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

impl GrabConfig {
    /// Enabled lock file path, if any.
    pub fn lock_path(&self) -> Option<&Path> {
        self.lock
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Makes relative roots and the lock path absolute against `base`.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        self.base_dir = base.to_path_buf();
        self.download_root = absolutize(base, &self.download_root);
        if let Some(lock) = self.lock.as_mut().filter(|p| !p.as_os_str().is_empty()) {
            *lock = absolutize(base, lock);
        }
        if let Some(build_root) = self.build_root.as_mut() {
            *build_root = absolutize(base, build_root);
        }
    }

    /// Immutable alias table: built-ins first, then config overrides.
    pub fn alias_table(&self) -> AliasTable {
        AliasTable::new(&self.aliases)
    }
}

fn absolutize(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        let rel: PathBuf = p
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();
        base.join(rel)
    }
}

/// Token → replacement map applied to source identifiers by literal substitution.
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: IndexMap<String, String>,
}

impl AliasTable {
    pub fn new(overrides: &IndexMap<String, String>) -> Self {
        let mut entries: IndexMap<String, String> = DEFAULT_ALIASES
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (k, v) in overrides {
            entries.insert(k.clone(), v.clone());
        }
        Self { entries }
    }

    /// Replaces every alias token in `source`; unknown tokens pass through.
    pub fn expand(&self, source: &str) -> String {
        let mut out = source.to_string();
        for (token, value) in &self.entries {
            out = out.replace(token.as_str(), value);
        }
        out
    }
}

/// Finds the first standard config file in `dir`.
pub fn find_config_file(dir: &Path) -> Result<PathBuf> {
    STD_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            GrabError::config(
                "Unable to find config file with standard name \"grablib.yml\" or \"grablib.json\" \
                 in the current working directory",
            )
        })
}

/// Loads a config file, choosing the parser by extension, and resolves relative
/// paths against the file's directory.
pub fn load(path: &Path) -> Result<GrabConfig> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let data = fs::read_to_string(path).map_err(GrabError::io("read", path))?;
    let parse_err = |e: String| GrabError::config(format!("error loading \"{}\": {}", path.display(), e));

    let mut cfg: GrabConfig = if name.ends_with(".yml") || name.ends_with(".yaml") {
        tracing::debug!("processing {} as a yaml file", path.display());
        serde_yaml::from_str(&data).map_err(|e| parse_err(e.to_string()))?
    } else if name.ends_with(".json") {
        tracing::debug!("processing {} as a json file", path.display());
        serde_json::from_str(&data).map_err(|e| parse_err(e.to_string()))?
    } else if name.ends_with(".toml") {
        tracing::debug!("processing {} as a toml file", path.display());
        toml::from_str(&data).map_err(|e| parse_err(e.to_string()))?
    } else {
        return Err(GrabError::config(format!(
            "Unexpected extension for \"{}\", should be json, yml/yaml or toml",
            name
        )));
    };

    let cwd = std::env::current_dir().map_err(GrabError::io("resolve", Path::new(".")))?;
    cfg.resolve_relative_to(&config_dir(path, &cwd));
    Ok(cfg)
}

/// Absolute directory of the config file at `path`, relative to `cwd`.
fn config_dir(path: &Path, cwd: &Path) -> PathBuf {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => absolutize(cwd, dir),
        None => cwd.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Target;

    #[test]
    fn yaml_defaults() {
        let cfg: GrabConfig =
            serde_yaml::from_str("download:\n  'http://wherever.com/file.js': x").unwrap();
        assert_eq!(cfg.download_root, PathBuf::from("./static/"));
        assert_eq!(cfg.lock_path(), Some(Path::new(".grablib.lock")));
        assert!(!cfg.debug);
        assert!(cfg.build.is_none());
        let download = cfg.download.unwrap();
        assert!(matches!(&download["http://wherever.com/file.js"], Target::Plain(d) if d == "x"));
    }

    #[test]
    fn null_lock_disables_locking() {
        let cfg: GrabConfig = serde_yaml::from_str("lock: null\ndownload: {}").unwrap();
        assert!(cfg.lock_path().is_none());
        let cfg: GrabConfig = toml::from_str("lock = \"\"").unwrap();
        assert!(cfg.lock_path().is_none());
    }

    #[test]
    fn build_section_shapes() {
        let yaml = r#"
build_root: built_at
debug: true
build:
  wipe: '.*'
  cat:
    "libs.min.js":
      - "./foo.js"
      - src: "./bar.js"
        replace:
          "change": "!new_value"
  sass:
    css: sass_dir
    other:
      src: sass2
      exclude: 'adir/.*$'
      hash: true
      hash_length: 12
      hash_algorithm: sha256
      replace:
        "foo.scss$":
          black: white
"#;
        let cfg: GrabConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.debug);
        let build = cfg.build.unwrap();
        assert_eq!(build.wipe, vec![".*".to_string()]);
        let cat = &build.cat["libs.min.js"];
        assert_eq!(cat[0].src, "./foo.js");
        assert!(cat[0].replace.is_empty());
        assert_eq!(cat[1].replace["change"], "!new_value");
        assert_eq!(build.sass["css"].src, "sass_dir");
        assert!(!build.sass["css"].hash);
        assert_eq!(build.sass["css"].hash_length, DEFAULT_HASH_LENGTH);
        assert_eq!(build.sass["css"].hash_algorithm, HashAlgorithm::Md5);
        let other = &build.sass["other"];
        assert_eq!(other.exclude.as_deref(), Some("adir/.*$"));
        assert!(other.hash);
        assert_eq!(other.hash_length, 12);
        assert_eq!(other.hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(other.replace["foo.scss$"]["black"], "white");
    }

    #[test]
    fn cat_sources_must_be_a_list() {
        let res: std::result::Result<GrabConfig, _> =
            serde_yaml::from_str("build:\n  cat:\n    libs.min.js: not_a_list");
        assert!(res.is_err());
    }

    #[test]
    fn aliases_override_and_expand() {
        let mut overrides = IndexMap::new();
        overrides.insert("WHATEVER".to_string(), "https://www.whatever.com".to_string());
        let table = AliasTable::new(&overrides);
        assert_eq!(table.expand("WHATEVER/foo.js"), "https://www.whatever.com/foo.js");
        assert_eq!(
            table.expand("GITHUB/a/b.js"),
            "https://raw.githubusercontent.com/a/b.js"
        );
        assert_eq!(table.expand("UNKNOWN/x.js"), "UNKNOWN/x.js");
    }

    #[test]
    fn load_by_extension_and_resolve_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grablib.json");
        fs::write(
            &path,
            r#"{"download_root": "dl", "download": {"http://x/f.js": "f.js"}}"#,
        )
        .unwrap();
        let cfg = load(&path).unwrap();
        assert_eq!(cfg.download_root, dir.path().join("dl"));
        assert_eq!(cfg.base_dir, dir.path());
        assert_eq!(cfg.lock_path(), Some(dir.path().join(".grablib.lock").as_path()));

        let bad = dir.path().join("grablib.notjson");
        fs::write(&bad, "{}").unwrap();
        let err = load(&bad).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected extension for \"grablib.notjson\", should be json, yml/yaml or toml"
        );
    }

    #[test]
    fn relative_config_path_gives_absolute_roots() {
        let cwd = Path::new("/work/project");
        assert_eq!(config_dir(Path::new("grablib.yml"), cwd), cwd);
        assert_eq!(config_dir(Path::new("conf/grablib.yml"), cwd), cwd.join("conf"));
        assert_eq!(config_dir(Path::new("/etc/grablib.yml"), cwd), Path::new("/etc"));

        let mut cfg: GrabConfig = serde_yaml::from_str("build_root: built").unwrap();
        cfg.resolve_relative_to(&config_dir(Path::new("grablib.yml"), cwd));
        assert_eq!(cfg.build_root.as_deref(), Some(Path::new("/work/project/built")));
        assert_eq!(cfg.download_root, Path::new("/work/project/static"));
    }

    #[test]
    fn find_config_file_prefers_yaml() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_config_file(dir.path()).is_err());
        fs::write(dir.path().join("grablib.json"), "{}").unwrap();
        fs::write(dir.path().join("grablib.yml"), "{}").unwrap();
        assert_eq!(
            find_config_file(dir.path()).unwrap(),
            dir.path().join("grablib.yml")
        );
    }
}
