//! Destination templates: `{name}` placeholders bound from regex captures.
//!
//! The result is always a normalised relative path that stays inside the
//! download root; anything else is a configuration error.

use regex::Regex;
use std::path::{Component, Path, PathBuf};

use crate::error::{GrabError, Result};

/// Regex applied to a URL in plain-file mode; `{filename}` is the last path segment.
pub const URL_FILENAME_PATTERN: &str = r"/(?P<filename>[^/]+)$";

/// Resolves `template` for `member` matched by `pattern`.
///
/// Named groups fill `{group}` placeholders. Without named groups, the last
/// positional group fills `{filename}`. An empty template or one ending in `/`
/// gets `{filename}` appended.
pub fn resolve(member: &str, template: &str, pattern: &Regex) -> Result<PathBuf> {
    let caps = pattern.captures(member).ok_or_else(|| {
        GrabError::config(format!(
            "\"{}\" does not match \"{}\"",
            member,
            pattern.as_str()
        ))
    })?;

    let mut dest = template.to_string();
    if dest.is_empty() || dest.ends_with('/') {
        dest.push_str("{filename}");
    }

    let named: Vec<&str> = pattern.capture_names().flatten().collect();
    if named.is_empty() {
        if caps.len() > 1 {
            let last = caps.get(caps.len() - 1).map_or("", |m| m.as_str());
            dest = dest.replace("{filename}", last);
        }
    } else {
        for name in named {
            let value = caps.name(name).map_or("", |m| m.as_str());
            dest = dest.replace(&format!("{{{}}}", name), value);
        }
    }

    let dest = dest.trim_matches(|c| c == ' ' || c == '/');
    if dest.is_empty() {
        return Err(GrabError::config(
            "destination path must not resolve to be empty",
        ));
    }
    if dest.contains(char::is_whitespace) {
        return Err(GrabError::config(format!(
            "destination path \"{}\" must not contain whitespace",
            dest
        )));
    }
    normalize_relative(dest)
}

/// Lexically normalises `path`, rejecting anything that leaves its root.
pub fn normalize_relative(path: &str) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return Err(GrabError::config(format!(
                        "path \"{}\" escapes its root directory",
                        path
                    )));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(GrabError::config(format!(
                    "path \"{}\" must be relative",
                    path
                )));
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Err(GrabError::config(format!(
            "path \"{}\" resolves to the root directory",
            path
        )));
    }
    Ok(out)
}

/// Relative path with its normal components joined by `/`, the form used in
/// lock files and log lines on every platform.
pub fn to_slash(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
