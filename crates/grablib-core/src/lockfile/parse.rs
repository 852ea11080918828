//! Lock file text format: `<digest> <source> <path>` per line.

use crate::error::{GrabError, Result};

/// One parsed lock line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLine {
    pub digest: String,
    pub source: String,
    pub path: String,
}

/// Parses lock file text. Blank lines and lines whose first non-space
/// character is `#` are skipped.
pub fn parse(text: &str) -> Result<Vec<LockLine>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim_start_matches(' ');
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(' ').collect();
        let [digest, source, path] = fields.as_slice() else {
            return Err(GrabError::config(format!(
                "invalid lock file line {}: expected \"<digest> <source> <path>\", got {:?}",
                idx + 1,
                line
            )));
        };
        out.push(LockLine {
            digest: digest.to_string(),
            source: source.to_string(),
            path: path.to_string(),
        });
    }
    Ok(out)
}

/// Renders one lock line (no trailing newline).
pub fn render_line(digest: &str, source: &str, path: &str) -> String {
    format!("{} {} {}", digest, source, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_comments_and_blanks() {
        let text = "\n# header\n  # indented comment\nabc http://x/a.js a.js\n\ndef :stale old.js\n";
        let lines = parse(text).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            LockLine {
                digest: "abc".into(),
                source: "http://x/a.js".into(),
                path: "a.js".into(),
            }
        );
        assert_eq!(lines[1].source, ":stale");
    }

    #[test]
    fn parse_rejects_wrong_field_count_with_line_number() {
        let err = parse("abc http://x/a.js a.js\nonly two\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 2"), "{msg}");
        assert!(matches!(err, GrabError::Config(_)));
        assert!(parse("a b c d").is_err());
    }

    #[test]
    fn render_line_layout() {
        assert_eq!(render_line("d", "s", "p"), "d s p");
    }
}
