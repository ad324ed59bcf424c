use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// Replaces the first `%s` in `format` with `value`. Mirrors the subset of
/// `fmt.Sprintf`/printf semantics the reference matchers actually use: every
/// configured `format` string carries exactly one `%s` verb.
fn format_template(format: &str, value: &str) -> String {
    match format.find("%s") {
        Some(idx) => {
            let mut out = String::with_capacity(format.len() + value.len());
            out.push_str(&format[..idx]);
            out.push_str(value);
            out.push_str(&format[idx + 2..]);
            out
        }
        None => format.to_string(),
    }
}

fn compile(pattern: &str) -> Result<Regex, MatchError> {
    Regex::new(pattern).map_err(|source| MatchError::InvalidRegex { pattern: pattern.to_string(), source })
}

fn read_lines(path: &PathBuf) -> Result<Vec<String>, MatchError> {
    let content = fs_err::read_to_string(path).map_err(|source| MatchError::ReadFile {
        path: path.clone(),
        source: source.into(),
    })?;
    Ok(content.split('\n').map(str::to_string).collect())
}

/// First line (scanning from the top) whose `regex` captures at least one
/// group; returns that first captured group formatted through `format`.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    pub file: PathBuf,
    pub regex: String,
    pub format: String,
}

impl RegexMatcher {
    pub fn find(&self) -> Result<Option<String>, MatchError> {
        let pattern = compile(&self.regex)?;
        let lines = read_lines(&self.file)?;
        for line in &lines {
            if let Some(captures) = pattern.captures(line) {
                if let Some(group) = captures.get(1) {
                    return Ok(Some(format_template(&self.format, group.as_str())));
                }
            }
        }
        tracing::debug!(file = %self.file.display(), pattern = %self.regex, "no match found");
        Ok(None)
    }
}

/// Scans for an anchor line, then looks for `regex` within the next
/// `max_lines` lines starting at the anchor (window clamped to the file's
/// actual length). Does not fall through to a later anchor if the window
/// yields no match.
#[derive(Debug, Clone)]
pub struct AnchorMatcher {
    pub file: PathBuf,
    pub anchor_regex: String,
    pub regex: String,
    pub format: String,
    pub max_lines: usize,
}

impl AnchorMatcher {
    pub fn find(&self) -> Result<Option<String>, MatchError> {
        let anchor = compile(&self.anchor_regex)?;
        let pattern = compile(&self.regex)?;
        let lines = read_lines(&self.file)?;

        for (i, line) in lines.iter().enumerate() {
            if !anchor.is_match(line) {
                continue;
            }
            let window_end = (i + self.max_lines).min(lines.len());
            for line2 in &lines[i..window_end] {
                if let Some(captures) = pattern.captures(line2) {
                    if let Some(group) = captures.get(1) {
                        return Ok(Some(format_template(&self.format, group.as_str())));
                    }
                }
            }
            // Anchor found but no match in its window: per spec this is
            // unmatched, we do not keep scanning for a later anchor.
            return Ok(None);
        }

        tracing::debug!(file = %self.file.display(), anchor = %self.anchor_regex, "no anchor found");
        Ok(None)
    }
}

/// A tagged configuration describing how to locate one field (URL or hash)
/// of one package. Immutable after load.
#[derive(Debug, Clone)]
pub enum MatcherSpec {
    Anchor(AnchorMatcher),
    Regex(RegexMatcher),
    Hardcoded(String),
    Nil,
}

impl MatcherSpec {
    /// Runs the matcher. `Ok(None)` means "unmatched, not an error" — the
    /// owning package is skipped for this tick without logging an error.
    pub fn find(&self) -> Result<Option<String>, MatchError> {
        match self {
            MatcherSpec::Anchor(m) => m.find(),
            MatcherSpec::Regex(m) => m.find(),
            MatcherSpec::Hardcoded(format) => Ok(Some(format.clone())),
            MatcherSpec::Nil => Ok(None),
        }
    }
}

/// The raw, serializable shape of a matcher as it appears in `prefetches.json`.
/// Converted into a [`MatcherSpec`] (which resolves `file` against the source
/// directory) by [`crate::package::Package::from_config`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatcherSpecConfig {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub regex: String,
    #[serde(default)]
    pub anchor_regex: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub max_lines: usize,
}

/// Builds a [`MatcherSpec`] from its config shape, joining `file` against
/// `src_dir`. Returns an error only for an unrecognized `type` discriminant —
/// everything else about a `MatcherSpec` is validated lazily, at match time,
/// same as the reference implementation.
pub fn build_matcher(src_dir: &std::path::Path, config: &MatcherSpecConfig) -> Result<MatcherSpec, String> {
    let spec = match config.kind.as_str() {
        "anchor" => MatcherSpec::Anchor(AnchorMatcher {
            file: src_dir.join(&config.file),
            anchor_regex: config.anchor_regex.clone(),
            regex: config.regex.clone(),
            format: config.format.clone(),
            max_lines: config.max_lines,
        }),
        "regex" => MatcherSpec::Regex(RegexMatcher {
            file: src_dir.join(&config.file),
            regex: config.regex.clone(),
            format: config.format.clone(),
        }),
        "hardcoded" => MatcherSpec::Hardcoded(config.format.clone()),
        "" => MatcherSpec::Nil,
        other => return Err(format!("unsupported matcher type: {other}")),
    };
    Ok(spec)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn regex_matcher_finds_first_line_with_two_submatches() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            &dir,
            "BUILD",
            "irrelevant line\nurl = \"https://example.com/pkg.tgz\"\nother = \"nope\"\n",
        );
        let m = RegexMatcher {
            file,
            regex: r#"url\s*=\s*"([^"]+)""#.to_string(),
            format: "%s".to_string(),
        };
        assert_eq!(m.find().unwrap(), Some("https://example.com/pkg.tgz".to_string()));
    }

    #[test]
    fn regex_matcher_applies_format_template() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "BUILD", "sha256 = \"deadbeef\"\n");
        let m = RegexMatcher {
            file,
            regex: r#"sha256\s*=\s*"([0-9a-f]+)""#.to_string(),
            format: "hash:%s".to_string(),
        };
        assert_eq!(m.find().unwrap(), Some("hash:deadbeef".to_string()));
    }

    #[test]
    fn anchor_matcher_restricts_to_window_after_anchor() {
        let dir = tempfile::tempdir().unwrap();
        // anchor at line 1 (0-indexed), match candidate is 3 lines after --
        // outside a max_lines=2 window.
        let file = write_file(
            &dir,
            "BUILD",
            "noop\nANCHOR\nfiller\nfiller\nurl = \"https://example.com/a\"\n",
        );
        let m = AnchorMatcher {
            file: file.clone(),
            anchor_regex: "ANCHOR".to_string(),
            regex: r#"url\s*=\s*"([^"]+)""#.to_string(),
            format: "%s".to_string(),
            max_lines: 2,
        };
        assert_eq!(m.find().unwrap(), None);

        let m = AnchorMatcher { max_lines: 4, ..m };
        assert_eq!(m.find().unwrap(), Some("https://example.com/a".to_string()));
        let _ = file;
    }

    #[test]
    fn anchor_matcher_window_does_not_run_past_end_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "BUILD", "ANCHOR\nonly one more line\n");
        let m = AnchorMatcher {
            file,
            anchor_regex: "ANCHOR".to_string(),
            regex: r#"url\s*=\s*"([^"]+)""#.to_string(),
            format: "%s".to_string(),
            max_lines: 1000,
        };
        // Should not panic indexing past the file's line count.
        assert_eq!(m.find().unwrap(), None);
    }

    #[test]
    fn anchor_matcher_does_not_fall_through_to_a_later_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            &dir,
            "BUILD",
            "ANCHOR\nno match here\nANCHOR\nurl = \"https://example.com/b\"\n",
        );
        let m = AnchorMatcher {
            file,
            anchor_regex: "ANCHOR".to_string(),
            regex: r#"url\s*=\s*"([^"]+)""#.to_string(),
            format: "%s".to_string(),
            max_lines: 1,
        };
        assert_eq!(m.find().unwrap(), None);
    }

    #[test]
    fn hardcoded_matcher_always_matches_without_file_io() {
        let m = MatcherSpec::Hardcoded("https://example.com/fixed.tgz".to_string());
        assert_eq!(m.find().unwrap(), Some("https://example.com/fixed.tgz".to_string()));
    }

    #[test]
    fn nil_matcher_never_matches() {
        assert_eq!(MatcherSpec::Nil.find().unwrap(), None);
    }

    #[test]
    fn invalid_regex_surfaces_as_match_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "BUILD", "anything\n");
        let m = RegexMatcher { file, regex: "(unterminated".to_string(), format: "%s".to_string() };
        assert!(matches!(m.find(), Err(MatchError::InvalidRegex { .. })));
    }

    #[test]
    fn missing_file_surfaces_as_match_error() {
        let m = RegexMatcher {
            file: PathBuf::from("/does/not/exist"),
            regex: "(.*)".to_string(),
            format: "%s".to_string(),
        };
        assert!(matches!(m.find(), Err(MatchError::ReadFile { .. })));
    }

    #[test]
    fn build_matcher_rejects_unknown_type() {
        let dir = tempfile::tempdir().unwrap();
        let config = MatcherSpecConfig { kind: "xml".to_string(), ..Default::default() };
        assert!(build_matcher(dir.path(), &config).is_err());
    }
}
