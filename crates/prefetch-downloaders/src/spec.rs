use serde::Deserialize;

/// The gate half of one `ArgRule`: `{"type", "pattern"}`, mirroring the
/// matcher shape `prefetches.json` itself uses. Only `type = "regex"`
/// resolves to anything today — the discriminant exists for future matcher
/// kinds, same as the reference implementation's `argConf.Matcher.Type`.
#[derive(Debug, Clone, Deserialize)]
pub struct ArgRuleMatcher {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub pattern: String,
}

/// A matcher-gated slice of extra argv appended when a URL matches
/// `matcher.pattern`.
#[derive(Debug, Clone, Deserialize)]
pub struct ArgRule {
    pub matcher: ArgRuleMatcher,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Describes one downloader: the executable to run, the args always passed,
/// and the conditional rules that add more args for URLs matching a
/// pattern. Deserialized straight from one `downloaders[]` entry of
/// `server.json`, whose per-rule key is `args` (not `rules`).
#[derive(Debug, Clone, Deserialize)]
pub struct DownloaderSpec {
    pub name: String,
    pub cmd: String,
    #[serde(default)]
    pub default_args: Vec<String>,
    #[serde(default, rename = "args")]
    pub rules: Vec<ArgRule>,
}
