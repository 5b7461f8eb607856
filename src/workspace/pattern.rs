//! Exclusion pattern matching for workspace discovery.
//!
//! Patterns use gitignore-flavoured glob syntax:
//! - `*` matches within one path segment, `**` across segments
//! - a pattern without an inner `/` matches at any depth (`*.log`, `dist/`)
//! - a leading `/` anchors the pattern to the workspace root
//! - a trailing `/` makes the pattern directory-only; it also excludes
//!   everything below the directory
//!
//! Each pattern is compiled with the `glob` crate. A pattern the crate
//! rejects degrades to a simplified matcher instead of being dropped.

use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Directories excluded in every workspace.
pub const BUILTIN_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "bower_components",
    "dist",
    "build",
    "out",
    "target",
    "coverage",
    ".next",
    ".nuxt",
    ".cache",
    ".turbo",
    "__pycache__",
    ".venv",
    ".codescope",
];

/// Binary and archive extensions excluded in every workspace.
pub const BUILTIN_EXCLUDED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "pdf", "zip", "tar", "gz", "tgz", "7z",
    "rar", "exe", "dll", "so", "dylib", "o", "a", "class", "jar", "wasm", "woff", "woff2", "ttf",
    "eot", "otf", "mp3", "mp4", "mov", "avi", "pyc",
];

/// A single compiled exclusion pattern.
#[derive(Debug, Clone)]
pub enum PatternMatcher {
    /// Full glob semantics.
    Glob { raw: String, pattern: Pattern },
    /// Degraded matcher: exact, single-wildcard prefix/suffix, or
    /// `**`-split prefix/suffix containment.
    Simple { raw: String, normalized: String },
}

impl PatternMatcher {
    /// Compile an ignore-file style pattern.
    pub fn compile(raw: &str) -> Self {
        let normalized = normalize(raw);
        match Pattern::new(&normalized) {
            Ok(pattern) => Self::Glob {
                raw: raw.to_string(),
                pattern,
            },
            Err(e) => {
                tracing::debug!(target: "scanner", "pattern '{raw}' falls back to simple matching: {e}");
                Self::simple(raw)
            }
        }
    }

    /// Build the simplified matcher directly.
    pub fn simple(raw: &str) -> Self {
        Self::Simple {
            raw: raw.to_string(),
            normalized: normalize(raw),
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            Self::Glob { raw, .. } | Self::Simple { raw, .. } => raw,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Simple { .. })
    }

    /// Test a normalized, root-relative path.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Glob { pattern, .. } => pattern.matches_with(path, MATCH_OPTIONS),
            Self::Simple { normalized, .. } => simple_match(normalized, path),
        }
    }
}

/// Turn an ignore-file line into a root-relative glob.
fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let (anchored, body) = match trimmed.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let (dir_only, body) = match body.strip_suffix('/') {
        Some(rest) => (true, rest),
        None => (false, body),
    };

    let mut pattern = String::with_capacity(body.len() + 6);
    if !anchored && !body.contains('/') && !body.starts_with("**") {
        pattern.push_str("**/");
    }
    pattern.push_str(body);
    if dir_only {
        pattern.push_str("/**");
    }
    pattern
}

fn simple_match(pattern: &str, path: &str) -> bool {
    if pattern == path {
        return true;
    }

    if pattern.contains("**") {
        let anchored = !pattern.starts_with("**");
        let open_ended = pattern.ends_with("**");
        let parts: Vec<&str> = pattern
            .split("**")
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
            .collect();

        let mut rest = path;
        for (idx, part) in parts.iter().enumerate() {
            let last = idx + 1 == parts.len();
            if idx == 0 && anchored {
                if rest != *part && !rest.starts_with(&format!("{part}/")) {
                    return false;
                }
                rest = &rest[part.len()..];
            } else if last && !open_ended {
                return suffix_match(rest, part);
            } else {
                let hay = format!("/{}/", rest.trim_start_matches('/'));
                match hay.find(&format!("/{part}/")) {
                    Some(pos) => {
                        let consumed = (pos + part.len() + 1).min(rest.len());
                        rest = &rest[consumed..];
                    }
                    None => return false,
                }
            }
        }
        return true;
    }

    if pattern.matches('*').count() == 1 {
        if let Some(tail) = pattern.strip_prefix('*') {
            return path.ends_with(tail);
        }
        if let Some(head) = pattern.strip_suffix('*') {
            return path.starts_with(head);
        }
    }

    false
}

fn suffix_match(rest: &str, part: &str) -> bool {
    match part.strip_prefix('*') {
        Some(tail) if !tail.contains('*') => rest.ends_with(tail),
        _ => rest.trim_start_matches('/') == part || rest.ends_with(&format!("/{part}")),
    }
}

/// The combined exclusion set for one scan: built-ins plus ignore-file lines.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    matchers: Vec<PatternMatcher>,
}

impl ExclusionSet {
    /// The fixed built-in patterns only.
    pub fn builtin() -> Self {
        let mut matchers = Vec::with_capacity(
            BUILTIN_EXCLUDED_DIRS.len() + BUILTIN_EXCLUDED_EXTENSIONS.len(),
        );
        for dir in BUILTIN_EXCLUDED_DIRS {
            matchers.push(PatternMatcher::compile(&format!("{dir}/")));
        }
        for ext in BUILTIN_EXCLUDED_EXTENSIONS {
            matchers.push(PatternMatcher::compile(&format!("*.{ext}")));
        }
        Self { matchers }
    }

    /// Append patterns, skipping blank lines, `#` comments and negations.
    pub fn extend<'a>(&mut self, patterns: impl IntoIterator<Item = &'a str>) {
        for line in patterns {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('!') {
                tracing::debug!(target: "scanner", "negated pattern '{line}' is not supported, skipping");
                continue;
            }
            self.matchers.push(PatternMatcher::compile(line));
        }
    }

    /// Parse ignore-file content and append its patterns.
    pub fn extend_from_ignore_file(&mut self, content: &str) {
        self.extend(content.lines());
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Whether a root-relative path is excluded.
    ///
    /// Directories are also tested in their `dir/` and `dir/**` forms so
    /// directory-only patterns catch the directory itself.
    pub fn is_excluded(&self, relative: &str, is_dir: bool) -> bool {
        if relative.is_empty() {
            return false;
        }
        let variants: Vec<String> = if is_dir {
            vec![
                relative.to_string(),
                format!("{relative}/"),
                format!("{relative}/**"),
            ]
        } else {
            vec![relative.to_string()]
        };

        self.matchers
            .iter()
            .any(|m| variants.iter().any(|candidate| m.matches(candidate)))
    }
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::builtin()
    }
}
