//! File classification by path.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Source,
    Test,
    Config,
    Documentation,
    Other,
}

impl FileKind {
    pub const ALL: [FileKind; 5] = [
        FileKind::Source,
        FileKind::Test,
        FileKind::Config,
        FileKind::Documentation,
        FileKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Source => "source",
            FileKind::Test => "test",
            FileKind::Config => "config",
            FileKind::Documentation => "documentation",
            FileKind::Other => "other",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SOURCE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs", "py", "rs", "go", "java", "kt", "kts",
    "swift", "c", "h", "cc", "cpp", "hpp", "cs", "rb", "php", "scala", "lua", "dart", "vue",
    "svelte",
];

const CONFIG_EXTENSIONS: &[&str] = &[
    "json", "jsonc", "json5", "yaml", "yml", "toml", "ini", "xml", "env", "properties", "cfg",
    "conf",
];

/// File name prefixes of well-known dotfiles and manifests.
const CONFIG_PREFIXES: &[&str] = &[
    ".eslintrc",
    ".prettierrc",
    ".babelrc",
    ".editorconfig",
    ".npmrc",
    ".nvmrc",
    ".env",
    ".gitignore",
    ".gitattributes",
    ".dockerignore",
    "dockerfile",
    "makefile",
    "package.json",
    "tsconfig",
    "jsconfig",
];

const DOC_EXTENSIONS: &[&str] = &["md", "mdx", "markdown", "txt", "rst", "adoc"];

/// Directory segments that mark test code.
const TEST_SEGMENTS: &[&str] = &["test", "tests", "__tests__", "spec", "specs", "__mocks__", "e2e"];

/// File name infixes that mark test code.
const TEST_INFIXES: &[&str] = &[".test.", ".spec.", "_test.", "_spec.", ".e2e."];

/// Classify a root-relative, `/`-separated path.
///
/// Test markers win over every extension rule.
pub fn classify(relative: &str) -> FileKind {
    let lower = relative.to_ascii_lowercase();
    let mut segments: Vec<&str> = lower.split('/').collect();
    let file_name = segments.pop().unwrap_or_default();

    if segments.iter().any(|s| TEST_SEGMENTS.contains(s))
        || TEST_INFIXES.iter().any(|infix| file_name.contains(infix))
        || file_name.starts_with("test_")
    {
        return FileKind::Test;
    }

    let extension = file_name
        .rsplit_once('.')
        .map(|(stem, ext)| if stem.is_empty() { "" } else { ext })
        .unwrap_or("");

    if SOURCE_EXTENSIONS.contains(&extension) {
        FileKind::Source
    } else if CONFIG_EXTENSIONS.contains(&extension)
        || CONFIG_PREFIXES.iter().any(|p| file_name.starts_with(p))
    {
        FileKind::Config
    } else if DOC_EXTENSIONS.contains(&extension) {
        FileKind::Documentation
    } else {
        FileKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_markers_take_precedence() {
        assert_eq!(classify("src/user.test.ts"), FileKind::Test);
        assert_eq!(classify("src/user.spec.tsx"), FileKind::Test);
        assert_eq!(classify("src/__tests__/user.ts"), FileKind::Test);
        assert_eq!(classify("tests/fixtures/data.json"), FileKind::Test);
        assert_eq!(classify("pkg/handler_test.go"), FileKind::Test);
    }

    #[test]
    fn test_source_and_config() {
        assert_eq!(classify("src/index.ts"), FileKind::Source);
        assert_eq!(classify("lib/App.jsx"), FileKind::Source);
        assert_eq!(classify("package.json"), FileKind::Config);
        assert_eq!(classify("config/app.yaml"), FileKind::Config);
        assert_eq!(classify(".eslintrc"), FileKind::Config);
        assert_eq!(classify(".env.local"), FileKind::Config);
        assert_eq!(classify("Dockerfile"), FileKind::Config);
    }

    #[test]
    fn test_documentation_and_other() {
        assert_eq!(classify("README.md"), FileKind::Documentation);
        assert_eq!(classify("docs/guide.rst"), FileKind::Documentation);
        assert_eq!(classify("LICENSE"), FileKind::Other);
        assert_eq!(classify("assets/logo.svg"), FileKind::Other);
    }

    #[test]
    fn test_contest_is_not_a_test_segment() {
        // Only whole segments count
        assert_eq!(classify("contest/entry.ts"), FileKind::Source);
        assert_eq!(classify("latest/notes.md"), FileKind::Documentation);
    }
}
