//! Symbol model shared by the indexer and its callers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    Class,
    Interface,
    Function,
    Method,
    Property,
    Variable,
    Enum,
    TypeAlias,
    Namespace,
    Module,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Property => "property",
            SymbolKind::Variable => "variable",
            SymbolKind::Enum => "enum",
            SymbolKind::TypeAlias => "type-alias",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Module => "module",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymbolKind {
    type Err = String;

    /// Accepts the kebab-case name as well as upper/snake spellings
    /// such as `TYPE_ALIAS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "class" => Ok(SymbolKind::Class),
            "interface" => Ok(SymbolKind::Interface),
            "function" => Ok(SymbolKind::Function),
            "method" => Ok(SymbolKind::Method),
            "property" => Ok(SymbolKind::Property),
            "variable" => Ok(SymbolKind::Variable),
            "enum" => Ok(SymbolKind::Enum),
            "type-alias" | "typealias" | "type" => Ok(SymbolKind::TypeAlias),
            "namespace" => Ok(SymbolKind::Namespace),
            "module" => Ok(SymbolKind::Module),
            other => Err(format!("unknown symbol kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Exported,
    Default,
    #[default]
    None,
}

impl ExportStatus {
    pub fn from_modifiers(exported: bool, default: bool) -> Self {
        match (exported, default) {
            (true, true) => ExportStatus::Default,
            (true, false) => ExportStatus::Exported,
            _ => ExportStatus::None,
        }
    }
}

/// 1-indexed source position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
    /// Empty when the declaration has no doc comment
    pub documentation: String,
    pub export: ExportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Symbol>,
}

impl Symbol {
    /// Case-insensitive substring match on name or documentation.
    /// `needle` must already be lowercase.
    pub(crate) fn matches_text(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.documentation.to_lowercase().contains(needle)
    }

    /// Number of symbols in this subtree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Symbol::count).sum::<usize>()
    }
}
