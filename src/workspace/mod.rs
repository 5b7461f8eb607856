//! Workspace file discovery, exclusion patterns and classification.

pub mod classify;
pub mod pattern;
pub mod scanner;

pub use classify::{FileKind, classify};
pub use pattern::{ExclusionSet, PatternMatcher};
pub use scanner::{ScanStats, WorkspaceFile, WorkspaceScanner};
