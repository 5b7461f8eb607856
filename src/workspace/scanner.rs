//! Workspace discovery.
//!
//! Walks a workspace root depth-first, skipping anything matched by the
//! exclusion set (built-ins, the root ignore file and configured extras),
//! and records every remaining file with its classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::classify::{FileKind, classify};
use super::pattern::{ExclusionSet, PatternMatcher};
use crate::config::ScannerConfig;
use crate::error::{ErrorReport, ScanError, ScanResult};

/// One discovered file. Recreated on every scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFile {
    pub path: PathBuf,
    /// Root-relative path with `/` separators
    pub relative_path: String,
    pub kind: FileKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// File counts per classification for the most recent scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub source: usize,
    pub test: usize,
    pub config: usize,
    pub documentation: usize,
    pub other: usize,
    pub total: usize,
    pub total_bytes: u64,
}

impl ScanStats {
    pub fn count(&self, kind: FileKind) -> usize {
        match kind {
            FileKind::Source => self.source,
            FileKind::Test => self.test,
            FileKind::Config => self.config,
            FileKind::Documentation => self.documentation,
            FileKind::Other => self.other,
        }
    }

    fn record(&mut self, file: &WorkspaceFile) {
        match file.kind {
            FileKind::Source => self.source += 1,
            FileKind::Test => self.test += 1,
            FileKind::Config => self.config += 1,
            FileKind::Documentation => self.documentation += 1,
            FileKind::Other => self.other += 1,
        }
        self.total += 1;
        self.total_bytes += file.size;
    }
}

/// Discovers and classifies the files of one workspace.
pub struct WorkspaceScanner {
    root: PathBuf,
    config: ScannerConfig,
    files: Option<Vec<WorkspaceFile>>,
}

impl WorkspaceScanner {
    pub fn new(root: impl Into<PathBuf>, config: ScannerConfig) -> Self {
        Self {
            root: root.into(),
            config,
            files: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Results of the most recent scan, empty if none ran yet.
    pub fn files(&self) -> &[WorkspaceFile] {
        self.files.as_deref().unwrap_or_default()
    }

    /// Scan `root`, which becomes the scanner's workspace root.
    ///
    /// Fails only when the root itself is unusable; unreadable directories
    /// below it are logged and skipped.
    pub fn scan(&mut self, root: impl AsRef<Path>) -> ScanResult<Vec<WorkspaceFile>> {
        let root = root.as_ref();
        let metadata = fs::metadata(root).map_err(|source| ScanError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        fs::read_dir(root).map_err(|source| ScanError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;

        self.root = root.to_path_buf();
        let exclusions = self.exclusions();
        tracing::debug!(
            target: "scanner",
            "scanning {} with {} exclusion patterns",
            root.display(),
            exclusions.len()
        );

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .max_depth(self.config.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| keep_entry(root, entry, &exclusions));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(target: "scanner", "skipping unreadable entry: {}", ErrorReport::from_error(&e));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(relative_path) = relative_of(root, entry.path()) else {
                continue;
            };
            let (size, modified) = match entry.metadata() {
                Ok(meta) => (meta.len(), meta.modified().ok().map(DateTime::<Utc>::from)),
                Err(e) => {
                    tracing::warn!(target: "scanner", "no metadata for {relative_path}: {e}");
                    (0, None)
                }
            };
            files.push(WorkspaceFile {
                path: entry.path().to_path_buf(),
                kind: classify(&relative_path),
                relative_path,
                size,
                modified,
            });
        }

        crate::debug_event!("scanner", "scan complete", "{} files", files.len());
        self.files = Some(files.clone());
        Ok(files)
    }

    /// Files from the most recent scan whose relative path matches `pattern`.
    ///
    /// Scans the current root first if no scan has run.
    pub fn find(&mut self, pattern: &str) -> ScanResult<Vec<WorkspaceFile>> {
        if self.files.is_none() {
            let root = self.root.clone();
            self.scan(root)?;
        }
        let matcher = PatternMatcher::compile(pattern);
        Ok(self
            .files()
            .iter()
            .filter(|file| matcher.matches(&file.relative_path))
            .cloned()
            .collect())
    }

    /// Read a file as text. Relative paths resolve against the root.
    pub fn read(&self, path: impl AsRef<Path>) -> ScanResult<String> {
        let path = self.resolve(path.as_ref());
        fs::read_to_string(&path).map_err(|source| ScanError::FileRead { path, source })
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn stats(&self) -> ScanStats {
        let mut stats = ScanStats::default();
        for file in self.files() {
            stats.record(file);
        }
        stats
    }

    fn exclusions(&self) -> ExclusionSet {
        let mut set = ExclusionSet::builtin();
        set.extend(self.config.extra_ignore_patterns.iter().map(String::as_str));

        let ignore_path = self.root.join(&self.config.ignore_file);
        if ignore_path.is_file() {
            match fs::read_to_string(&ignore_path) {
                Ok(content) => set.extend_from_ignore_file(&content),
                Err(e) => tracing::warn!(
                    target: "scanner",
                    "cannot read {}: {e}",
                    ignore_path.display()
                ),
            }
        }
        set
    }
}

fn keep_entry(root: &Path, entry: &DirEntry, exclusions: &ExclusionSet) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    match relative_of(root, entry.path()) {
        Some(relative) => !exclusions.is_excluded(&relative, entry.file_type().is_dir()),
        None => false,
    }
}

/// Whether `path` lies under `root` and classifies as source.
pub(crate) fn is_source_file(root: &Path, path: &Path) -> bool {
    relative_of(root, path).is_some_and(|relative| classify(&relative) == FileKind::Source)
}

/// Root-relative path with separators normalized to `/`.
pub(crate) fn relative_of(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
