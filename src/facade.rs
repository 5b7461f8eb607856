//! WorkspaceIndex - one handle over a workspace's scanner, cache, symbol
//! index and class hierarchy.
//!
//! ```text
//! WorkspaceIndex
//!   ├── WorkspaceScanner - discovery and classification
//!   ├── PersistenceCache (Arc) - shared by both indexers
//!   ├── SymbolIndexer - per-file symbol forests
//!   └── ClassHierarchyBuilder - classes, interfaces, derived trees
//! ```
//!
//! ```ignore
//! let mut index = WorkspaceIndex::open(&root, Settings::default())?;
//! index.index_all()?;
//! let hits = index.search("service", None);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Settings;
use crate::error::{IndexError, ScanError};
use crate::hierarchy::{BuildStats, ClassHierarchyBuilder};
use crate::indexing::{IndexStats, SymbolIndexer};
use crate::storage::{CacheStats, PersistenceCache};
use crate::symbol::{Symbol, SymbolKind};
use crate::workspace::scanner::is_source_file;
use crate::workspace::{FileKind, ScanStats, WorkspaceFile, WorkspaceScanner};

/// Result type for facade operations
pub type FacadeResult<T> = Result<T, IndexError>;

/// Outcome of a full index or a refresh.
#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub symbols: IndexStats,
    pub hierarchy: BuildStats,
}

/// Workspace-level statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceStats {
    pub root: PathBuf,
    pub files: ScanStats,
    pub indexed_files: usize,
    pub symbols: usize,
    pub classes: usize,
    pub interfaces: usize,
    pub cache: CacheStats,
}

pub struct WorkspaceIndex {
    root: PathBuf,
    settings: Arc<Settings>,
    scanner: WorkspaceScanner,
    cache: Arc<PersistenceCache>,
    symbols: SymbolIndexer,
    hierarchy: ClassHierarchyBuilder,
}

impl WorkspaceIndex {
    /// Open the index for `root`.
    ///
    /// Fails if `root` is not a directory, or if an explicitly configured
    /// cache directory cannot be created. A previously persisted hierarchy
    /// snapshot is loaded when present.
    pub fn open(root: impl AsRef<Path>, settings: Settings) -> FacadeResult<Self> {
        let root = root.as_ref().to_path_buf();
        let metadata = fs::metadata(&root).map_err(|source| ScanError::RootUnreadable {
            path: root.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory { path: root }.into());
        }

        let cache = Arc::new(PersistenceCache::init(&root, &settings.cache)?);
        let scanner = WorkspaceScanner::new(&root, settings.scanner.clone());
        let symbols = SymbolIndexer::new(&root, cache.clone(), &settings.indexing);
        let mut hierarchy = ClassHierarchyBuilder::new(
            &root,
            cache.clone(),
            settings.scanner.clone(),
            &settings.indexing,
            settings.hierarchy.max_chain_hops,
        );
        if hierarchy.restore() {
            tracing::debug!(target: "hierarchy", "warm start from snapshot");
        }

        crate::log_event!("workspace", "opened", "{}", root.display());
        Ok(Self {
            root,
            settings: Arc::new(settings),
            scanner,
            cache,
            symbols,
            hierarchy,
        })
    }

    /// Scan the workspace, index its source files and rebuild the hierarchy.
    ///
    /// Symbols of files that are no longer part of the scan, or no longer
    /// classify as source, are dropped.
    pub fn index_all(&mut self) -> FacadeResult<IndexReport> {
        let files = self.scanner.scan(&self.root)?;
        let sources: HashSet<PathBuf> = files
            .iter()
            .filter(|f| f.kind == FileKind::Source)
            .map(|f| f.path.clone())
            .collect();

        let dropped = self.symbols.retain(&sources);
        if dropped > 0 {
            tracing::debug!(target: "indexer", "dropped symbols of {dropped} files gone from the scan");
        }
        let mut paths: Vec<&PathBuf> = sources.iter().collect();
        paths.sort();

        let symbols = self.symbols.index(&paths);
        let hierarchy = self.hierarchy.build_from_files(&files);
        self.cache.flush();
        Ok(IndexReport { symbols, hierarchy })
    }

    /// Re-index exactly `paths` in both indexers.
    ///
    /// Paths that no longer exist, or that are not source files, are dropped
    /// from the symbol index and the hierarchy.
    pub fn refresh<P: AsRef<Path>>(&mut self, paths: &[P]) -> IndexReport {
        let resolved: Vec<PathBuf> = paths
            .iter()
            .map(|p| self.scanner.resolve(p.as_ref()))
            .collect();

        let (present, gone): (Vec<&PathBuf>, Vec<&PathBuf>) = resolved
            .iter()
            .partition(|p| p.is_file() && is_source_file(&self.root, p));
        for path in gone {
            self.symbols.remove(path);
        }

        let symbols = self.symbols.index(&present);
        let hierarchy = self.hierarchy.refresh(&resolved);
        self.cache.flush();
        IndexReport { symbols, hierarchy }
    }

    /// Drop the in-memory symbol index and wipe the persistence cache.
    pub fn clear(&mut self) {
        self.symbols.clear();
        self.cache.clear();
    }

    pub fn stats(&self) -> WorkspaceStats {
        let hierarchy = self.hierarchy.hierarchy();
        WorkspaceStats {
            root: self.root.clone(),
            files: self.scanner.stats(),
            indexed_files: self.symbols.indexed_files(),
            symbols: self.symbols.symbol_count(),
            classes: hierarchy.classes.len(),
            interfaces: hierarchy.interfaces.len(),
            cache: self.cache.stats(),
        }
    }

    pub fn files(&self) -> &[WorkspaceFile] {
        self.scanner.files()
    }

    pub fn find(&mut self, pattern: &str) -> FacadeResult<Vec<WorkspaceFile>> {
        Ok(self.scanner.find(pattern)?)
    }

    pub fn read(&self, path: impl AsRef<Path>) -> FacadeResult<String> {
        Ok(self.scanner.read(path)?)
    }

    pub fn search(&self, query: &str, kind: Option<SymbolKind>) -> Vec<Symbol> {
        self.symbols.search(query, kind)
    }

    pub fn symbols_of(&mut self, path: impl AsRef<Path>) -> Vec<Symbol> {
        self.symbols.symbols_of(path)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<PersistenceCache> {
        &self.cache
    }

    pub fn symbol_index(&self) -> &SymbolIndexer {
        &self.symbols
    }

    pub fn hierarchy(&self) -> &ClassHierarchyBuilder {
        &self.hierarchy
    }
}
