//! Builds and maintains the workspace [`ClassHierarchy`].
//!
//! Files are parsed in parallel into per-file node lists. Registration,
//! tree recomputation and the snapshot write happen on the calling thread
//! once the whole batch is done.

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::extract::{Extraction, extract_file};
use super::types::{ClassHierarchy, ClassNode, InheritanceChain, MethodOverride};
use crate::config::{IndexingConfig, ScannerConfig};
use crate::error::ScanResult;
use crate::indexing::worker_pool;
use crate::parsing::typescript::{ParserSet, is_declaration_file, is_supported};
use crate::storage::PersistenceCache;
use crate::workspace::scanner::is_source_file;
use crate::workspace::{FileKind, WorkspaceFile, WorkspaceScanner};

/// Cache key of the persisted hierarchy snapshot.
pub const HIERARCHY_KEY: &str = "class-hierarchy";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub files: usize,
    pub cache_hits: usize,
    pub parsed: usize,
    /// Requested during a refresh but gone from disk
    pub removed: usize,
    pub failed: usize,
    pub classes: usize,
    pub interfaces: usize,
    pub elapsed: Duration,
}

pub struct ClassHierarchyBuilder {
    root: PathBuf,
    scanner: ScannerConfig,
    cache: Arc<PersistenceCache>,
    pool: Option<rayon::ThreadPool>,
    max_chain_hops: usize,
    hierarchy: ClassHierarchy,
}

impl ClassHierarchyBuilder {
    pub fn new(
        root: impl Into<PathBuf>,
        cache: Arc<PersistenceCache>,
        scanner: ScannerConfig,
        indexing: &IndexingConfig,
        max_chain_hops: usize,
    ) -> Self {
        Self {
            root: root.into(),
            scanner,
            cache,
            pool: worker_pool(indexing, "hierarchy"),
            max_chain_hops,
            hierarchy: ClassHierarchy::default(),
        }
    }

    /// Scan `workspace` and rebuild the hierarchy from its source files.
    pub fn build(&mut self, workspace: impl AsRef<Path>) -> ScanResult<&ClassHierarchy> {
        let workspace = workspace.as_ref();
        let mut scanner = WorkspaceScanner::new(workspace, self.scanner.clone());
        let files = scanner.scan(workspace)?;
        self.root = workspace.to_path_buf();
        self.build_from_files(&files);
        Ok(&self.hierarchy)
    }

    /// Rebuild from an existing scan result, replacing the whole hierarchy.
    ///
    /// Only source files are considered; declaration files (`.d.ts`) are
    /// skipped.
    pub fn build_from_files(&mut self, files: &[WorkspaceFile]) -> BuildStats {
        let started = Instant::now();
        let targets: Vec<PathBuf> = files
            .iter()
            .filter(|f| f.kind == FileKind::Source)
            .map(|f| f.path.clone())
            .filter(|p| accepts(p))
            .collect();

        let mut stats = BuildStats {
            files: targets.len(),
            ..BuildStats::default()
        };
        let mut hierarchy = ClassHierarchy::default();
        for (path, extraction) in self.extract_all(&targets) {
            if let Some(nodes) = tally(&mut stats, &path, extraction) {
                nodes.into_iter().for_each(|node| hierarchy.insert(node));
            }
        }
        self.hierarchy = hierarchy;
        self.finish(&mut stats, started, "built");
        stats
    }

    /// Re-parse exactly `paths` and recompute the trees over every node.
    ///
    /// Nodes declared in a listed file are dropped first. A file that no
    /// longer exists, or that `build` would not consider (tests, `.d.ts`,
    /// paths outside the root), stays dropped.
    pub fn refresh<P: AsRef<Path>>(&mut self, paths: &[P]) -> BuildStats {
        let started = Instant::now();
        let resolved: Vec<PathBuf> = paths.iter().map(|p| self.resolve(p.as_ref())).collect();
        for path in &resolved {
            let dropped = self.hierarchy.remove_file(path);
            tracing::debug!(target: "hierarchy", "dropped {dropped} nodes of {}", path.display());
        }

        let targets: Vec<PathBuf> = resolved
            .into_iter()
            .filter(|p| accepts(p) && is_source_file(&self.root, p))
            .collect();
        let mut stats = BuildStats {
            files: targets.len(),
            ..BuildStats::default()
        };
        for (path, extraction) in self.extract_all(&targets) {
            if let Some(nodes) = tally(&mut stats, &path, extraction) {
                nodes.into_iter().for_each(|node| self.hierarchy.insert(node));
            }
        }
        self.finish(&mut stats, started, "refreshed");
        stats
    }

    /// Load the last persisted snapshot. Returns false if there is none.
    pub fn restore(&mut self) -> bool {
        match self.cache.load::<ClassHierarchy>(HIERARCHY_KEY) {
            Some(mut hierarchy) => {
                hierarchy.recompute();
                crate::debug_event!(
                    "hierarchy",
                    "restored",
                    "{} classes, {} interfaces",
                    hierarchy.classes.len(),
                    hierarchy.interfaces.len()
                );
                self.hierarchy = hierarchy;
                true
            }
            None => false,
        }
    }

    pub fn hierarchy(&self) -> &ClassHierarchy {
        &self.hierarchy
    }

    pub fn get(&self, name: &str) -> Option<&ClassNode> {
        self.hierarchy.get(name)
    }

    pub fn implementations_of(&self, interface_name: &str) -> Vec<&ClassNode> {
        self.hierarchy.implementations_of(interface_name)
    }

    pub fn inheritance_chain(&self, name: &str) -> InheritanceChain {
        self.hierarchy.inheritance_chain(name, self.max_chain_hops)
    }

    pub fn overrides_of(&self, class_name: &str, method_name: &str) -> Vec<MethodOverride> {
        self.hierarchy.overrides_of(class_name, method_name)
    }

    pub fn derived_classes_of(&self, name: &str) -> Vec<&ClassNode> {
        self.hierarchy.derived_classes_of(name)
    }

    pub fn implements(&self, class_name: &str, interface_name: &str) -> bool {
        self.hierarchy
            .implements(class_name, interface_name, self.max_chain_hops)
    }

    fn extract_all(&self, targets: &[PathBuf]) -> Vec<(PathBuf, Extraction)> {
        let cache = self.cache.as_ref();
        let run = || {
            targets
                .par_iter()
                .map_init(ParserSet::default, |parsers, path| {
                    (path.clone(), extract_file(path, cache, parsers))
                })
                .collect::<Vec<_>>()
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn finish(&mut self, stats: &mut BuildStats, started: Instant, event: &str) {
        self.hierarchy.recompute();
        self.cache.save(HIERARCHY_KEY, &self.hierarchy);

        stats.classes = self.hierarchy.classes.len();
        stats.interfaces = self.hierarchy.interfaces.len();
        stats.elapsed = started.elapsed();
        crate::log_event!(
            "hierarchy",
            event,
            "{} classes, {} interfaces from {} files ({} parsed, {} cached, {} failed) in {:?}",
            stats.classes,
            stats.interfaces,
            stats.files,
            stats.parsed,
            stats.cache_hits,
            stats.failed,
            stats.elapsed
        );
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

fn accepts(path: &Path) -> bool {
    is_supported(path) && !is_declaration_file(path)
}

fn tally(stats: &mut BuildStats, path: &Path, extraction: Extraction) -> Option<Vec<ClassNode>> {
    match extraction {
        Extraction::Cached(nodes) => {
            stats.cache_hits += 1;
            Some(nodes)
        }
        Extraction::Parsed(nodes) => {
            stats.parsed += 1;
            Some(nodes)
        }
        Extraction::Missing => {
            stats.removed += 1;
            None
        }
        Extraction::Failed(report) => {
            stats.failed += 1;
            tracing::warn!(target: "hierarchy", "skipping {}: {report}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn builder(root: &Path, cache: Arc<PersistenceCache>) -> ClassHierarchyBuilder {
        ClassHierarchyBuilder::new(
            root,
            cache,
            ScannerConfig::default(),
            &IndexingConfig { parallel_threads: 2 },
            50,
        )
    }

    fn write(root: &Path, name: &str, code: &str) {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, code).unwrap();
    }

    #[test]
    fn test_build_skips_declaration_and_test_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "src/a.ts", "export class A {}\nexport interface I {}\n");
        write(root, "src/types.d.ts", "declare class Ambient {}\n");
        write(root, "src/a.test.ts", "class InTest {}\n");

        let mut builder = builder(root, Arc::new(PersistenceCache::in_memory()));
        let hierarchy = builder.build(root).unwrap();
        assert!(hierarchy.classes.contains_key("A"));
        assert!(hierarchy.interfaces.contains_key("I"));
        assert!(!hierarchy.classes.contains_key("Ambient"));
        assert!(!hierarchy.classes.contains_key("InTest"));
    }

    #[test]
    fn test_build_rejects_non_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.ts");
        fs::write(&file, "").unwrap();
        let mut builder = builder(temp_dir.path(), Arc::new(PersistenceCache::in_memory()));
        assert!(builder.build(&file).is_err());
    }

    #[test]
    fn test_refresh_of_deleted_file_drops_its_nodes() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "base.ts", "export class Base { run() {} }\n");
        write(root, "child.ts", "export class Child extends Base { run() {} }\n");

        let mut builder = builder(root, Arc::new(PersistenceCache::in_memory()));
        builder.build(root).unwrap();
        assert_eq!(builder.overrides_of("Base", "run").len(), 1);

        fs::remove_file(root.join("base.ts")).unwrap();
        let stats = builder.refresh(&["base.ts"]);
        assert_eq!(stats.removed, 1);
        assert!(builder.get("Base").is_none());

        // Superclass gone, so the flag is cleared by recomputation
        let child = builder.get("Child").unwrap();
        assert!(!child.method("run").unwrap().is_override);
        assert_eq!(builder.inheritance_chain("Child").chain, vec!["Base"]);
    }

    #[test]
    fn test_refresh_ignores_files_build_skips() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "src/app.ts", "export class App {}\n");

        let mut builder = builder(root, Arc::new(PersistenceCache::in_memory()));
        builder.build(root).unwrap();

        write(root, "src/app.test.ts", "class FakeHelper {}\n");
        write(root, "src/types.d.ts", "declare class Ambient {}\n");
        let stats = builder.refresh(&["src/app.test.ts", "src/types.d.ts"]);
        assert_eq!(stats.files, 0);
        assert!(builder.get("FakeHelper").is_none());
        assert!(builder.get("Ambient").is_none());
        assert!(builder.get("App").is_some());
    }

    #[test]
    fn test_unchanged_files_come_from_cache() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "a.ts", "class A {}\n");
        let cache = Arc::new(PersistenceCache::in_memory());

        let mut first = builder(root, cache.clone());
        first.build(root).unwrap();

        let mut second = builder(root, cache);
        let files = WorkspaceScanner::new(root, ScannerConfig::default())
            .scan(root)
            .unwrap();
        let stats = second.build_from_files(&files);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.parsed, 0);
        assert!(second.get("A").is_some());
    }

    #[test]
    fn test_restore_from_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(
            root,
            "shapes.ts",
            "class Shape { area() {} }\nclass Square extends Shape { area() {} }\n",
        );
        let cache = Arc::new(PersistenceCache::in_memory());
        builder(root, cache.clone()).build(root).unwrap();

        let mut restored = builder(root, cache);
        assert!(restored.restore());
        assert_eq!(restored.derived_classes_of("Shape").len(), 1);
        assert_eq!(restored.overrides_of("Shape", "area")[0].class_name, "Square");

        let mut empty = builder(root, Arc::new(PersistenceCache::in_memory()));
        assert!(!empty.restore());
    }
}
