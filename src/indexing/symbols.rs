//! Incremental symbol indexer.
//!
//! Files are processed independently on a rayon pool, each worker owning
//! its own parsers. Unchanged files adopt their cached symbol list; the
//! rest are parsed, and their results written back to the cache. The
//! per-file lists are merged into the index only after every file of the
//! batch has finished.

use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::hash::calculate_hash;
use super::worker_pool;
use crate::config::IndexingConfig;
use crate::error::{ErrorReport, FileError};
use crate::parsing::typescript::{ParserSet, is_supported};
use crate::parsing::{Declaration, Member, Position};
use crate::storage::{CacheEntry, PersistenceCache};
use crate::symbol::{ExportStatus, Location, Symbol, SymbolKind};

/// Outcome counts for one `index` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub requested: usize,
    /// Dropped because the extension is not supported
    pub skipped: usize,
    pub cache_hits: usize,
    pub parsed: usize,
    pub failed: usize,
    /// Symbols (including children) in the files of this batch
    pub symbols: usize,
    pub elapsed: Duration,
}

enum Outcome {
    Cached(Vec<Symbol>),
    Parsed(Vec<Symbol>),
    Failed(ErrorReport),
}

pub struct SymbolIndexer {
    root: PathBuf,
    cache: Arc<PersistenceCache>,
    pool: Option<rayon::ThreadPool>,
    files: HashMap<PathBuf, Vec<Symbol>>,
    parse_count: AtomicUsize,
}

impl SymbolIndexer {
    /// Relative paths given to this indexer resolve against `root`.
    pub fn new(root: impl Into<PathBuf>, cache: Arc<PersistenceCache>, config: &IndexingConfig) -> Self {
        Self {
            root: root.into(),
            cache,
            pool: worker_pool(config, "index"),
            files: HashMap::new(),
            parse_count: AtomicUsize::new(0),
        }
    }

    /// Index `paths`, replacing each file's symbol list wholesale.
    ///
    /// Unsupported extensions are ignored. A file that cannot be read or
    /// parsed is logged and dropped from the index; the batch continues.
    pub fn index<P: AsRef<Path>>(&mut self, paths: &[P]) -> IndexStats {
        let started = Instant::now();
        let mut stats = IndexStats {
            requested: paths.len(),
            ..IndexStats::default()
        };

        let targets: Vec<PathBuf> = paths
            .iter()
            .map(|p| self.resolve(p.as_ref()))
            .filter(|p| is_supported(p))
            .collect();
        stats.skipped = stats.requested - targets.len();

        let cache = self.cache.as_ref();
        let parses = &self.parse_count;
        let run = || {
            targets
                .par_iter()
                .map_init(ParserSet::default, |parsers, path| {
                    (path.clone(), index_file(path, cache, parsers, parses))
                })
                .collect::<Vec<_>>()
        };
        let results = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        for (path, outcome) in results {
            match outcome {
                Outcome::Cached(symbols) => {
                    stats.cache_hits += 1;
                    stats.symbols += symbols.iter().map(Symbol::count).sum::<usize>();
                    self.files.insert(path, symbols);
                }
                Outcome::Parsed(symbols) => {
                    stats.parsed += 1;
                    stats.symbols += symbols.iter().map(Symbol::count).sum::<usize>();
                    self.files.insert(path, symbols);
                }
                Outcome::Failed(report) => {
                    stats.failed += 1;
                    tracing::warn!(target: "indexer", "skipping {}: {report}", path.display());
                    self.files.remove(&path);
                }
            }
        }

        stats.elapsed = started.elapsed();
        crate::log_event!(
            "indexer",
            "indexed",
            "{} parsed, {} cached, {} failed in {:?}",
            stats.parsed,
            stats.cache_hits,
            stats.failed,
            stats.elapsed
        );
        stats
    }

    /// Case-insensitive substring search over names and documentation.
    ///
    /// A hit on a member returns its enclosing top-level symbol. `kind`
    /// restricts which symbol may produce the hit.
    pub fn search(&self, query: &str, kind: Option<SymbolKind>) -> Vec<Symbol> {
        let needle = query.to_lowercase();
        let accepts = |symbol: &Symbol| {
            kind.is_none_or(|k| symbol.kind == k) && symbol.matches_text(&needle)
        };

        let mut paths: Vec<&PathBuf> = self.files.keys().collect();
        paths.sort();

        let mut results = Vec::new();
        for path in paths {
            for symbol in &self.files[path] {
                if accepts(symbol) || symbol.children.iter().any(accepts) {
                    results.push(symbol.clone());
                }
            }
        }
        results
    }

    /// Symbols of one file, indexing it first if needed.
    pub fn symbols_of(&mut self, path: impl AsRef<Path>) -> Vec<Symbol> {
        let path = self.resolve(path.as_ref());
        if !self.files.contains_key(&path) {
            self.index(&[&path]);
        }
        self.files.get(&path).cloned().unwrap_or_default()
    }

    /// Drop every in-memory symbol list. The persistence cache is untouched.
    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn remove(&mut self, path: impl AsRef<Path>) -> bool {
        let path = self.resolve(path.as_ref());
        self.files.remove(&path).is_some()
    }

    /// Drop every file not in `keep`. Returns how many were dropped.
    pub fn retain(&mut self, keep: &HashSet<PathBuf>) -> usize {
        let before = self.files.len();
        self.files.retain(|path, _| keep.contains(path));
        before - self.files.len()
    }

    pub fn indexed_files(&self) -> usize {
        self.files.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.files
            .values()
            .flat_map(|symbols| symbols.iter())
            .map(Symbol::count)
            .sum()
    }

    /// Number of times the parser has run since creation.
    pub fn parse_count(&self) -> usize {
        self.parse_count.load(Ordering::Relaxed)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

pub(crate) fn cache_key(prefix: &str, path: &Path) -> String {
    format!("{prefix}:{}", path.display())
}

fn index_file(
    path: &Path,
    cache: &PersistenceCache,
    parsers: &mut ParserSet,
    parses: &AtomicUsize,
) -> Outcome {
    let code = match fs::read_to_string(path) {
        Ok(code) => code,
        Err(source) => {
            let err = FileError::Read {
                path: path.to_path_buf(),
                source,
            };
            return Outcome::Failed(ErrorReport::from_error(&err));
        }
    };
    let hash = calculate_hash(&code);
    let key = cache_key("symbols", path);

    if cache.is_unchanged(path, &hash) {
        if let Some(entry) = cache.load::<CacheEntry<Vec<Symbol>>>(&key) {
            if entry.is_fresh_for(&hash) {
                return Outcome::Cached(entry.value);
            }
        }
    }

    let parsed = catch_unwind(AssertUnwindSafe(|| {
        parses.fetch_add(1, Ordering::Relaxed);
        parsers.parse(path, &code)
    }));
    let declarations = match parsed {
        Ok(Ok(declarations)) => declarations,
        Ok(Err(source)) => {
            let err = FileError::Parse {
                path: path.to_path_buf(),
                source,
            };
            return Outcome::Failed(ErrorReport::from_error(&err));
        }
        Err(payload) => return Outcome::Failed(ErrorReport::from_panic(payload.as_ref())),
    };

    let symbols = to_symbols(path, declarations);
    cache.save(&key, &CacheEntry::for_file(key.as_str(), hash.as_str(), &symbols));
    cache.update_hash(path, &hash);
    Outcome::Parsed(symbols)
}

/// Build the symbol forest of one file.
pub fn to_symbols(path: &Path, declarations: Vec<Declaration>) -> Vec<Symbol> {
    declarations
        .into_iter()
        .map(|decl| declaration_symbol(path, decl))
        .collect()
}

fn declaration_symbol(path: &Path, decl: Declaration) -> Symbol {
    let leaf = |name: String, kind, position, doc: String, export| Symbol {
        name,
        kind,
        location: location(path, position),
        documentation: doc,
        export,
        parent: None,
        children: Vec::new(),
    };

    match decl {
        Declaration::Class(c) => {
            let children = member_symbols(path, &c.name, c.members);
            Symbol {
                children,
                ..leaf(c.name, SymbolKind::Class, c.position, c.doc, c.export)
            }
        }
        Declaration::Interface(i) => {
            let children = member_symbols(path, &i.name, i.members);
            Symbol {
                children,
                ..leaf(i.name, SymbolKind::Interface, i.position, i.doc, i.export)
            }
        }
        Declaration::Function(f) => leaf(f.name, SymbolKind::Function, f.position, f.doc, f.export),
        Declaration::Variable(v) => leaf(v.name, SymbolKind::Variable, v.position, v.doc, v.export),
        Declaration::Enum(e) => leaf(e.name, SymbolKind::Enum, e.position, e.doc, e.export),
        Declaration::TypeAlias(t) => {
            leaf(t.name, SymbolKind::TypeAlias, t.position, t.doc, t.export)
        }
        Declaration::Namespace(n) => {
            leaf(n.name, SymbolKind::Namespace, n.position, n.doc, n.export)
        }
        Declaration::Module(m) => leaf(m.name, SymbolKind::Module, m.position, m.doc, m.export),
    }
}

/// Members nest under their owner and are never exported on their own.
fn member_symbols(path: &Path, owner: &str, members: Vec<Member>) -> Vec<Symbol> {
    members
        .into_iter()
        .map(|member| {
            let (name, kind, position, doc) = match member {
                Member::Method(m) => (m.name, SymbolKind::Method, m.position, m.doc),
                Member::Property(p) => (p.name, SymbolKind::Property, p.position, p.doc),
            };
            Symbol {
                name,
                kind,
                location: location(path, position),
                documentation: doc,
                export: ExportStatus::None,
                parent: Some(owner.to_string()),
                children: Vec::new(),
            }
        })
        .collect()
}

fn location(path: &Path, position: Position) -> Location {
    Location {
        file: path.to_path_buf(),
        line: position.line,
        column: position.column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn indexer(root: &Path) -> SymbolIndexer {
        let cache = Arc::new(PersistenceCache::in_memory());
        SymbolIndexer::new(root, cache, &IndexingConfig { parallel_threads: 2 })
    }

    #[test]
    fn test_members_nest_under_class() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("svc.ts"),
            "export class Svc {\n  run(): void {}\n  count = 0;\n}\nexport function helper() {}\n",
        )
        .unwrap();

        let mut indexer = indexer(temp_dir.path());
        let symbols = indexer.symbols_of("svc.ts");
        assert_eq!(symbols.len(), 2);

        let svc = &symbols[0];
        assert_eq!(svc.kind, SymbolKind::Class);
        assert_eq!(svc.export, ExportStatus::Exported);
        assert_eq!(svc.children.len(), 2);
        assert_eq!(svc.children[0].kind, SymbolKind::Method);
        assert_eq!(svc.children[0].parent.as_deref(), Some("Svc"));
        assert_eq!(svc.children[0].export, ExportStatus::None);
        assert_eq!(svc.children[1].kind, SymbolKind::Property);
        assert_eq!(svc.children[0].location.line, 2);
        assert_eq!(symbols[1].kind, SymbolKind::Function);
    }

    #[test]
    fn test_unsupported_and_missing_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("notes.md"), "# notes").unwrap();

        let mut indexer = indexer(temp_dir.path());
        let stats = indexer.index(&["notes.md", "missing.ts"]);
        assert_eq!(stats.requested, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(indexer.indexed_files(), 0);
    }

    #[test]
    fn test_child_match_returns_parent() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("a.ts"),
            "class Cart {\n  /** Adds a widget */\n  add(): void {}\n}\n",
        )
        .unwrap();

        let mut indexer = indexer(temp_dir.path());
        indexer.index(&["a.ts"]);

        let hits = indexer.search("WIDGET", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Cart");

        assert_eq!(indexer.search("add", Some(SymbolKind::Method)).len(), 1);
        assert!(indexer.search("cart", Some(SymbolKind::Method)).is_empty());
    }

    #[test]
    fn test_stale_entry_from_other_hash_is_not_adopted() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.ts");
        fs::write(&file, "class Fresh {}").unwrap();

        let cache = Arc::new(PersistenceCache::in_memory());
        let hash = calculate_hash("class Fresh {}");
        // Hash recorded by someone else, entry left over from older content
        cache.update_hash(&file, &hash);
        let key = cache_key("symbols", &file);
        cache.save(&key, &CacheEntry::for_file(key.as_str(), "old", Vec::<Symbol>::new()));

        let mut indexer = SymbolIndexer::new(temp_dir.path(), cache, &IndexingConfig::default());
        let stats = indexer.index(&[&file]);
        assert_eq!(stats.parsed, 1);
        assert_eq!(indexer.symbols_of(&file)[0].name, "Fresh");
    }

    #[test]
    fn test_retain_drops_files_outside_the_set() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.ts"), "class Kept {}").unwrap();
        fs::write(temp_dir.path().join("b.ts"), "class Dropped {}").unwrap();
        let mut indexer = indexer(temp_dir.path());
        indexer.index(&["a.ts", "b.ts"]);

        let keep = HashSet::from([temp_dir.path().join("a.ts")]);
        assert_eq!(indexer.retain(&keep), 1);
        assert_eq!(indexer.indexed_files(), 1);
        assert!(indexer.search("dropped", None).is_empty());
        assert_eq!(indexer.search("kept", None).len(), 1);
    }

    #[test]
    fn test_clear_drops_in_memory_index() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.ts"), "class A {}").unwrap();
        let mut indexer = indexer(temp_dir.path());
        indexer.index(&["a.ts"]);
        assert_eq!(indexer.symbol_count(), 1);
        indexer.clear();
        assert_eq!(indexer.symbol_count(), 0);
        assert!(indexer.search("a", None).is_empty());
    }
}
