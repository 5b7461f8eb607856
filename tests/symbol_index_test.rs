//! Symbol indexing, search and cache reuse

use codescope::config::{CacheConfig, IndexingConfig};
use codescope::{ExportStatus, PersistenceCache, SymbolIndexer, SymbolKind, calculate_hash};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const SERVICES: &str = r#"
/**
 * Handles user ops
 */
export class UserService {
    find(id: string) {}
}

/** Handles product ops */
export default class ProductService {}
"#;

fn indexer(root: &Path, cache: Arc<PersistenceCache>) -> SymbolIndexer {
    SymbolIndexer::new(root, cache, &IndexingConfig { parallel_threads: 2 })
}

#[test]
fn test_search_by_name_and_documentation() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("services.ts"), SERVICES).unwrap();

    let mut indexer = indexer(temp_dir.path(), Arc::new(PersistenceCache::in_memory()));
    let stats = indexer.index(&["services.ts"]);
    assert_eq!(stats.parsed, 1);

    let users = indexer.search("user", None);
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "UserService");
    assert_eq!(users[0].documentation, "Handles user ops");
    assert_eq!(users[0].export, ExportStatus::Exported);

    let services = indexer.search("SERVICE", None);
    let names: Vec<_> = services.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["UserService", "ProductService"]);
    assert_eq!(services[1].export, ExportStatus::Default);

    assert!(indexer.search("service", Some(SymbolKind::Function)).is_empty());
    assert_eq!(indexer.search("service", Some(SymbolKind::Class)).len(), 2);
}

#[test]
fn test_second_index_is_a_cache_hit() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("services.ts"), SERVICES).unwrap();
    let cache = Arc::new(PersistenceCache::init(root, &CacheConfig::default()).unwrap());

    let mut first = indexer(root, cache.clone());
    first.index(&["services.ts"]);
    assert_eq!(first.parse_count(), 1);
    let before = serde_json::to_vec(&first.symbols_of("services.ts")).unwrap();

    first.index(&["services.ts"]);
    assert_eq!(first.parse_count(), 1);

    // A separate indexer sharing the cache adopts the stored list as well
    let mut second = indexer(root, cache);
    let stats = second.index(&["services.ts"]);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(second.parse_count(), 0);
    let after = serde_json::to_vec(&second.symbols_of("services.ts")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_changed_content_is_reparsed() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("a.ts");
    fs::write(&file, "export function one() {}").unwrap();

    let cache = Arc::new(PersistenceCache::in_memory());
    let mut indexer = indexer(temp_dir.path(), cache.clone());
    indexer.index(&[&file]);
    assert!(cache.is_unchanged(&file, &calculate_hash("export function one() {}")));

    fs::write(&file, "export function one() {}\nexport function two() {}").unwrap();
    let stats = indexer.index(&[&file]);
    assert_eq!(stats.parsed, 1);
    assert_eq!(indexer.parse_count(), 2);
    assert_eq!(indexer.symbols_of(&file).len(), 2);
}

#[test]
fn test_declaration_groups_share_doc_and_export() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("consts.ts"),
        "/** Limits */\nexport const MIN = 0, MAX = 10;\n",
    )
    .unwrap();

    let mut indexer = indexer(temp_dir.path(), Arc::new(PersistenceCache::in_memory()));
    let symbols = indexer.symbols_of("consts.ts");
    assert_eq!(symbols.len(), 2);
    for symbol in &symbols {
        assert_eq!(symbol.kind, SymbolKind::Variable);
        assert_eq!(symbol.documentation, "Limits");
        assert_eq!(symbol.export, ExportStatus::Exported);
    }
}

#[test]
fn test_failures_do_not_abort_the_batch() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("ok.ts"), "class Ok {}").unwrap();

    let mut indexer = indexer(root, Arc::new(PersistenceCache::in_memory()));
    let stats = indexer.index(&["ok.ts", "gone.ts", "notes.txt"]);
    assert_eq!(stats.parsed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(indexer.search("ok", None).len(), 1);
}

#[test]
fn test_cache_clear_forgets_hashes() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let cache = PersistenceCache::init(root, &CacheConfig::default()).unwrap();
    let paths = ["src/a.ts", "src/b.ts", "lib/c.ts"];
    for path in paths {
        cache.update_hash(Path::new(path), "h");
    }
    cache.flush();

    cache.clear();
    for path in paths {
        assert!(!cache.is_unchanged(Path::new(path), "h"));
    }

    // Nothing comes back from disk either
    drop(cache);
    let reopened = PersistenceCache::init(root, &CacheConfig::default()).unwrap();
    assert_eq!(reopened.stats().hashed_files, 0);
}
