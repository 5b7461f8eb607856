//! Workspace discovery against real directory trees

use codescope::config::ScannerConfig;
use codescope::{FileKind, ScanError, WorkspaceScanner};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn relative_paths(scanner: &mut WorkspaceScanner, root: &Path) -> Vec<String> {
    scanner
        .scan(root)
        .unwrap()
        .into_iter()
        .map(|f| f.relative_path)
        .collect()
}

#[test]
fn test_builtin_and_ignore_file_exclusions() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "src/app.ts", "export class App {}");
    write(root, "src/app.test.ts", "");
    write(root, "node_modules/lib/index.js", "");
    write(root, "dist/app.js", "");
    write(root, ".git/HEAD", "ref: refs/heads/main");
    write(root, "assets/logo.png", "");
    write(root, "generated/api.ts", "");
    write(root, "logs/debug.log", "");
    write(root, "README.md", "# app");
    write(root, "package.json", "{}");
    write(root, ".codescopeignore", "# generated code\n\ngenerated/\n*.log\n");

    let mut scanner = WorkspaceScanner::new(root, ScannerConfig::default());
    let paths = relative_paths(&mut scanner, root);

    for excluded in [
        "node_modules/lib/index.js",
        "dist/app.js",
        ".git/HEAD",
        "assets/logo.png",
        "generated/api.ts",
        "logs/debug.log",
    ] {
        assert!(!paths.contains(&excluded.to_string()), "{excluded} was scanned");
    }
    for kept in ["src/app.ts", "src/app.test.ts", "README.md", "package.json"] {
        assert!(paths.contains(&kept.to_string()), "{kept} missing");
    }

    let stats = scanner.stats();
    assert_eq!(stats.count(FileKind::Source), 1);
    assert_eq!(stats.count(FileKind::Test), 1);
    assert_eq!(stats.count(FileKind::Documentation), 1);
    assert_eq!(stats.count(FileKind::Config), 1);
    assert_eq!(
        stats.total,
        FileKind::ALL.iter().map(|k| stats.count(*k)).sum::<usize>()
    );
}

#[test]
fn test_extra_patterns_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "src/keep.ts", "");
    write(root, "src/legacy/old.ts", "");

    let config = ScannerConfig {
        extra_ignore_patterns: vec!["src/legacy/".to_string()],
        ..ScannerConfig::default()
    };
    let mut scanner = WorkspaceScanner::new(root, config);
    assert_eq!(relative_paths(&mut scanner, root), vec!["src/keep.ts"]);
}

#[test]
fn test_depth_limit_truncates_silently() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "top.ts", "");
    write(root, "a/b/c/deep.ts", "");

    let config = ScannerConfig {
        max_depth: 2,
        ..ScannerConfig::default()
    };
    let mut scanner = WorkspaceScanner::new(root, config);
    assert_eq!(relative_paths(&mut scanner, root), vec!["top.ts"]);
}

#[test]
fn test_find_scans_lazily() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "docs/guide.md", "");
    write(root, "src/index.ts", "");
    write(root, "src/util/strings.ts", "");

    let mut scanner = WorkspaceScanner::new(root, ScannerConfig::default());
    assert!(scanner.files().is_empty());

    let found: Vec<_> = scanner
        .find("src/**/*.ts")
        .unwrap()
        .into_iter()
        .map(|f| f.relative_path)
        .collect();
    assert_eq!(found, vec!["src/index.ts", "src/util/strings.ts"]);
    assert_eq!(scanner.find("*.md").unwrap().len(), 1);
}

#[test]
fn test_read_resolves_relative_paths() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "src/a.ts", "const a = 1;");
    let scanner = WorkspaceScanner::new(temp_dir.path(), ScannerConfig::default());

    assert_eq!(scanner.read("src/a.ts").unwrap(), "const a = 1;");
    assert!(matches!(
        scanner.read("src/missing.ts"),
        Err(ScanError::FileRead { .. })
    ));
}

#[test]
fn test_root_validation_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("file.txt");
    fs::write(&file, "").unwrap();

    let mut scanner = WorkspaceScanner::new(temp_dir.path(), ScannerConfig::default());
    assert!(matches!(
        scanner.scan(&file),
        Err(ScanError::NotADirectory { .. })
    ));
    assert!(matches!(
        scanner.scan(temp_dir.path().join("absent")),
        Err(ScanError::RootUnreadable { .. })
    ));
}
