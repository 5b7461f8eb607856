//! Configuration module for the workspace index.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.codescope/settings.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `CODESCOPE_` and use double
//! underscores to separate nested levels:
//! - `CODESCOPE_SCANNER__MAX_DEPTH=8` sets `scanner.max_depth`
//! - `CODESCOPE_CACHE__FLUSH_DEBOUNCE_MS=250` sets `cache.flush_debounce_ms`
//! - `CODESCOPE_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the per-workspace settings directory.
pub const CONFIG_DIR: &str = ".codescope";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Workspace root directory (where `.codescope` is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub hierarchy: HierarchyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScannerConfig {
    /// Directory depth below the root at which traversal stops descending
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Root-level ignore file name, one pattern per line
    #[serde(default = "default_ignore_file")]
    pub ignore_file: String,

    /// Patterns appended to the built-in exclusion set
    #[serde(default)]
    pub extra_ignore_patterns: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    /// Explicit cache directory. When set, failing to create it is fatal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Quiet period before the file hash map is written to disk
    #[serde(default = "default_flush_debounce_ms")]
    pub flush_debounce_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Number of worker threads for per-file parsing
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HierarchyConfig {
    /// Hop cap for inheritance chain traversal (circular inheritance guard)
    #[serde(default = "default_max_chain_hops")]
    pub max_chain_hops: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for every target
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `indexer = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_max_depth() -> usize {
    20
}
fn default_ignore_file() -> String {
    ".codescopeignore".to_string()
}
fn default_flush_debounce_ms() -> u64 {
    1000
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_max_chain_hops() -> usize {
    50
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            ignore_file: default_ignore_file(),
            extra_ignore_patterns: Vec::new(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            flush_debounce_ms: default_flush_debounce_ms(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
        }
    }
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_chain_hops: default_max_chain_hops(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore separates nested levels, single underscore stays in field names
            .merge(Env::prefixed("CODESCOPE_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find `.codescope/settings.toml` by walking up from the current directory
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join("settings.toml"))
    }

    /// Get the workspace root directory (where `.codescope` is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }
}
