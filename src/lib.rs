pub mod config;
pub mod error;
pub mod facade;
pub mod hierarchy;
pub mod indexing;
pub mod logging;
pub mod parsing;
pub mod storage;
pub mod symbol;
pub mod workspace;

pub use config::Settings;
pub use error::{CacheError, ErrorReport, IndexError, ScanError};
pub use facade::{IndexReport, WorkspaceIndex, WorkspaceStats};
pub use hierarchy::{ClassHierarchy, ClassHierarchyBuilder, ClassNode, InheritanceChain, MethodOverride};
pub use indexing::{SymbolIndexer, calculate_hash};
pub use storage::PersistenceCache;
pub use symbol::{ExportStatus, Location, Symbol, SymbolKind};
pub use workspace::{FileKind, WorkspaceFile, WorkspaceScanner};
