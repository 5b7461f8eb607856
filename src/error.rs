//! Error types shared across the workspace index.
//!
//! Two families surface to callers: [`ScanError`] for workspace discovery and
//! [`CacheError`] for cache initialization, both wrapped by [`IndexError`] at
//! the facade. Per-file failures ([`FileError`])
//! and best-effort cache I/O are logged through [`ErrorReport`] and swallowed
//! by the component that hit it.

use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from workspace discovery and raw reads.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Workspace root is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Cannot access workspace root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the persistence cache.
///
/// Only [`CacheError::CreateDir`] ever reaches a caller, and only when the
/// cache location was explicitly configured. The other variants are produced
/// internally and logged.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache serialization error for '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from the TypeScript front end.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to load {language} grammar: {message}")]
    Grammar {
        language: &'static str,
        message: String,
    },

    #[error("Parser returned no syntax tree")]
    NoTree,
}

/// Per-file failures during a batch index. Logged, never returned from
/// the batch call itself.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Errors surfaced by the workspace facade: the fatal-to-call cases of the
/// scanner and the cache.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub type ScanResult<T> = Result<T, ScanError>;
pub type CacheResult<T> = Result<T, CacheError>;
pub type ParseResult<T> = Result<T, ParseError>;

/// Uniform shape for logged failures.
///
/// Built either from a typed error (keeping its source chain) or from any
/// displayable value such as a panic payload string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
    pub causes: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            kind: "error",
            message: err.to_string(),
            causes,
        }
    }

    pub fn from_display(value: impl fmt::Display) -> Self {
        Self {
            kind: "message",
            message: value.to_string(),
            causes: Vec::new(),
        }
    }

    /// Normalize a panic payload caught with `catch_unwind`.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self {
            kind: "panic",
            message,
            causes: Vec::new(),
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        for cause in &self.causes {
            write!(f, " <- {cause}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_keeps_source_chain() {
        let err = ScanError::FileRead {
            path: PathBuf::from("a.ts"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let report = ErrorReport::from_error(&err);
        assert_eq!(report.kind, "error");
        assert!(report.message.contains("a.ts"));
        assert_eq!(report.causes, vec!["gone".to_string()]);
    }

    #[test]
    fn test_report_from_raw_values() {
        let report = ErrorReport::from_display("boom");
        assert_eq!(report.kind, "message");
        assert_eq!(report.to_string(), "[message] boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new("parser exploded");
        let report = ErrorReport::from_panic(payload.as_ref());
        assert_eq!(report.kind, "panic");
        assert_eq!(report.message, "parser exploded");
    }
}
