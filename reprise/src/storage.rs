//! Directory-scoped JSON persistence for cache entries.
//!
//! The store is deliberately dumb: one pretty-printed JSON file per
//! entry, no index, no locking. Everything interesting (key derivation,
//! versioning, healing) happens above it. A store without a directory
//! is a valid disabled store whose reads and writes are silent no-ops.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome of a storage read.
///
/// A missing file is a clean miss (`value` and `error` both empty).
/// Anything else that goes wrong is reported in `error` together with
/// the resolved path so callers can log it; reads never panic and never
/// return `Err`.
#[derive(Debug)]
pub struct ReadOutcome<T> {
    /// Parsed value when the file existed and parsed cleanly.
    pub value: Option<T>,
    /// Failure description for anything other than a missing file.
    pub error: Option<String>,
    /// Resolved path of the file involved.
    pub path: Option<PathBuf>,
}

impl<T> ReadOutcome<T> {
    fn disabled() -> Self {
        Self {
            value: None,
            error: None,
            path: None,
        }
    }

    /// Whether the read produced no value.
    pub fn is_miss(&self) -> bool {
        self.value.is_none()
    }
}

/// Outcome of a storage write.
#[derive(Debug, Default)]
pub struct WriteOutcome {
    /// Failure description, when the write did not land.
    pub error: Option<String>,
    /// Resolved path of the file involved.
    pub path: Option<PathBuf>,
}

impl WriteOutcome {
    /// Whether the write landed (or was a disabled-store no-op).
    pub fn ok(&self) -> bool {
        self.error.is_none()
    }
}

/// JSON blob store scoped to a single cache directory.
#[derive(Debug)]
pub struct CacheStorage {
    dir: Option<PathBuf>,
}

impl CacheStorage {
    /// Create a store over a cache directory.
    ///
    /// `None` builds a disabled store. When a directory is given it is
    /// created eagerly; if that fails the store degrades to disabled
    /// (logged once) rather than surfacing an error.
    pub fn new(dir: Option<PathBuf>) -> Self {
        let dir = match dir {
            Some(dir) => match std::fs::create_dir_all(&dir) {
                Ok(()) => Some(dir),
                Err(e) => {
                    log::warn!(
                        "cache directory {} unavailable, caching disabled: {}",
                        dir.display(),
                        e
                    );
                    None
                }
            },
            None => None,
        };
        Self { dir }
    }

    /// Create a disabled store.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Whether the store has a backing directory.
    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// The backing directory, when enabled.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(file_name))
    }

    /// Read and parse one JSON file.
    pub async fn read_json<T: DeserializeOwned>(&self, file_name: &str) -> ReadOutcome<T> {
        let Some(path) = self.resolve(file_name) else {
            return ReadOutcome::disabled();
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => ReadOutcome {
                    value: Some(value),
                    error: None,
                    path: Some(path),
                },
                Err(e) => ReadOutcome {
                    value: None,
                    error: Some(format!("parse error: {e}")),
                    path: Some(path),
                },
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ReadOutcome {
                value: None,
                error: None,
                path: Some(path),
            },
            Err(e) => ReadOutcome {
                value: None,
                error: Some(e.to_string()),
                path: Some(path),
            },
        }
    }

    /// Serialize and write one JSON file, pretty-printed.
    ///
    /// Parent directories are created as needed. Failures come back in
    /// the outcome; writes never panic and never return `Err`.
    pub async fn write_json<T: Serialize>(&self, file_name: &str, data: &T) -> WriteOutcome {
        let Some(path) = self.resolve(file_name) else {
            return WriteOutcome::default();
        };
        let raw = match serde_json::to_string_pretty(data) {
            Ok(raw) => raw,
            Err(e) => {
                return WriteOutcome {
                    error: Some(format!("serialize error: {e}")),
                    path: Some(path),
                }
            }
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return WriteOutcome {
                    error: Some(format!("create dir failed: {e}")),
                    path: Some(path),
                };
            }
        }
        match tokio::fs::write(&path, raw).await {
            Ok(()) => WriteOutcome {
                error: None,
                path: Some(path),
            },
            Err(e) => WriteOutcome {
                error: Some(e.to_string()),
                path: Some(path),
            },
        }
    }
}
