//! Notes system: a sandboxed, Obsidian-compatible markdown vault
//!
//! One engine backs both the "vault" and the "workspace" flavours; they only
//! differ by root directory and folder layout (see [`crate::config::StoreLayout`]).
//! Nothing is indexed in memory: every listing, search, and tag lookup is
//! recomputed from disk. The only mutable state is the Obsidian config cache.

pub mod file_ops;
pub mod markdown;
pub mod search;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::obsidian::ConfigCache;
use crate::sandbox::PathSandbox;

pub use markdown::WikiLink;
pub use search::SearchMode;

/// A file or directory inside the store, recomputed on every call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Store-relative, `/`-separated
    pub path: String,
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub is_dir: bool,
}

impl Entry {
    fn from_metadata(path: String, name: String, meta: &fs::Metadata) -> Self {
        let modified = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        Self {
            path,
            name,
            size: if meta.is_dir() { 0 } else { meta.len() },
            modified,
            is_dir: meta.is_dir(),
        }
    }
}

/// Aggregate counts over the whole store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Every listed entry, directories included
    pub total_files: usize,
    /// Bytes across regular files only
    pub total_size: u64,
    /// Newest modification time across regular files only
    pub last_modified: Option<DateTime<Utc>>,
}

/// A document store sandboxed beneath one root directory
pub struct VaultStore {
    sandbox: PathSandbox,
    config: StoreConfig,
    config_cache: ConfigCache,
}

impl VaultStore {
    /// Open a store, creating the root directory if it does not exist yet
    pub fn open(config: StoreConfig) -> io::Result<Self> {
        fs::create_dir_all(&config.root)?;
        let sandbox = PathSandbox::new(&config.root)?;
        log::info!("[VAULT] Opened store at {}", sandbox.root().display());

        Ok(Self {
            sandbox,
            config,
            config_cache: ConfigCache::new(),
        })
    }

    /// Open a store with the default vault layout
    pub fn open_at(root: impl AsRef<Path>) -> io::Result<Self> {
        Self::open(StoreConfig::new(root.as_ref()))
    }

    /// Canonical root directory
    pub fn root(&self) -> &Path {
        self.sandbox.root()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn sandbox(&self) -> &PathSandbox {
        &self.sandbox
    }

    pub(crate) fn config_cache(&self) -> &ConfigCache {
        &self.config_cache
    }
}

/// Log a failed operation at a level matching its cause. Callers only ever see
/// the collapsed result, so this is the one place the cause is recorded.
pub(crate) fn log_failure(op: &str, path: &str, err: &StoreError) {
    match err {
        StoreError::Denied => log::warn!("[VAULT] {} denied for path {:?}", op, path),
        StoreError::NotFound => log::debug!("[VAULT] {} found nothing at {:?}", op, path),
        StoreError::InvalidInput(reason) => {
            log::debug!("[VAULT] {} rejected {:?}: {}", op, path, reason)
        }
        StoreError::Io(e) => log::error!("[VAULT] {} failed for {:?}: {}", op, path, e),
    }
}
