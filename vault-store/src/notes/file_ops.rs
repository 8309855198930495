//! File operations for the vault
//!
//! Every operation resolves its path through the sandbox first. Failures of any
//! kind (denied, missing, I/O) collapse into `None` / `false` / an empty list.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{Entry, StoreStats, VaultStore, log_failure};
use crate::error::{StoreError, StoreResult};

impl VaultStore {
    /// Read a document. Denied, missing, and unreadable all return `None`.
    pub fn read(&self, path: &str) -> Option<String> {
        match self.try_read(path) {
            Ok(content) => Some(content),
            Err(e) => {
                log_failure("read", path, &e);
                None
            }
        }
    }

    /// Write a document, creating parent directories as needed.
    ///
    /// Not atomic: a crash mid-write can leave a truncated file.
    pub fn write(&self, path: &str, content: &str) -> bool {
        match self.try_write(path, content) {
            Ok(()) => true,
            Err(e) => {
                log_failure("write", path, &e);
                false
            }
        }
    }

    /// Append to a document, creating it (and its parents) if missing
    pub fn append(&self, path: &str, content: &str) -> bool {
        match self.try_append(path, content) {
            Ok(()) => true,
            Err(e) => {
                log_failure("append", path, &e);
                false
            }
        }
    }

    /// Move or rename an existing file or directory
    pub fn move_path(&self, from: &str, to: &str) -> bool {
        match self.try_move(from, to) {
            Ok(()) => true,
            Err(e) => {
                log_failure("move", &format!("{} -> {}", from, to), &e);
                false
            }
        }
    }

    /// List the immediate children of a folder (empty string = root).
    ///
    /// Dotfiles and symlinks are skipped. Directories sort before files, then by name.
    /// A missing folder lists as empty.
    pub fn list(&self, folder: &str) -> Vec<Entry> {
        match self.try_list(folder) {
            Ok(entries) => entries,
            Err(e) => {
                log_failure("list", folder, &e);
                Vec::new()
            }
        }
    }

    /// Depth-first expansion of [`list`](Self::list): each directory is followed
    /// immediately by its own contents.
    pub fn recursive_list(&self, folder: &str) -> Vec<Entry> {
        let mut entries = Vec::new();
        self.collect_recursive(folder, &mut entries);
        entries
    }

    pub fn stats(&self) -> StoreStats {
        let entries = self.recursive_list("");
        let files: Vec<&Entry> = entries.iter().filter(|e| !e.is_dir).collect();

        StoreStats {
            total_files: entries.len(),
            total_size: files.iter().map(|e| e.size).sum(),
            last_modified: files.iter().map(|e| e.modified).max(),
        }
    }

    /// Create the layout folders (inbox, daily, projects, ...) under the root
    pub fn ensure_layout(&self) -> bool {
        let mut ok = true;
        for folder in self.config().layout.folders() {
            if let Err(e) = self.try_create_dir(folder) {
                log_failure("create folder", folder, &e);
                ok = false;
            }
        }
        if ok {
            log::info!("[VAULT] Layout ready under {}", self.root().display());
        }
        ok
    }

    /// Metadata of an existing path, resolved through the sandbox
    pub(crate) fn metadata(&self, path: &str) -> Option<fs::Metadata> {
        let abs = self.sandbox().resolve_for_read(path, false).ok()?;
        fs::metadata(abs).ok()
    }

    pub(crate) fn try_read(&self, path: &str) -> StoreResult<String> {
        let abs = self.sandbox().resolve_for_read(path, false)?;
        fs::read_to_string(&abs).map_err(StoreError::from_io)
    }

    fn try_write(&self, path: &str, content: &str) -> StoreResult<()> {
        let abs = self.sandbox().resolve_for_write(path)?;
        self.prepare_parent(&abs)?;
        fs::write(&abs, content)?;
        Ok(())
    }

    fn try_append(&self, path: &str, content: &str) -> StoreResult<()> {
        let abs = self.sandbox().resolve_for_write(path)?;
        self.prepare_parent(&abs)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&abs)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    fn try_move(&self, from: &str, to: &str) -> StoreResult<()> {
        let source = self.sandbox().resolve_for_move(from)?;
        let dest = self.sandbox().resolve_for_write(to)?;
        if dest != source && dest.starts_with(&source) {
            return Err(StoreError::InvalidInput(
                "destination is inside the source".to_string(),
            ));
        }

        let new_dirs = missing_parents(&dest);
        let moved = self
            .prepare_parent(&dest)
            .and_then(|()| fs::rename(&source, &dest).map_err(StoreError::from_io));
        if moved.is_err() {
            for dir in &new_dirs {
                if let Err(e) = fs::remove_dir(dir) {
                    log::debug!("[VAULT] Left directory {} after failed move: {}", dir.display(), e);
                }
            }
        }
        moved
    }

    fn try_create_dir(&self, path: &str) -> StoreResult<()> {
        let abs = self.sandbox().resolve_for_write(path)?;
        fs::create_dir_all(&abs)?;
        self.sandbox().revalidate_for_write(&abs)
    }

    /// Create missing parents, then re-check the target before the caller's syscall
    fn prepare_parent(&self, abs: &Path) -> StoreResult<()> {
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent)?;
        }
        self.sandbox().revalidate_for_write(abs)
    }

    fn try_list(&self, folder: &str) -> StoreResult<Vec<Entry>> {
        let dir = match self.sandbox().resolve_dir(folder) {
            Ok(dir) => dir,
            Err(StoreError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let base = self.sandbox().relative_path(&dir).ok_or(StoreError::Denied)?;

        let mut entries = Vec::new();
        for item in fs::read_dir(&dir)? {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    log::warn!("[VAULT] Skipping unreadable entry in {:?}: {}", folder, e);
                    continue;
                }
            };
            let name = item.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            match item.file_type() {
                Ok(ft) if ft.is_symlink() => continue,
                Ok(_) => {}
                Err(_) => continue,
            }
            let meta = match item.metadata() {
                Ok(meta) => meta,
                Err(_) => continue,
            };
            let path = if base.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", base, name)
            };
            entries.push(Entry::from_metadata(path, name, &meta));
        }

        entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }

    fn collect_recursive(&self, folder: &str, out: &mut Vec<Entry>) {
        for entry in self.list(folder) {
            let subfolder = entry.is_dir.then(|| entry.path.clone());
            out.push(entry);
            if let Some(subfolder) = subfolder {
                self.collect_recursive(&subfolder, out);
            }
        }
    }
}

/// Ancestors of `abs` that do not exist yet, deepest first
fn missing_parents(abs: &Path) -> Vec<PathBuf> {
    abs.ancestors()
        .skip(1)
        .take_while(|p| fs::symlink_metadata(p).is_err())
        .map(Path::to_path_buf)
        .collect()
}
