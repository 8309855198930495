//! Path sandbox: resolves caller-supplied paths beneath the store root.
//!
//! Every resolution runs in three stages:
//!   1. Lexical: the input is cleaned component by component and rejected if
//!      any `..` would climb above the root. No filesystem access happens here.
//!   2. Segment walk: every existing intermediate directory between the root
//!      and the target must be a real directory, never a symlink (even one
//!      pointing back inside the root).
//!   3. Canonical containment: the resolved target (for reads) or its nearest
//!      existing ancestor (for writes) is canonicalized and must sit at or
//!      below the canonical root, compared by components.
//!
//! Writers call [`PathSandbox::revalidate_for_write`] again after creating
//! parent directories, right before the write or rename syscall.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct PathSandbox {
    root: PathBuf,
}

impl PathSandbox {
    /// Create a sandbox over an existing directory. The root is canonicalized once here
    /// and re-canonicalized on every check.
    pub fn new(root: &Path) -> io::Result<Self> {
        let root = fs::canonicalize(root)?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("store root is not a directory: {}", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path that must already exist. Returns the canonical absolute path.
    ///
    /// An empty (or `.`) path resolves to the root only when `allow_empty_as_root` is set.
    pub fn resolve_for_read(&self, path: &str, allow_empty_as_root: bool) -> StoreResult<PathBuf> {
        let rel = clean_relative(path)?;
        if rel.as_os_str().is_empty() && !allow_empty_as_root {
            return Err(StoreError::InvalidInput("empty path".to_string()));
        }
        self.ensure_no_symlink_segments(&rel)?;

        let root = self.canonical_root()?;
        let canonical = fs::canonicalize(self.root.join(&rel)).map_err(StoreError::from_io)?;
        if !canonical.starts_with(&root) {
            return Err(StoreError::Denied);
        }
        Ok(canonical)
    }

    /// Resolve a folder to enumerate (empty = root). Unlike reads, the folder
    /// itself may not be a symlink, matching what listings show.
    pub fn resolve_dir(&self, path: &str) -> StoreResult<PathBuf> {
        self.resolve_no_follow(path, true)
    }

    /// Resolve an existing entry to move. The entry itself may not be a symlink,
    /// so a rename never acts on whatever the link points at.
    pub fn resolve_for_move(&self, path: &str) -> StoreResult<PathBuf> {
        self.resolve_no_follow(path, false)
    }

    fn resolve_no_follow(&self, path: &str, allow_empty_as_root: bool) -> StoreResult<PathBuf> {
        let canonical = self.resolve_for_read(path, allow_empty_as_root)?;
        let rel = clean_relative(path)?;
        if !rel.as_os_str().is_empty() {
            let meta = fs::symlink_metadata(self.root.join(&rel)).map_err(StoreError::from_io)?;
            if meta.file_type().is_symlink() {
                return Err(StoreError::Denied);
            }
        }
        Ok(canonical)
    }

    /// Resolve a path that may not exist yet. Returns the (non-canonical) absolute
    /// path under the root that the caller should create or overwrite.
    pub fn resolve_for_write(&self, path: &str) -> StoreResult<PathBuf> {
        let rel = clean_relative(path)?;
        if rel.as_os_str().is_empty() {
            return Err(StoreError::InvalidInput("empty path".to_string()));
        }
        self.ensure_no_symlink_segments(&rel)?;

        let target = self.root.join(&rel);
        self.ensure_writable(&target)?;
        Ok(target)
    }

    /// Re-run the writable checks on a path previously returned by
    /// [`resolve_for_write`](Self::resolve_for_write). Narrows the window in which a
    /// symlink planted after validation (e.g. during parent directory creation) could
    /// redirect the write; it does not close it.
    pub fn revalidate_for_write(&self, target: &Path) -> StoreResult<()> {
        let rel = target.strip_prefix(&self.root).map_err(|_| StoreError::Denied)?;
        if rel.as_os_str().is_empty() {
            return Err(StoreError::Denied);
        }
        self.ensure_no_symlink_segments(rel)?;
        self.ensure_writable(target)
    }

    /// Store-relative, `/`-separated form of an absolute path inside the root.
    /// The root itself maps to the empty string.
    pub fn relative_path(&self, abs: &Path) -> Option<String> {
        let rel = abs.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        Some(parts.join("/"))
    }

    fn canonical_root(&self) -> StoreResult<PathBuf> {
        fs::canonicalize(&self.root).map_err(StoreError::from_io)
    }

    /// Walk from the root towards `rel`, refusing any existing intermediate segment
    /// that is a symlink. The final segment is left to the read/write checks.
    fn ensure_no_symlink_segments(&self, rel: &Path) -> StoreResult<()> {
        let mut current = self.root.clone();
        let mut components = rel.components().peekable();

        while let Some(component) = components.next() {
            if components.peek().is_none() {
                break;
            }
            current.push(component);
            match fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => return Err(StoreError::Denied),
                Ok(_) => {}
                // Nothing deeper can exist either
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(StoreError::Io(e)),
            }
        }
        Ok(())
    }

    fn ensure_writable(&self, target: &Path) -> StoreResult<()> {
        let root = self.canonical_root()?;

        match fs::symlink_metadata(target) {
            Ok(meta) => {
                if meta.file_type().is_symlink() {
                    return Err(StoreError::Denied);
                }
                let canonical = fs::canonicalize(target).map_err(StoreError::from_io)?;
                if !canonical.starts_with(&root) {
                    return Err(StoreError::Denied);
                }
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let ancestor = nearest_existing_ancestor(target).ok_or(StoreError::Denied)?;
                let canonical = fs::canonicalize(ancestor).map_err(StoreError::from_io)?;
                if !canonical.starts_with(&root) {
                    return Err(StoreError::Denied);
                }
                Ok(())
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Lexically clean a caller path into root-relative components.
///
/// Absolute inputs are treated as root-relative. A `..` that would climb above the
/// root is a denial.
fn clean_relative(path: &str) -> StoreResult<PathBuf> {
    let mut rel = PathBuf::new();
    for component in Path::new(path.trim()).components() {
        match component {
            Component::Normal(part) => rel.push(part),
            Component::ParentDir => {
                if !rel.pop() {
                    return Err(StoreError::Denied);
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Ok(rel)
}

fn nearest_existing_ancestor(target: &Path) -> Option<&Path> {
    target
        .ancestors()
        .skip(1)
        .find(|p| fs::symlink_metadata(p).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sandbox() -> (tempfile::TempDir, PathSandbox) {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir(&root).unwrap();
        let sandbox = PathSandbox::new(&root).unwrap();
        (dir, sandbox)
    }

    #[test]
    fn test_clean_relative() {
        assert_eq!(clean_relative("a/./b").unwrap(), PathBuf::from("a/b"));
        assert_eq!(clean_relative("a/../b").unwrap(), PathBuf::from("b"));
        assert_eq!(clean_relative("/etc/passwd").unwrap(), PathBuf::from("etc/passwd"));
        assert_eq!(clean_relative("  notes/x.md  ").unwrap(), PathBuf::from("notes/x.md"));
        assert!(matches!(clean_relative(".."), Err(StoreError::Denied)));
        assert!(matches!(clean_relative("a/../../b"), Err(StoreError::Denied)));
        assert!(matches!(
            clean_relative("../../../../../etc/passwd"),
            Err(StoreError::Denied)
        ));
    }

    #[test]
    fn test_empty_path_handling() {
        let (_dir, sandbox) = sandbox();
        assert!(sandbox.resolve_for_read("", false).is_err());
        assert!(sandbox.resolve_for_read("   ", false).is_err());
        assert!(sandbox.resolve_for_read(".", false).is_err());
        assert_eq!(sandbox.resolve_for_read("", true).unwrap(), sandbox.root());
        assert!(sandbox.resolve_for_write("").is_err());
        assert!(sandbox.resolve_for_write("a/..").is_err());
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (_dir, sandbox) = sandbox();
        assert!(matches!(
            sandbox.resolve_for_read("nope.md", false),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_write_new_nested_path() {
        let (_dir, sandbox) = sandbox();
        let target = sandbox.resolve_for_write("a/b/c.md").unwrap();
        assert_eq!(target, sandbox.root().join("a/b/c.md"));
    }

    #[test]
    fn test_absolute_input_stays_inside_root() {
        let (_dir, sandbox) = sandbox();
        let target = sandbox.resolve_for_write("/etc/passwd").unwrap();
        assert!(target.starts_with(sandbox.root()));
    }

    #[test]
    fn test_relative_path() {
        let (_dir, sandbox) = sandbox();
        let abs = sandbox.root().join("a").join("b.md");
        assert_eq!(sandbox.relative_path(&abs).as_deref(), Some("a/b.md"));
        assert_eq!(sandbox.relative_path(sandbox.root()).as_deref(), Some(""));
        assert_eq!(sandbox.relative_path(Path::new("/elsewhere")), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_blocked_even_inside_root() {
        use std::os::unix::fs::symlink;
        let (_dir, sandbox) = sandbox();
        let real = sandbox.root().join("real");
        fs::create_dir(&real).unwrap();
        fs::write(real.join("note.md"), "x").unwrap();
        symlink(&real, sandbox.root().join("alias")).unwrap();

        assert!(sandbox.resolve_for_read("real/note.md", false).is_ok());
        assert!(matches!(
            sandbox.resolve_for_read("alias/note.md", false),
            Err(StoreError::Denied)
        ));
        assert!(matches!(
            sandbox.resolve_for_write("alias/new.md"),
            Err(StoreError::Denied)
        ));
        assert!(sandbox.resolve_dir("real").is_ok());
        assert!(matches!(sandbox.resolve_dir("alias"), Err(StoreError::Denied)));
        assert!(sandbox.resolve_for_move("real/note.md").is_ok());
        assert!(matches!(sandbox.resolve_for_move("alias"), Err(StoreError::Denied)));
        assert!(sandbox.resolve_for_move("").is_err());
        assert_eq!(sandbox.resolve_dir("").unwrap(), sandbox.root());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_blocked() {
        use std::os::unix::fs::symlink;
        let (dir, sandbox) = sandbox();
        let outside = dir.path().join("outside");
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("secret.md"), "secret").unwrap();
        symlink(&outside, sandbox.root().join("evil")).unwrap();

        assert!(sandbox.resolve_for_read("evil/secret.md", false).is_err());
        assert!(sandbox.resolve_for_write("evil/x.md").is_err());
        // The link itself as a final segment: readable target is outside, so denied
        assert!(matches!(
            sandbox.resolve_for_read("evil", false),
            Err(StoreError::Denied)
        ));
        assert!(matches!(sandbox.resolve_for_write("evil"), Err(StoreError::Denied)));
    }

    #[cfg(unix)]
    #[test]
    fn test_sibling_with_root_prefix_is_outside() {
        use std::os::unix::fs::symlink;
        let (dir, sandbox) = sandbox();
        let sibling = dir.path().join("root-evil");
        fs::create_dir(&sibling).unwrap();
        fs::write(sibling.join("secret.md"), "secret").unwrap();
        symlink(sibling.join("secret.md"), sandbox.root().join("link.md")).unwrap();

        assert!(matches!(
            sandbox.resolve_for_read("link.md", false),
            Err(StoreError::Denied)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_revalidate_catches_planted_symlink() {
        use std::os::unix::fs::symlink;
        let (dir, sandbox) = sandbox();
        let outside = dir.path().join("outside");
        fs::create_dir(&outside).unwrap();

        let target = sandbox.resolve_for_write("late/x.md").unwrap();
        // Directory swapped for a symlink between validation and write
        symlink(&outside, sandbox.root().join("late")).unwrap();
        assert!(matches!(
            sandbox.revalidate_for_write(&target),
            Err(StoreError::Denied)
        ));
    }
}
