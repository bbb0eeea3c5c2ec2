//! Shared mutable state consulted by tool safety preconditions.
//!
//! A [`ToolContext`] is a cheap handle: cloning it yields another handle onto
//! the *same* state, which is how a sequential handoff chain keeps its
//! read-markers. [`ToolContext::fork`] is the only way to get isolated state,
//! and it is what parallel branches receive.
//!
//! Sharing rules for a fork:
//!
//! | piece               | fork semantics                      |
//! |---------------------|-------------------------------------|
//! | read-markers        | snapshot copy, never merged back    |
//! | key/value store     | snapshot copy, never merged back    |
//! | write lock          | same object as the parent           |
//! | `is_parallel_branch`| always `true`                       |

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};

use super::error::ToolError;

#[derive(Debug, Clone, Default)]
struct ContextState {
    read_markers: HashSet<PathBuf>,
    values: HashMap<String, Value>,
}

/// Handle onto tool state for one agency (or one parallel branch).
#[derive(Clone)]
pub struct ToolContext {
    state: Arc<RwLock<ContextState>>,
    write_lock: Arc<Mutex<()>>,
    work_dir: Option<PathBuf>,
    is_parallel_branch: bool,
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("ToolContext")
            .field("read_markers", &state.read_markers.len())
            .field("values", &state.values.len())
            .field("work_dir", &self.work_dir)
            .field("is_parallel_branch", &self.is_parallel_branch)
            .finish()
    }
}

impl ToolContext {
    /// Create a root context. File tools resolve relative paths against
    /// `work_dir` and refuse paths that escape it.
    pub fn new(work_dir: Option<PathBuf>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ContextState::default())),
            write_lock: Arc::new(Mutex::new(())),
            work_dir,
            is_parallel_branch: false,
        }
    }

    /// Produce an isolated branch context.
    ///
    /// Read-markers and values are copied; the write-arbitration lock is
    /// shared by identity with `self`.
    pub fn fork(&self) -> ToolContext {
        let snapshot = self.state.read().clone();
        ToolContext {
            state: Arc::new(RwLock::new(snapshot)),
            write_lock: Arc::clone(&self.write_lock),
            work_dir: self.work_dir.clone(),
            is_parallel_branch: true,
        }
    }

    pub fn is_parallel_branch(&self) -> bool {
        self.is_parallel_branch
    }

    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }

    /// Whether `other` arbitrates writes through the same lock object.
    pub fn shares_write_lock(&self, other: &ToolContext) -> bool {
        Arc::ptr_eq(&self.write_lock, &other.write_lock)
    }

    /// Acquire the write-arbitration lock. Hold the guard for the whole
    /// read-modify-write of a file.
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    // -----------------------------------------------------------------------
    // Read-markers
    // -----------------------------------------------------------------------

    pub fn mark_read(&self, path: &Path) {
        self.state.write().read_markers.insert(path.to_path_buf());
    }

    pub fn is_marked_read(&self, path: &Path) -> bool {
        self.state.read().read_markers.contains(path)
    }

    /// Snapshot of every path marked read, sorted.
    pub fn read_markers(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.state.read().read_markers.iter().cloned().collect();
        paths.sort();
        paths
    }

    // -----------------------------------------------------------------------
    // Key/value store
    // -----------------------------------------------------------------------

    pub fn set_value(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.state.write().values.insert(key.into(), value)
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.state.read().values.get(key).cloned()
    }

    pub fn remove_value(&self, key: &str) -> Option<Value> {
        self.state.write().values.remove(key)
    }

    // -----------------------------------------------------------------------
    // Paths
    // -----------------------------------------------------------------------

    /// Resolve a tool-supplied path to a canonical absolute path.
    ///
    /// Relative paths are joined onto the work dir (or the process cwd).
    /// Symlinks along the existing part of the path are resolved, so the
    /// result is also the read-marker key. With a work dir set, the result
    /// must stay inside it.
    pub fn resolve_path(&self, raw: &str) -> Result<PathBuf, ToolError> {
        let root = match self.work_dir {
            Some(ref wd) => Some(canonical(&normalize(&anchor(wd)?))?),
            None => None,
        };
        let candidate = Path::new(raw);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            match root {
                Some(ref root) => root.join(candidate),
                None => std::env::current_dir()?.join(candidate),
            }
        };
        let resolved = canonical(&normalize(&joined))?;

        if let Some(ref root) = root {
            if !resolved.starts_with(root) {
                return Err(outside(raw, root));
            }
        }
        Ok(resolved)
    }

    /// Whether `path` (already on disk) lies inside the work dir once
    /// symlinks are resolved. Always true without a work dir.
    pub fn contains(&self, path: &Path) -> bool {
        path.to_str().is_some_and(|p| self.resolve_path(p).is_ok())
    }
}

fn outside(raw: &str, root: &Path) -> ToolError {
    ToolError::PreconditionFailed(format!(
        "path {} is outside the working directory {}",
        raw,
        root.display()
    ))
}

fn anchor(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Lexically collapse `.` and `..` without touching the file system.
/// Expects an absolute path; `..` at the root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the deepest existing ancestor of a normalized absolute path
/// and re-append the components that do not exist yet.
///
/// A dangling symlink counts as existing, so canonicalizing it fails
/// instead of letting a later write follow it.
fn canonical(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();
    while std::fs::symlink_metadata(existing).is_err() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(path.to_path_buf()),
        }
    }
    let mut out = std::fs::canonicalize(existing)?;
    for name in missing.iter().rev() {
        out.push(name);
    }
    Ok(out)
}
