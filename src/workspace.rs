// src/workspace.rs

//! Temporary workspaces with guaranteed teardown
//!
//! A [`Workspace`] is an exclusively owned directory created atomically with
//! an unpredictable name. It is removed exactly once: either explicitly via
//! [`Workspace::close`], which reports the outcome, or when the handle is
//! dropped, which logs a failure at warn level.
//!
//! [`WorkspaceRoot`] counts allocations and removals so callers can check
//! that every workspace was torn down.

use crate::error::{Error, Result};
use crate::filesystem::remove_recursive;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Random characters in a workspace name
const NAME_RANDOM_LEN: usize = 12;

/// Allocation and removal counters shared by all workspaces of a root
#[derive(Debug, Default)]
pub struct WorkspaceStats {
    allocated: AtomicUsize,
    removed: AtomicUsize,
}

impl WorkspaceStats {
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    pub fn removed(&self) -> usize {
        self.removed.load(Ordering::SeqCst)
    }

    /// Workspaces allocated but not yet torn down
    pub fn live(&self) -> usize {
        self.allocated().saturating_sub(self.removed())
    }
}

/// Parent directory that workspaces are allocated under
#[derive(Debug, Clone)]
pub struct WorkspaceRoot {
    root: PathBuf,
    stats: Arc<WorkspaceStats>,
}

impl WorkspaceRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            stats: Arc::new(WorkspaceStats::default()),
        }
    }

    /// Workspaces under the system temporary directory
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn stats(&self) -> Arc<WorkspaceStats> {
        Arc::clone(&self.stats)
    }

    /// Create a fresh workspace named `<prefix><random>`
    ///
    /// Creation is atomic: an existing directory is never reused.
    pub fn allocate(&self, prefix: &str) -> Result<Workspace> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .rand_bytes(NAME_RANDOM_LEN)
            .disable_cleanup(true)
            .tempdir_in(&self.root)
            .map_err(|e| {
                Error::Io(format!(
                    "Failed to create workspace in {}: {}",
                    self.root.display(),
                    e
                ))
            })?;
        let path = dir.path().to_path_buf();
        drop(dir);

        self.stats.allocated.fetch_add(1, Ordering::SeqCst);
        debug!("Allocated workspace {}", path.display());

        Ok(Workspace {
            path,
            stats: Arc::clone(&self.stats),
            released: false,
        })
    }
}

/// Exclusively owned temporary directory
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    stats: Arc<WorkspaceStats>,
    released: bool,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Remove the workspace now and report the outcome
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.stats.removed.fetch_add(1, Ordering::SeqCst);
        debug!("Removing workspace {}", self.path.display());
        remove_recursive(&self.path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to remove workspace {}: {}", self.path.display(), e);
        }
    }
}
