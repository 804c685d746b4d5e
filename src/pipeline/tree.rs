//! Scoped ownership of the decompiled source tree
//!
//! The tree is removed when the guard is released or dropped, so every exit
//! path of a run (including fatal errors) attempts the cleanup. Failing to
//! remove it is only ever a warning.

use std::fs;
use std::path::{Path, PathBuf};

use crate::ui;

/// Guard over `<base>_src`
#[derive(Debug)]
pub struct DecompiledTree {
    path: PathBuf,
    released: bool,
}

impl DecompiledTree {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the tree now. Returns whether nothing is left on disk.
    pub fn release(&mut self) -> bool {
        self.released = true;

        if !self.path.exists() {
            return true;
        }

        match fs::remove_dir_all(&self.path) {
            Ok(()) => {
                tracing::debug!("removed {}", self.path.display());
                true
            }
            Err(e) => {
                tracing::debug!("failed to remove {}: {e}", self.path.display());
                ui::warning(&format!(
                    "Failed to remove {}: {e}",
                    self.path.display()
                ));
                false
            }
        }
    }
}

impl Drop for DecompiledTree {
    fn drop(&mut self) {
        if !self.released {
            self.release();
        }
    }
}
