use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{ReleaseError, Result};
use crate::install;
use crate::interrupt;

const WORKSPACE_PREFIX: &str = "pkg-release-";

/// The per-run temporary directory.
///
/// Removed by [`Workspace::teardown`] (or on drop) unless it was created
/// with `keep` set, in which case it is left on disk and its path reported.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
    keep: bool,
}

impl Workspace {
    pub fn create(keep: bool) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()
            .map_err(|e| {
                ReleaseError::build(format!("cannot create a temporary workspace: {}", e), "")
            })?;
        let path = dir.path().to_path_buf();
        if !keep {
            interrupt::register_workspace(&path);
        }
        log::debug!("workspace {}", path.display());
        Ok(Workspace {
            dir: Some(dir),
            path,
            keep,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the workspace, or release it to the operator when kept.
    ///
    /// # Returns
    /// * `Ok(Some(path))` - The workspace was kept at `path`
    /// * `Ok(None)` - The workspace is gone (or was already torn down)
    pub fn teardown(&mut self) -> Result<Option<PathBuf>> {
        let Some(dir) = self.dir.take() else {
            return Ok(self.keep.then(|| self.path.clone()));
        };

        if self.keep {
            #[allow(deprecated)]
            let path = dir.into_path();
            return Ok(Some(path));
        }

        interrupt::unregister_workspace(&self.path);
        // Installed-style read-only files defeat TempDir's own removal.
        let removed = install::remove_tree(&self.path);
        drop(dir);
        removed?;
        log::debug!("removed workspace {}", self.path.display());
        Ok(None)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            log::warn!("failed to remove workspace {}: {}", self.path.display(), e);
        }
    }
}
