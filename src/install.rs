//! Post-install permission and ownership fixes

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

use crate::config::SiteSettings;
use crate::error::{ReleaseError, Result};
use crate::exec::{Cmd, CommandExecutor};
use crate::warning::ReleaseWarning;

/// Makes an installed release tree read-only and hands it to the site group.
pub struct InstallFinalizer<'a> {
    site: &'a SiteSettings,
    exec: &'a CommandExecutor,
}

impl<'a> InstallFinalizer<'a> {
    pub fn new(site: &'a SiteSettings, exec: &'a CommandExecutor) -> Self {
        InstallFinalizer { site, exec }
    }

    /// Fix permissions under `dir`, then apply the site group if possible.
    ///
    /// # Returns
    /// * `Ok(warnings)` - Tree finalized; a skipped group change is a warning
    /// * `Err(ReleaseError::Install)` - Permissions or group could not be set
    pub fn finalize(&self, dir: &Path) -> Result<Vec<ReleaseWarning>> {
        if self.exec.is_dry_run() {
            log::info!("dry-run, leaving permissions of {} alone", dir.display());
            return Ok(Vec::new());
        }

        fix_permissions(dir).map_err(|e| {
            ReleaseError::install(dir, format!("cannot fix permissions: {}", e))
        })?;

        let Some(group) = &self.site.install_group else {
            return Ok(Vec::new());
        };

        if !self.site.group_roots.iter().any(|root| dir.starts_with(root)) {
            log::debug!(
                "{} is outside the site roots, not changing its group",
                dir.display()
            );
            return Ok(Vec::new());
        }

        if !self.is_member(group)? {
            return Ok(vec![ReleaseWarning::GroupNotApplied {
                group: group.clone(),
                reason: "the current user is not a member".to_string(),
            }]);
        }

        self.exec
            .run(&Cmd::new("chgrp").args(["-R", group.as_str()]).path_arg(dir), true)
            .map_err(|e| match e {
                ReleaseError::Interrupted => ReleaseError::Interrupted,
                other => ReleaseError::install(dir, format!("chgrp {} failed: {}", group, other)),
            })?;
        Ok(Vec::new())
    }

    fn is_member(&self, group: &str) -> Result<bool> {
        let groups = self.exec.query(&Cmd::new("id").arg("-Gn"))?;
        Ok(groups.is_some_and(|groups| groups.split_whitespace().any(|g| g == group)))
    }
}

/// Files lose every write bit; directories become group-writable.
pub fn fix_permissions(dir: &Path) -> io::Result<()> {
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            continue;
        }
        let mut permissions = entry.metadata().map_err(io::Error::from)?.permissions();
        if file_type.is_dir() {
            set_group_writable(&mut permissions);
        } else {
            permissions.set_readonly(true);
        }
        fs::set_permissions(entry.path(), permissions)?;
    }
    Ok(())
}

/// Give the owner write access to everything under `dir` again.
pub fn make_writable(dir: &Path) -> io::Result<()> {
    // Directories first, so their contents can be reached and changed.
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_symlink() {
            continue;
        }
        let mut permissions = entry.metadata().map_err(io::Error::from)?.permissions();
        set_owner_writable(&mut permissions, entry.file_type().is_dir());
        fs::set_permissions(entry.path(), permissions)?;
    }
    Ok(())
}

/// Delete a tree that may contain read-only files. A missing tree is fine.
pub fn remove_tree(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    make_writable(dir)?;
    fs::remove_dir_all(dir)
}

#[cfg(unix)]
fn set_group_writable(permissions: &mut fs::Permissions) {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(permissions.mode() | 0o020);
}

#[cfg(not(unix))]
fn set_group_writable(_permissions: &mut fs::Permissions) {}

#[cfg(unix)]
fn set_owner_writable(permissions: &mut fs::Permissions, is_dir: bool) {
    use std::os::unix::fs::PermissionsExt;
    let bits = if is_dir { 0o700 } else { 0o200 };
    permissions.set_mode(permissions.mode() | bits);
}

#[cfg(not(unix))]
fn set_owner_writable(permissions: &mut fs::Permissions, _is_dir: bool) {
    permissions.set_readonly(false);
}
