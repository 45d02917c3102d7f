use std::path::PathBuf;

use crate::domain::package::Package;
use crate::domain::version::ReleaseVersion;

/// Operator flags carried through a release run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseFlags {
    pub dry_run: bool,
    pub no_tag: bool,
    pub no_test_build: bool,
    pub batch: bool,
    pub quiet: bool,
    pub verbose: bool,
    pub keep_temp: bool,
    pub no_msg: bool,
    pub rm_build: bool,
    pub rm_tag: bool,
    pub nuke_release: bool,
}

impl ReleaseFlags {
    /// True for the inverse flows that delete a build and/or a tag.
    pub fn is_removal(&self) -> bool {
        self.rm_build || self.rm_tag || self.nuke_release
    }

    pub fn removes_build(&self) -> bool {
        self.rm_build || self.nuke_release
    }

    pub fn removes_tag(&self) -> bool {
        self.rm_tag || self.nuke_release
    }

    /// Whether this run creates a tag.
    pub fn creates_tag(&self) -> bool {
        !self.no_tag && !self.is_removal()
    }
}

/// A release request as supplied by the operator, possibly incomplete.
///
/// Only [`crate::validate::ReleaseValidator`] turns it into a [`ResolvedRelease`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseRequest {
    pub package: Option<String>,
    pub version: Option<String>,
    pub branch: Option<String>,
    pub message: Option<String>,
    pub install_dir: Option<PathBuf>,
    pub flags: ReleaseFlags,
}

/// A fully validated release, ready for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRelease {
    pub package: Package,
    pub version: ReleaseVersion,
    /// Branch the release is cut from, in the backend's own notation
    /// (a branch name for Git and CVS, a URL for Subversion).
    pub branch: String,
    /// Where the tag lives (or will live), for display.
    pub tag_location: String,
    /// Release message; `None` only when no tag is created.
    pub message: Option<String>,
    pub install_dir: PathBuf,
    pub flags: ReleaseFlags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags_create_tag() {
        let flags = ReleaseFlags::default();
        assert!(flags.creates_tag());
        assert!(!flags.is_removal());
    }

    #[test]
    fn test_nuke_implies_both_removals() {
        let flags = ReleaseFlags {
            nuke_release: true,
            ..Default::default()
        };
        assert!(flags.is_removal());
        assert!(flags.removes_build());
        assert!(flags.removes_tag());
        assert!(!flags.creates_tag());
    }

    #[test]
    fn test_no_tag_disables_tagging() {
        let flags = ReleaseFlags {
            no_tag: true,
            ..Default::default()
        };
        assert!(!flags.creates_tag());
        assert!(!flags.is_removal());
    }
}
