use std::fmt;
use std::path::PathBuf;

/// Non-fatal conditions met during a release run.
/// These are reported to the operator but do not change the outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseWarning {
    /// `--keep-temp` left the workspace on disk
    WorkspaceKept { path: PathBuf },
    /// Installed tree was not handed to the site group
    GroupNotApplied { group: String, reason: String },
    /// A local Git branch named like the release pointed somewhere else and was discarded
    StaleBranchDiscarded { branch: String, commit: String },
    /// Dry-run cannot prove the tag exists, so the plan assumes it will
    TagAssumed { tag: String },
}

impl fmt::Display for ReleaseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseWarning::WorkspaceKept { path } => {
                write!(f, "Temporary workspace kept at {}", path.display())
            }
            ReleaseWarning::GroupNotApplied { group, reason } => {
                write!(f, "Group ownership '{}' not applied: {}", group, reason)
            }
            ReleaseWarning::StaleBranchDiscarded { branch, commit } => {
                let short = if commit.len() > 7 {
                    &commit[..7]
                } else {
                    commit.as_str()
                };
                write!(
                    f,
                    "Discarded stale branch '{}' which pointed at {}",
                    branch, short
                )
            }
            ReleaseWarning::TagAssumed { tag } => {
                write!(f, "Dry run: assuming tag '{}' would have been created", tag)
            }
        }
    }
}
