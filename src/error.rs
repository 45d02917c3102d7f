use std::path::PathBuf;

use thiserror::Error;

use crate::domain::outcome::PipelineOutcome;
use crate::domain::version::VERSION_GRAMMAR;

/// Unified error type for pkg-release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Invalid release version '{version}': expected {}", VERSION_GRAMMAR)]
    InvalidVersion { version: String },

    /// Low-level failure of an external command. Always wrapped into one of the
    /// operator-facing variants before it reaches the user.
    #[error("Command `{command}` failed with exit code {}\nStdout: {stdout}\nStderr: {stderr}",
        exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    CommandFailed {
        command: String,
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    #[error("Validation error: {reason}")]
    Validation { reason: String },

    #[error("Checkout of {revision} failed: {detail}")]
    CheckoutFailed { revision: String, detail: String },

    #[error("Tagging {tag} failed: {detail}")]
    TagFailed { tag: String, detail: String },

    #[error("Removing tag {tag} failed: {detail}")]
    TagRemovalFailed { tag: String, detail: String },

    #[error("Build error: {message}{}", if output.is_empty() { String::new() } else { format!("\n{}", output) })]
    Build { message: String, output: String },

    #[error("Install error at {}: {message}", path.display())]
    Install { path: PathBuf, message: String },

    #[error("Interrupted by user")]
    Interrupted,

    #[error("Aborted by user: {0}")]
    Aborted(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results in pkg-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    pub fn validation(reason: impl Into<String>) -> Self {
        ReleaseError::Validation {
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    pub fn build(message: impl Into<String>, output: impl Into<String>) -> Self {
        ReleaseError::Build {
            message: message.into(),
            output: output.into(),
        }
    }

    pub fn install(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ReleaseError::Install {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ReleaseError::Internal(msg.into())
    }

    /// Wrap a failure raised while materializing `revision`.
    pub fn checkout_failed(revision: impl Into<String>, cause: ReleaseError) -> Self {
        match cause {
            ReleaseError::Interrupted => ReleaseError::Interrupted,
            cause @ ReleaseError::CheckoutFailed { .. } => cause,
            cause => ReleaseError::CheckoutFailed {
                revision: revision.into(),
                detail: cause.to_string(),
            },
        }
    }

    /// Wrap a failure raised while creating `tag`.
    pub fn tag_failed(tag: impl Into<String>, cause: ReleaseError) -> Self {
        match cause {
            ReleaseError::Interrupted => ReleaseError::Interrupted,
            cause => ReleaseError::TagFailed {
                tag: tag.into(),
                detail: cause.to_string(),
            },
        }
    }

    /// Wrap a failure raised while deleting `tag`.
    pub fn tag_removal_failed(tag: impl Into<String>, cause: ReleaseError) -> Self {
        match cause {
            ReleaseError::Interrupted => ReleaseError::Interrupted,
            cause => ReleaseError::TagRemovalFailed {
                tag: tag.into(),
                detail: cause.to_string(),
            },
        }
    }

    /// Terminal pipeline outcome this error produces.
    pub fn outcome(&self) -> PipelineOutcome {
        match self {
            ReleaseError::InvalidVersion { .. }
            | ReleaseError::Validation { .. }
            | ReleaseError::Config(_) => PipelineOutcome::ValidationFailed,
            ReleaseError::CheckoutFailed { .. }
            | ReleaseError::TagFailed { .. }
            | ReleaseError::TagRemovalFailed { .. } => PipelineOutcome::VcsFailed,
            ReleaseError::Build { .. } => PipelineOutcome::BuildFailed,
            ReleaseError::Install { .. } => PipelineOutcome::InstallFailed,
            ReleaseError::Interrupted => PipelineOutcome::Interrupted,
            ReleaseError::Aborted(_) => PipelineOutcome::UserAborted,
            ReleaseError::CommandFailed { .. }
            | ReleaseError::Io(_)
            | ReleaseError::Internal(_) => PipelineOutcome::InternalError,
        }
    }
}
