use std::fmt;

/// Terminal state of one pipeline run. Exactly one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    Success,
    ValidationFailed,
    BuildFailed,
    VcsFailed,
    InstallFailed,
    UserAborted,
    Interrupted,
    InternalError,
}

impl PipelineOutcome {
    /// Process exit code for this outcome.
    ///
    /// | code | outcome          |
    /// |------|------------------|
    /// | 0    | Success          |
    /// | 1    | InternalError    |
    /// | 3    | ValidationFailed |
    /// | 4    | BuildFailed      |
    /// | 5    | VcsFailed        |
    /// | 6    | InstallFailed    |
    /// | 7    | UserAborted      |
    /// | 130  | Interrupted      |
    ///
    /// Code 2 is left to clap for usage errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineOutcome::Success => 0,
            PipelineOutcome::InternalError => 1,
            PipelineOutcome::ValidationFailed => 3,
            PipelineOutcome::BuildFailed => 4,
            PipelineOutcome::VcsFailed => 5,
            PipelineOutcome::InstallFailed => 6,
            PipelineOutcome::UserAborted => 7,
            PipelineOutcome::Interrupted => 130,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == PipelineOutcome::Success
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipelineOutcome::Success => "success",
            PipelineOutcome::ValidationFailed => "validation failed",
            PipelineOutcome::BuildFailed => "build failed",
            PipelineOutcome::VcsFailed => "version control failure",
            PipelineOutcome::InstallFailed => "install failed",
            PipelineOutcome::UserAborted => "aborted by user",
            PipelineOutcome::Interrupted => "interrupted",
            PipelineOutcome::InternalError => "internal error",
        }
    }
}

impl fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
