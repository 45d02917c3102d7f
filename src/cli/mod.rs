//! Workflow entry points used by the binary

pub mod orchestration;

pub use orchestration::{
    resolve_backend, run_release_workflow, run_with_backend, run_with_executor,
    ReleaseWorkflowArgs,
};
