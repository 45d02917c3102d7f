//! Domain types - pure release rules independent of any version-control system

pub mod outcome;
pub mod package;
pub mod request;
pub mod version;

pub use outcome::PipelineOutcome;
pub use package::Package;
pub use request::{ReleaseFlags, ReleaseRequest, ResolvedRelease};
pub use version::{ReleaseVersion, VERSION_GRAMMAR};
