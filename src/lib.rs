pub mod build;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod exec;
pub mod install;
pub mod interrupt;
pub mod pipeline;
pub mod repo;
pub mod ui;
pub mod validate;
pub mod warning;

pub use error::{ReleaseError, Result};
