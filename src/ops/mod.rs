//! Install operations: the orchestrator and its collaborators.

pub mod config;
pub mod error;
pub mod install;
pub mod lock;
pub mod prefix;
pub mod service;

pub use error::InstallError;
pub use install::{Context, InstallReport};
