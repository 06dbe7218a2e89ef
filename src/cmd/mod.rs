//! Command modules - one file per CLI command

pub mod check;
pub mod install;
pub mod list;
pub mod remove;
