//! Network and archive I/O.

pub mod download;
pub mod extract;
