//! Advisory per-package install lock
//!
//! Shadow-then-rename promotion is only atomic with a single writer, so
//! concurrent installs of the same package must be serialized. Different
//! packages lock different files and proceed in parallel.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;

use crate::types::PackageName;
use crate::Paths;

/// Held for the duration of one install run; the lock file is removed on
/// drop, including on failure paths.
#[derive(Debug)]
pub struct InstallLock {
    path: PathBuf,
}

impl InstallLock {
    /// Fails with `AlreadyExists` when another run holds the lock.
    pub fn acquire(paths: &Paths, name: &PackageName) -> io::Result<Self> {
        let dir = paths.tmp();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{name}.lock"));
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        Ok(Self { path })
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
