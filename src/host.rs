//! Host package database seam
//!
//! Preflight only needs to know whether a prerequisite is present; the
//! surrounding package manager owns ordering and version policy.

use std::path::PathBuf;

use crate::types::PackageName;
use crate::Paths;

/// Read-only presence lookup against the host package database.
pub trait PackageLookup: Send + Sync {
    fn exists(&self, name: &PackageName) -> bool;
}

/// Lookup backed by the keg tree itself: a package is present once it has a
/// `current` keg.
#[derive(Debug, Clone)]
pub struct InstalledKegs {
    kegs_root: PathBuf,
}

impl InstalledKegs {
    pub fn new(paths: &Paths) -> Self {
        Self {
            kegs_root: paths.kegs(),
        }
    }
}

impl PackageLookup for InstalledKegs {
    fn exists(&self, name: &PackageName) -> bool {
        self.kegs_root.join(name.as_str()).join("current").exists()
    }
}
