//! Transient staging area
//!
//! Everything a run downloads, unpacks, or shadows lives in one exclusively
//! owned temp directory under `tmp/`, which sits on the same volume as the
//! keg tree so promotion is a plain rename. The directory is removed
//! unconditionally on drop, success or failure.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::Paths;

/// Scratch space for one install run.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    pub fn new(paths: &Paths) -> io::Result<Self> {
        let tmp = paths.tmp();
        std::fs::create_dir_all(&tmp)?;
        let dir = tempfile::Builder::new().prefix("cellar-").tempdir_in(tmp)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where a downloaded archive lands before verification. Prefixed with
    /// the resource name so identical filenames don't collide.
    pub fn download_path(&self, resource: &str, filename: &str) -> io::Result<PathBuf> {
        let downloads = self.dir.path().join("downloads");
        std::fs::create_dir_all(&downloads)?;
        Ok(downloads.join(format!("{resource}-{filename}")))
    }

    /// The directory a verified resource unpacks into, created on demand.
    pub fn resource_dir(&self, resource: &str) -> io::Result<PathBuf> {
        let dir = self.dir.path().join("bundle").join(resource);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Shadow prefix the installer populates before the atomic promote.
    pub fn shadow_dir(&self) -> io::Result<PathBuf> {
        let dir = self.dir.path().join("shadow");
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// View over the unpacked resources, for resolving install directives.
    pub fn bundle(&self) -> StagedBundle {
        StagedBundle {
            root: self.dir.path().join("bundle"),
        }
    }
}

/// The unpacked contents of all staged resources, rooted at one directory
/// with a subdirectory per resource.
#[derive(Debug)]
pub struct StagedBundle {
    root: PathBuf,
}

impl StagedBundle {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a manifest step source (`<resource>/<path>`) to an absolute
    /// staged path.
    pub fn resolve(&self, source: &str) -> PathBuf {
        self.root.join(source)
    }
}
