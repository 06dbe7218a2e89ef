//! cellar - keg-style installer for pre-built binary packages
//!
//! Takes a declarative TOML manifest describing remote artifacts, fetches and
//! verifies them, and installs the result into an isolated, versioned prefix
//! ("keg"). Nothing becomes visible until a final atomic rename, so a failed
//! install never leaves a half-populated prefix behind.
//!
//! # Pipeline
//!
//! `preflight` -> `fetch + verify` -> `stage` -> `prefix install` ->
//! `config write` -> `service registration`, strictly in that order. The
//! orchestrator lives in [`ops::install`]; every earlier stage is a leaf
//! module with its own error type.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.cellar/
//! ├── kegs/       # versioned prefixes: <name>/<version>-<revision>/ + `current` symlink
//! ├── etc/        # generated config, written once and never clobbered
//! ├── services/   # supervisor descriptors, upserted by package identity
//! └── tmp/        # staging areas and shadow prefixes (same volume as kegs/)
//! ```

pub mod host;
pub mod io;
pub mod manifest;
pub mod ops;
pub mod stage;
pub mod types;

pub use manifest::Manifest;
pub use ops::InstallError;
pub use types::{PackageName, Version};

use std::path::{Path, PathBuf};

/// User Agent string
pub const USER_AGENT: &str = concat!("cellar/", env!("CARGO_PKG_VERSION"));

/// Resolved on-disk layout for one cellar home.
///
/// All engine state hangs off a single root so tests (and parallel installs)
/// can point the whole pipeline at a throwaway directory.
#[derive(Debug, Clone)]
pub struct Paths {
    home: PathBuf,
}

impl Paths {
    /// Resolve the cellar home from `CELLAR_HOME`, falling back to
    /// `~/.cellar`. Returns `None` if the user's home cannot be determined.
    pub fn from_env() -> Option<Self> {
        if let Ok(val) = std::env::var("CELLAR_HOME") {
            return Some(Self::at(PathBuf::from(val)));
        }
        dirs::home_dir().map(|h| Self::at(h.join(".cellar")))
    }

    /// Use an explicit root directory.
    pub fn at(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Root of the versioned install prefixes.
    pub fn kegs(&self) -> PathBuf {
        self.home.join("kegs")
    }

    /// Root for generated, write-once configuration files.
    pub fn etc(&self) -> PathBuf {
        self.home.join("etc")
    }

    /// Spool directory the supervisor adapter writes descriptors into.
    pub fn services(&self) -> PathBuf {
        self.home.join("services")
    }

    /// Scratch space. Guaranteed same volume as `kegs/` so keg promotion is
    /// a single rename.
    pub fn tmp(&self) -> PathBuf {
        self.home.join("tmp")
    }

    /// The keg directory for one package at one version-revision.
    pub fn keg(&self, name: &PackageName, version: &Version, revision: u32) -> PathBuf {
        self.kegs()
            .join(name.as_str())
            .join(format!("{version}-{revision}"))
    }

    /// The `current` pointer for a package, re-linked atomically on install.
    pub fn current_link(&self, name: &PackageName) -> PathBuf {
        self.kegs().join(name.as_str()).join("current")
    }

    /// Config directory for one package: `etc/<name>/`.
    pub fn config_dir(&self, name: &PackageName) -> PathBuf {
        self.etc().join(name.as_str())
    }
}

/// Extract the filename from a URL.
///
/// # Example
///
/// ```
/// use cellar::filename_from_url;
///
/// assert_eq!(filename_from_url("https://example.com/path/to/file.tar.gz"), "file.tar.gz");
/// assert_eq!(filename_from_url(""), "");
/// ```
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}
