//! Service descriptor registration
//!
//! The engine never supervises anything itself. It renders the manifest's
//! service block into a descriptor keyed by package identity and hands it to
//! a [`Supervisor`]. Registration is an idempotent upsert: re-registering
//! replaces the entry, it never duplicates it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::manifest::ServiceSpec;
use crate::types::PackageName;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("descriptor encode error: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// What the host supervisor consumes: a fully resolved command plus policy.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceDescriptor {
    /// Stable identity derived from the package name.
    pub identity: String,
    pub command: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    pub keep_alive: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl ServiceDescriptor {
    /// Resolve a manifest service block against a package's `current` keg
    /// pointer, so the registered command survives upgrades.
    pub fn from_spec(name: &PackageName, current_keg: &Path, spec: &ServiceSpec) -> Self {
        Self {
            identity: name.to_string(),
            command: current_keg.join(&spec.command),
            working_dir: spec.working_dir.as_ref().map(PathBuf::from),
            keep_alive: spec.keep_alive,
            env: spec.env.clone(),
        }
    }
}

/// Host service-supervision facility.
///
/// Owns the service lifecycle after registration; the engine keeps only the
/// identity for re-registration.
pub trait Supervisor: Send + Sync {
    /// Idempotent upsert keyed on `descriptor.identity`.
    fn register(&self, descriptor: &ServiceDescriptor) -> Result<(), ServiceError>;
}

/// Supervisor adapter that spools descriptor files into a directory, one
/// TOML file per identity, replaced atomically on re-registration.
#[derive(Debug, Clone)]
pub struct DirSupervisor {
    root: PathBuf,
}

impl DirSupervisor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the descriptor for one identity.
    pub fn descriptor_path(&self, identity: &str) -> PathBuf {
        self.root.join(format!("{identity}.service.toml"))
    }
}

impl Supervisor for DirSupervisor {
    fn register(&self, descriptor: &ServiceDescriptor) -> Result<(), ServiceError> {
        std::fs::create_dir_all(&self.root)?;
        let content = toml::to_string_pretty(descriptor)?;

        // Write-then-rename so a crashed run never leaves a torn descriptor
        let dest = self.descriptor_path(&descriptor.identity);
        let tmp = dest.with_extension("toml.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &dest)?;

        debug!(identity = %descriptor.identity, keep_alive = descriptor.keep_alive, "service registered");
        Ok(())
    }
}
