//! Domain errors for install operations

use thiserror::Error;

use crate::io::download::FetchError;
use crate::io::extract::ExtractError;
use crate::manifest::ManifestError;
use crate::types::PackageName;

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("unmet prerequisite: '{0}' is not installed")]
    UnmetDependency(PackageName),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("integrity check failed for resource '{resource}': expected {expected}, got {actual}")]
    Integrity {
        resource: String,
        expected: String,
        actual: String,
    },

    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("service registration failed: {0}")]
    ServiceRegistration(String),

    #[error("install cancelled")]
    Cancelled,
}

impl InstallError {
    /// Lift a fetch failure into the run-level taxonomy, attributing it to
    /// the resource being fetched.
    pub fn from_fetch(resource: &str, err: FetchError) -> Self {
        match err {
            FetchError::Http(e) => Self::Network(e),
            FetchError::Io(e) => Self::Filesystem(e),
            FetchError::HashMismatch { expected, actual } => Self::Integrity {
                resource: resource.to_string(),
                expected,
                actual,
            },
            FetchError::Cancelled => Self::Cancelled,
        }
    }
}

impl From<ExtractError> for InstallError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Io(e) => Self::Filesystem(e),
            ExtractError::Archive(msg) => Self::Filesystem(std::io::Error::other(msg)),
        }
    }
}
