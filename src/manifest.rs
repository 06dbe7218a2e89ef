//! TOML package manifest parsing
//!
//! A manifest is the complete, immutable description of one install run:
//! identity, prerequisite packages, remote resources, install directives,
//! generated config files, and an optional service block.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::types::{PackageName, Version};

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid manifest: {0}")]
    Invalid(String),
}

/// A validated SHA-256 digest (64 hex characters)
///
/// Validated at deserialization time so malformed digests never propagate
/// into the download path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Create a validated digest. Accepts an optional `sha256:` prefix.
    pub fn new(s: impl Into<String>) -> Result<Self, ManifestError> {
        let s = s.into();
        let hex = s.strip_prefix("sha256:").unwrap_or(&s);

        if hex.len() != 64 {
            return Err(ManifestError::Invalid(format!(
                "sha256 digest must be 64 hex characters, got {} in '{s}'",
                hex.len()
            )));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ManifestError::Invalid(format!(
                "sha256 digest contains non-hex characters in '{s}'"
            )));
        }

        Ok(Self(hex.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Sha256Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Hash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Archive format of a remote resource
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    #[serde(rename = "tar.gz")]
    TarGz,
    Tar,
    Zip,
    /// A raw, unarchived file
    Binary,
}

/// A single remote downloadable artifact with an integrity hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub url: String,
    pub sha256: Sha256Hash,
    /// Archive format; detected from the URL when omitted.
    #[serde(default)]
    pub format: Option<ArchiveFormat>,
}

impl Resource {
    /// The effective archive format, falling back to URL-based detection.
    pub fn archive_format(&self) -> ArchiveFormat {
        self.format
            .unwrap_or_else(|| crate::io::extract::detect_format(&self.url))
    }
}

/// Destination kind of an install directive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DestKind {
    Bin,
    Lib,
    Share,
}

impl DestKind {
    /// Canonical subdirectory under the keg prefix.
    pub fn subdir(self) -> &'static str {
        match self {
            Self::Bin => "bin",
            Self::Lib => "lib",
            Self::Share => "share",
        }
    }
}

/// One install directive: a staged source file and where it lands in the keg.
///
/// `source` is relative to the staging root and must begin with the name of
/// a declared resource, e.g. `gobetween/gobetween`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallStep {
    pub source: String,
    pub dest: DestKind,
}

/// A generated configuration file, installed once under `etc/<name>/` and
/// never overwritten on reinstall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Path relative to the package's config directory.
    pub file: String,
    pub content: String,
}

/// Declarative service block handed to the host supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Command path relative to the keg (resolved against `current`).
    pub command: String,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub keep_alive: bool,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Package identity and policy flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMeta {
    pub name: PackageName,
    pub version: Version,
    #[serde(default)]
    pub revision: u32,
    /// Keg-only packages are never linked into any shared bin directory;
    /// consumers reference the versioned prefix directly.
    #[serde(default)]
    pub keg_only: bool,
    #[serde(default)]
    pub caveats: Option<String>,
    /// Prerequisite package names. Presence is verified before any network
    /// I/O; install order is the caller's problem.
    #[serde(default)]
    pub prerequisites: Vec<PackageName>,
}

/// Complete package manifest. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub package: PackageMeta,
    #[serde(default, rename = "resource")]
    pub resources: Vec<Resource>,
    #[serde(default, rename = "step")]
    pub steps: Vec<InstallStep>,
    #[serde(default, rename = "config")]
    pub configs: Vec<ConfigFile>,
    #[serde(default)]
    pub service: Option<ServiceSpec>,
}

impl Manifest {
    /// Load and parse a manifest from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a manifest from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(content)?;
        Ok(manifest)
    }

    /// Structural validation beyond what serde enforces.
    ///
    /// Every step must reference a declared resource, all relative paths must
    /// stay relative, and resource URLs must be absolute http(s).
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.package.name.as_str().is_empty() {
            return Err(ManifestError::Invalid("package name is empty".into()));
        }
        if self.package.version.as_str().is_empty() {
            return Err(ManifestError::Invalid("package version is empty".into()));
        }
        check_bare_name(self.package.name.as_str(), "package name")?;
        for dep in &self.package.prerequisites {
            check_bare_name(dep.as_str(), "prerequisite")?;
        }

        let mut seen = std::collections::HashSet::new();
        for resource in &self.resources {
            if resource.name.is_empty() {
                return Err(ManifestError::Invalid("resource with empty name".into()));
            }
            check_bare_name(&resource.name, "resource name")?;
            if !seen.insert(resource.name.as_str()) {
                return Err(ManifestError::Invalid(format!(
                    "duplicate resource '{}'",
                    resource.name
                )));
            }
            if !resource.url.starts_with("https://") && !resource.url.starts_with("http://") {
                return Err(ManifestError::Invalid(format!(
                    "resource '{}' has a non-http(s) url: {}",
                    resource.name, resource.url
                )));
            }
        }

        for step in &self.steps {
            let rel = Path::new(&step.source);
            check_relative(&step.source, rel)?;
            let root = rel.components().next().and_then(|c| match c {
                Component::Normal(os) => os.to_str(),
                _ => None,
            });
            match root {
                Some(name) if seen.contains(name) => {}
                _ => {
                    return Err(ManifestError::Invalid(format!(
                        "step source '{}' does not begin with a declared resource name",
                        step.source
                    )));
                }
            }
        }

        for config in &self.configs {
            if config.file.is_empty() {
                return Err(ManifestError::Invalid("config with empty file path".into()));
            }
            check_relative(&config.file, Path::new(&config.file))?;
        }

        if let Some(service) = &self.service {
            if service.command.is_empty() {
                return Err(ManifestError::Invalid("service command is empty".into()));
            }
            check_relative(&service.command, Path::new(&service.command))?;
        }

        Ok(())
    }
}

/// Names are joined into keg, staging, and descriptor paths, so they must be
/// a single normal path component: no separators, no `.`/`..`.
fn check_bare_name(raw: &str, what: &str) -> Result<(), ManifestError> {
    let mut components = Path::new(raw).components();
    let single = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none();
    if single && !raw.contains(['/', '\\']) {
        Ok(())
    } else {
        Err(ManifestError::Invalid(format!(
            "{what} '{raw}' must be a bare name without path separators"
        )))
    }
}

fn check_relative(raw: &str, path: &Path) -> Result<(), ManifestError> {
    let ok = path.components().all(|c| matches!(c, Component::Normal(_)));
    if ok && !path.as_os_str().is_empty() {
        Ok(())
    } else {
        Err(ManifestError::Invalid(format!(
            "path '{raw}' must be relative and must not contain '..'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOBETWEEN: &str = r#"
[package]
name = "docker-virtualbox"
version = "0.0.7"
revision = 1
keg_only = true
prerequisites = ["curl", "jq"]
caveats = """
Docker Virtualbox was installed

Please don't forget to configure your PATH variable
"""

[[resource]]
name = "gobetween"
url = "https://example.com/releases/gobetween_0.8.0_darwin_amd64.zip"
sha256 = "15efec9cef9dc01c4e195042df62def95f189090e470678d5b6f024afa71e1b0"

[[step]]
source = "gobetween/gobetween"
dest = "bin"

[[config]]
file = "gobetween.toml"
content = """
[api]
enabled = true
bind = "127.0.0.1:8181"
"""

[service]
command = "bin/docker-machine-init"
working_dir = "/tmp"
keep_alive = true
"#;

    #[test]
    fn parses_full_manifest() {
        let m = Manifest::parse(GOBETWEEN).unwrap();
        m.validate().unwrap();

        assert_eq!(m.package.name.as_str(), "docker-virtualbox");
        assert_eq!(m.package.version, "0.0.7");
        assert_eq!(m.package.revision, 1);
        assert!(m.package.keg_only);
        assert_eq!(m.package.prerequisites.len(), 2);
        assert_eq!(m.resources.len(), 1);
        assert_eq!(m.resources[0].archive_format(), ArchiveFormat::Zip);
        assert_eq!(m.steps[0].dest, DestKind::Bin);
        assert!(m.configs[0].content.contains("127.0.0.1:8181"));

        let service = m.service.unwrap();
        assert!(service.keep_alive);
        assert_eq!(service.working_dir.as_deref(), Some("/tmp"));
    }

    #[test]
    fn revision_defaults_to_zero() {
        let m = Manifest::parse(
            r#"
[package]
name = "tool"
version = "1.0"
"#,
        )
        .unwrap();
        assert_eq!(m.package.revision, 0);
        assert!(!m.package.keg_only);
        m.validate().unwrap();
    }

    #[test]
    fn rejects_malformed_digest() {
        let err = Manifest::parse(
            r#"
[package]
name = "tool"
version = "1.0"

[[resource]]
name = "r"
url = "https://example.com/r.zip"
sha256 = "deadbeef"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn rejects_step_without_declared_resource() {
        let m = Manifest::parse(
            r#"
[package]
name = "tool"
version = "1.0"

[[step]]
source = "mystery/file"
dest = "bin"
"#,
        )
        .unwrap();
        assert!(matches!(m.validate(), Err(ManifestError::Invalid(_))));
    }

    #[test]
    fn rejects_escaping_paths() {
        let m = Manifest::parse(
            r#"
[package]
name = "tool"
version = "1.0"

[[resource]]
name = "r"
url = "https://example.com/r.zip"
sha256 = "15efec9cef9dc01c4e195042df62def95f189090e470678d5b6f024afa71e1b0"

[[step]]
source = "r/../../etc/passwd"
dest = "bin"
"#,
        )
        .unwrap();
        assert!(matches!(m.validate(), Err(ManifestError::Invalid(_))));
    }

    #[test]
    fn rejects_package_name_with_path_components() {
        let m = Manifest::parse(
            r#"
[package]
name = "../../outside"
version = "1.0"
"#,
        )
        .unwrap();
        assert!(matches!(m.validate(), Err(ManifestError::Invalid(_))));
    }

    #[test]
    fn rejects_resource_name_that_escapes_staging() {
        let m = Manifest::parse(
            r#"
[package]
name = "tool"
version = "1.0"

[[resource]]
name = "../../../escaped-resource"
url = "https://example.com/r.zip"
sha256 = "15efec9cef9dc01c4e195042df62def95f189090e470678d5b6f024afa71e1b0"
"#,
        )
        .unwrap();
        assert!(matches!(m.validate(), Err(ManifestError::Invalid(_))));
    }

    #[test]
    fn rejects_prerequisite_with_separator() {
        let m = Manifest::parse(
            r#"
[package]
name = "tool"
version = "1.0"
prerequisites = ["deps/curl"]
"#,
        )
        .unwrap();
        assert!(matches!(m.validate(), Err(ManifestError::Invalid(_))));
    }

    #[test]
    fn rejects_non_http_url() {
        let m = Manifest::parse(
            r#"
[package]
name = "tool"
version = "1.0"

[[resource]]
name = "r"
url = "ftp://example.com/r.zip"
sha256 = "15efec9cef9dc01c4e195042df62def95f189090e470678d5b6f024afa71e1b0"
"#,
        )
        .unwrap();
        assert!(matches!(m.validate(), Err(ManifestError::Invalid(_))));
    }

    #[test]
    fn digest_accepts_prefix_and_normalizes_case() {
        let h = Sha256Hash::new(
            "sha256:15EFEC9CEF9DC01C4E195042DF62DEF95F189090E470678D5B6F024AFA71E1B0",
        )
        .unwrap();
        assert_eq!(
            h.as_str(),
            "15efec9cef9dc01c4e195042df62def95f189090e470678d5b6f024afa71e1b0"
        );
    }
}
