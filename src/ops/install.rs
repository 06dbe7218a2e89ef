//! Install orchestration
//!
//! One strictly linear, non-resumable run per manifest:
//! preflight -> fetch + verify -> stage -> prefix install -> config write ->
//! service registration. A failure at any step drops the staging area (and
//! any shadow prefix with it) and surfaces exactly one error; nothing is
//! visible until the final atomic rename, so there is never partial state to
//! roll back.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::host::{InstalledKegs, PackageLookup};
use crate::io::{download, extract};
use crate::manifest::Manifest;
use crate::ops::config::{self, WriteOutcome};
use crate::ops::error::InstallError;
use crate::ops::prefix;
use crate::ops::service::{DirSupervisor, ServiceDescriptor, Supervisor};
use crate::stage::StagingArea;
use crate::{filename_from_url, Paths};

/// Outcome of a successful install run.
///
/// Warnings carry the non-fatal findings (config left untouched, service
/// registration failure); caveats are the manifest's static post-install
/// text. This is the engine's entire user-facing surface besides errors.
#[derive(Debug)]
pub struct InstallReport {
    pub keg_path: PathBuf,
    pub caveats: Option<String>,
    pub warnings: Vec<String>,
}

/// Shared collaborators for install runs.
#[derive(Clone)]
pub struct Context {
    pub paths: Paths,
    pub client: Client,
    pub lookup: Arc<dyn PackageLookup>,
    pub supervisor: Arc<dyn Supervisor>,
}

impl Context {
    /// Default wiring: presence answered by the keg tree, services spooled
    /// into the cellar's own descriptor directory.
    pub fn new(paths: Paths) -> Result<Self, InstallError> {
        // Bounded waits: a hung mirror fails the run instead of stalling it.
        // The read timeout is per-read, so large downloads that keep moving
        // are unaffected.
        let client = Client::builder()
            .tcp_nodelay(true)
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(Duration::from_secs(30))
            .build()
            .map_err(InstallError::Network)?;
        Ok(Self {
            client,
            lookup: Arc::new(InstalledKegs::new(&paths)),
            supervisor: Arc::new(DirSupervisor::new(paths.services())),
            paths,
        })
    }
}

/// Run one install to completion.
///
/// Cancellation is honored between steps and inside the download loop; a
/// cancelled run ends in [`InstallError::Cancelled`] with all transient
/// state discarded.
pub async fn install(
    ctx: &Context,
    manifest: &Manifest,
    cancel: &CancellationToken,
) -> Result<InstallReport, InstallError> {
    manifest.validate()?;

    // Preflight must fail before any network I/O happens
    preflight(ctx, manifest)?;
    ensure_live(cancel)?;

    let staging = StagingArea::new(&ctx.paths)?;
    fetch_resources(ctx, manifest, &staging, cancel).await?;
    ensure_live(cancel)?;

    let shadow = staging.shadow_dir()?;
    prefix::populate_shadow(&staging.bundle(), &manifest.steps, &shadow)?;
    ensure_live(cancel)?;

    let name = &manifest.package.name;
    let keg = ctx
        .paths
        .keg(name, &manifest.package.version, manifest.package.revision);
    let current = ctx.paths.current_link(name);
    prefix::promote(&shadow, &keg, &current)?;

    // From here on everything is best-effort: the files are installed and
    // committed, so later problems become warnings, not failures.
    let mut warnings = Vec::new();

    for cfg in &manifest.configs {
        let dest = ctx.paths.config_dir(name).join(&cfg.file);
        match config::write_if_absent(&dest, &cfg.content) {
            Ok(WriteOutcome::Created) => {}
            Ok(WriteOutcome::SkippedExisting) => warnings.push(format!(
                "config {} already exists, left untouched",
                dest.display()
            )),
            Err(e) => warnings.push(format!("could not write config {}: {e}", dest.display())),
        }
    }

    if let Some(spec) = &manifest.service {
        let descriptor = ServiceDescriptor::from_spec(name, &current, spec);
        if let Err(e) = ctx.supervisor.register(&descriptor) {
            warnings.push(format!("service registration failed: {e}"));
        }
    }

    info!(package = %name, version = %manifest.package.version, "install complete");
    Ok(InstallReport {
        keg_path: keg,
        caveats: manifest.package.caveats.clone(),
        warnings,
    })
}

/// Verify every declared prerequisite is present. Presence only: version
/// compatibility is the surrounding package manager's policy.
fn preflight(ctx: &Context, manifest: &Manifest) -> Result<(), InstallError> {
    for dep in &manifest.package.prerequisites {
        if !ctx.lookup.exists(dep) {
            return Err(InstallError::UnmetDependency(dep.clone()));
        }
    }
    debug!(count = manifest.package.prerequisites.len(), "preflight ok");
    Ok(())
}

/// Download, verify, and unpack every resource into the staging area.
/// Rejected payloads never reach the unpack step.
async fn fetch_resources(
    ctx: &Context,
    manifest: &Manifest,
    staging: &StagingArea,
    cancel: &CancellationToken,
) -> Result<(), InstallError> {
    for resource in &manifest.resources {
        let filename = filename_from_url(&resource.url);
        let archive = staging.download_path(&resource.name, filename)?;

        download::download_and_verify(
            &ctx.client,
            &resource.url,
            &archive,
            resource.sha256.as_str(),
            cancel,
        )
        .await
        .map_err(|e| InstallError::from_fetch(&resource.name, e))?;

        let dest = staging.resource_dir(&resource.name)?;
        extract::extract(&archive, resource.archive_format(), &dest)?;
    }
    Ok(())
}

fn ensure_live(cancel: &CancellationToken) -> Result<(), InstallError> {
    if cancel.is_cancelled() {
        Err(InstallError::Cancelled)
    } else {
        Ok(())
    }
}
