//! Install command

use std::path::Path;

use anyhow::{Context as _, Result};
use tokio_util::sync::CancellationToken;

use cellar::ops::install::install;
use cellar::ops::lock::InstallLock;
use cellar::ops::Context;
use cellar::{Manifest, Paths};

/// Install a package from a manifest file.
pub async fn install_manifest(manifest_path: &Path, dry_run: bool) -> Result<()> {
    let manifest = Manifest::from_file(manifest_path)
        .with_context(|| format!("loading manifest {}", manifest_path.display()))?;
    manifest.validate()?;

    let paths = Paths::from_env().context("could not determine home directory")?;
    let name = &manifest.package.name;

    if dry_run {
        println!(
            "Would install {} {} (revision {})",
            name, manifest.package.version, manifest.package.revision
        );
        for resource in &manifest.resources {
            println!("  Would fetch: {}", resource.url);
        }
        for step in &manifest.steps {
            println!("  Would place: {} -> {}/", step.source, step.dest.subdir());
        }
        for config in &manifest.configs {
            println!("  Would write (if absent): etc/{name}/{}", config.file);
        }
        if manifest.service.is_some() {
            println!("  Would register service: {name}");
        }
        return Ok(());
    }

    let _lock = InstallLock::acquire(&paths, name)
        .with_context(|| format!("another install of '{name}' is already running"))?;

    let ctx = Context::new(paths)?;

    // Ctrl-C cancels between steps and mid-download
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_on_signal.cancel();
        }
    });

    let report = install(&ctx, &manifest, &cancel).await?;

    println!(
        "✓ {} {} installed to {}",
        name,
        manifest.package.version,
        report.keg_path.display()
    );
    for warning in &report.warnings {
        eprintln!("  Warning: {warning}");
    }
    if let Some(caveats) = &report.caveats {
        println!("\n{caveats}");
    }

    Ok(())
}
