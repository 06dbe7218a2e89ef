//! Remove command

use anyhow::{bail, Context as _, Result};

use cellar::ops::service::DirSupervisor;
use cellar::types::PackageName;
use cellar::Paths;

/// Remove a package: its kegs, its `current` pointer, and its service
/// descriptor. Config under `etc/` is left alone; it may carry user edits.
pub fn remove(package: &str, dry_run: bool) -> Result<()> {
    let paths = Paths::from_env().context("could not determine home directory")?;
    let name = PackageName::new(package);

    let keg_root = paths.kegs().join(name.as_str());
    if !keg_root.exists() {
        bail!("package '{name}' is not installed");
    }

    let supervisor = DirSupervisor::new(paths.services());
    let descriptor = supervisor.descriptor_path(name.as_str());

    if dry_run {
        println!("Would remove: {}", keg_root.display());
        if descriptor.exists() {
            println!("Would remove: {}", descriptor.display());
        }
        return Ok(());
    }

    std::fs::remove_dir_all(&keg_root)
        .with_context(|| format!("removing {}", keg_root.display()))?;
    if descriptor.exists() {
        std::fs::remove_file(&descriptor)
            .with_context(|| format!("removing {}", descriptor.display()))?;
    }

    println!("✓ {name} removed");
    println!("  config under {} was kept", paths.config_dir(&name).display());

    Ok(())
}
