//! Check command - validate a manifest without installing

use std::path::Path;

use anyhow::{Context as _, Result};

use cellar::Manifest;

/// Parse and validate a manifest file, printing a short summary.
pub fn check(manifest_path: &Path) -> Result<()> {
    let manifest = Manifest::from_file(manifest_path)
        .with_context(|| format!("loading manifest {}", manifest_path.display()))?;
    manifest.validate()?;

    println!(
        "✓ {} {} (revision {}){}",
        manifest.package.name,
        manifest.package.version,
        manifest.package.revision,
        if manifest.package.keg_only { " [keg-only]" } else { "" }
    );
    println!(
        "  {} resource(s), {} step(s), {} config file(s), service: {}",
        manifest.resources.len(),
        manifest.steps.len(),
        manifest.configs.len(),
        if manifest.service.is_some() { "yes" } else { "no" }
    );
    if !manifest.package.prerequisites.is_empty() {
        let names: Vec<&str> = manifest
            .package
            .prerequisites
            .iter()
            .map(|p| p.as_str())
            .collect();
        println!("  prerequisites: {}", names.join(", "));
    }

    Ok(())
}
