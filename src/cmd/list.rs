//! List command

use anyhow::{Context as _, Result};

use cellar::Paths;

/// List all installed packages with their current version.
pub fn list() -> Result<()> {
    let paths = Paths::from_env().context("could not determine home directory")?;
    let kegs = paths.kegs();

    if !kegs.exists() {
        println!("No packages installed.");
        return Ok(());
    }

    let mut entries: Vec<(String, String)> = Vec::new();
    for entry in std::fs::read_dir(&kegs)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let current = entry.path().join("current");
        let version = std::fs::read_link(&current)
            .map(|t| t.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "(no current)".to_string());
        entries.push((name, version));
    }

    if entries.is_empty() {
        println!("No packages installed.");
        return Ok(());
    }

    entries.sort();
    println!("Installed packages:");
    for (name, version) in entries {
        println!("  {name} {version}");
    }

    Ok(())
}
