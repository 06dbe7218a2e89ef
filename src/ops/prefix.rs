//! Atomic keg installation
//!
//! Directives are copied into a shadow directory laid out exactly like the
//! final keg. Only when every directive has succeeded is the shadow renamed
//! into place, then the `current` pointer re-linked. Observers either see
//! the old state or the complete new keg, never a half-populated prefix.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

use crate::manifest::InstallStep;
use crate::stage::StagedBundle;

/// Copy every directive from the staged bundle into `shadow`, laid out as
/// the final keg (`bin/`, `lib/`, `share/`).
///
/// `fs::copy` carries permission bits, so executables staged with their mode
/// intact stay executable.
pub fn populate_shadow(
    bundle: &StagedBundle,
    steps: &[InstallStep],
    shadow: &Path,
) -> io::Result<()> {
    for step in steps {
        let src = bundle.resolve(&step.source);
        let file_name = src.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("step source '{}' has no filename", step.source),
            )
        })?;

        let dest_dir = shadow.join(step.dest.subdir());
        fs::create_dir_all(&dest_dir)?;
        let dest = dest_dir.join(file_name);

        fs::copy(&src, &dest).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("copying '{}' into {}: {e}", step.source, step.dest.subdir()),
            )
        })?;
        debug!(source = %step.source, dest = %dest.display(), "staged directive");
    }

    Ok(())
}

/// Promote a fully-populated shadow to the visible keg and re-point
/// `current`.
///
/// A pre-existing keg at the same version is parked beside the keg directory
/// (`<keg>.old`) and only removed once the shadow rename and `current` relink
/// have both succeeded; on failure it is renamed back, so the previous keg
/// survives a failed swap intact.
pub fn promote(shadow: &Path, keg: &Path, current: &Path) -> io::Result<()> {
    let keg_parent = keg.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "keg path has no parent")
    })?;
    fs::create_dir_all(keg_parent)?;

    let parked = parked_path(keg)?;
    let had_previous = keg.exists();
    if had_previous {
        if parked.exists() {
            // Leftover from a crashed run; the live keg wins
            fs::remove_dir_all(&parked)?;
        }
        fs::rename(keg, &parked)?;
        debug!(keg = %keg.display(), "existing keg parked");
    }

    if let Err(e) = fs::rename(shadow, keg) {
        if had_previous {
            let _ = fs::rename(&parked, keg);
        }
        return Err(e);
    }

    if let Err(e) = relink_current(keg, current) {
        if had_previous {
            let _ = fs::rename(keg, shadow);
            let _ = fs::rename(&parked, keg);
            let _ = relink_current(keg, current);
        }
        return Err(e);
    }

    if had_previous {
        let _ = fs::remove_dir_all(&parked);
    }

    info!(keg = %keg.display(), "keg promoted");
    Ok(())
}

fn parked_path(keg: &Path) -> io::Result<std::path::PathBuf> {
    let name = keg.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "keg path has no directory name")
    })?;
    let mut parked = name.to_os_string();
    parked.push(".old");
    Ok(keg.with_file_name(parked))
}

/// Atomically re-point the `current` symlink at `keg`.
///
/// The link target is the keg's directory name, so the pointer stays valid
/// if the whole cellar is relocated.
fn relink_current(keg: &Path, current: &Path) -> io::Result<()> {
    let target = keg.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "keg path has no directory name")
    })?;

    let tmp = current.with_extension("tmp");
    let _ = fs::remove_file(&tmp);

    #[cfg(unix)]
    std::os::unix::fs::symlink(target, &tmp)?;
    #[cfg(windows)]
    std::os::windows::fs::symlink_dir(target, &tmp)?;

    fs::rename(&tmp, current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::DestKind;
    use crate::stage::StagingArea;
    use crate::types::{PackageName, Version};
    use crate::Paths;

    fn step(source: &str, dest: DestKind) -> InstallStep {
        InstallStep {
            source: source.to_string(),
            dest,
        }
    }

    fn stage_tool(staging: &StagingArea, resource: &str, file: &str, content: &[u8]) {
        let dir = staging.resource_dir(resource).unwrap();
        std::fs::write(dir.join(file), content).unwrap();
    }

    #[test]
    fn populates_and_promotes_a_keg() {
        let home = tempfile::tempdir().unwrap();
        let paths = Paths::at(home.path());
        let staging = StagingArea::new(&paths).unwrap();

        stage_tool(&staging, "gobetween", "gobetween", b"the binary");
        stage_tool(&staging, "assets", "djocker.png", b"png bytes");

        let steps = vec![
            step("gobetween/gobetween", DestKind::Bin),
            step("assets/djocker.png", DestKind::Share),
        ];

        let shadow = staging.shadow_dir().unwrap();
        populate_shadow(&staging.bundle(), &steps, &shadow).unwrap();

        let name = PackageName::new("docker-virtualbox");
        let keg = paths.keg(&name, &Version::new("0.0.7"), 1);
        let current = paths.current_link(&name);
        promote(&shadow, &keg, &current).unwrap();

        assert!(keg.join("bin/gobetween").exists());
        assert!(keg.join("share/djocker.png").exists());
        assert_eq!(
            std::fs::read_link(&current).unwrap(),
            std::path::PathBuf::from("0.0.7-1")
        );
    }

    #[test]
    fn missing_directive_fails_before_any_promotion() {
        let home = tempfile::tempdir().unwrap();
        let paths = Paths::at(home.path());
        let staging = StagingArea::new(&paths).unwrap();

        stage_tool(&staging, "gobetween", "gobetween", b"the binary");

        let steps = vec![
            step("gobetween/gobetween", DestKind::Bin),
            step("gobetween/does-not-exist", DestKind::Bin),
        ];

        let shadow = staging.shadow_dir().unwrap();
        let err = populate_shadow(&staging.bundle(), &steps, &shadow).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        // Nothing visible: the keg tree was never touched
        assert!(!paths.kegs().exists());
    }

    #[test]
    fn reinstall_swaps_the_keg_atomically() {
        let home = tempfile::tempdir().unwrap();
        let paths = Paths::at(home.path());
        let name = PackageName::new("tool");
        let keg = paths.keg(&name, &Version::new("1.0"), 0);
        let current = paths.current_link(&name);

        for (run, payload) in [b"first install" as &[u8], b"second install"]
            .into_iter()
            .enumerate()
        {
            let staging = StagingArea::new(&paths).unwrap();
            stage_tool(&staging, "r", "tool", payload);
            let shadow = staging.shadow_dir().unwrap();
            populate_shadow(&staging.bundle(), &[step("r/tool", DestKind::Bin)], &shadow).unwrap();
            promote(&shadow, &keg, &current).unwrap();

            let installed = std::fs::read(keg.join("bin/tool")).unwrap();
            assert_eq!(installed, payload, "run {run}");
        }

        // The parked old keg was removed once the swap completed
        let siblings: Vec<_> = std::fs::read_dir(keg.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".old"))
            .collect();
        assert!(siblings.is_empty(), "no parked keg may survive a successful swap");

        let leftovers: Vec<_> = std::fs::read_dir(paths.tmp())
            .unwrap()
            .filter_map(Result::ok)
            .collect();
        assert!(leftovers.is_empty(), "staging must clean up after itself");
    }

    #[test]
    fn failed_swap_restores_previous_keg() {
        let home = tempfile::tempdir().unwrap();
        let paths = Paths::at(home.path());
        let name = PackageName::new("tool");
        let keg = paths.keg(&name, &Version::new("1.0"), 0);
        let current = paths.current_link(&name);

        // First install succeeds
        let staging = StagingArea::new(&paths).unwrap();
        stage_tool(&staging, "r", "tool", b"previous install");
        let shadow = staging.shadow_dir().unwrap();
        populate_shadow(&staging.bundle(), &[step("r/tool", DestKind::Bin)], &shadow).unwrap();
        promote(&shadow, &keg, &current).unwrap();

        // Second swap fails mid-promote: the shadow vanished out from under us
        let missing_shadow = paths.tmp().join("gone");
        let err = promote(&missing_shadow, &keg, &current).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        // The previous keg is back in place, byte for byte, with no debris
        assert_eq!(
            std::fs::read(keg.join("bin/tool")).unwrap(),
            b"previous install"
        );
        assert_eq!(
            std::fs::read_link(&current).unwrap(),
            std::path::PathBuf::from("1.0-0")
        );
        let siblings: Vec<_> = std::fs::read_dir(keg.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".old"))
            .collect();
        assert!(siblings.is_empty(), "failed swap must not leave a parked keg");
    }
}
