//! Archive extraction
//!
//! Handles zip, tar.gz, tar, and raw binary resources. Extraction only ever
//! runs on payloads that already passed the integrity gate, and writes are
//! confined to the caller's staging directory.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

use crate::manifest::ArchiveFormat;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive error: {0}")]
    Archive(String),
}

/// Detect archive format from a URL or filename.
pub fn detect_format(url: &str) -> ArchiveFormat {
    let lower = url.to_lowercase();

    if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
        ArchiveFormat::TarGz
    } else if lower.ends_with(".tar") {
        ArchiveFormat::Tar
    } else if lower.ends_with(".zip") {
        ArchiveFormat::Zip
    } else {
        ArchiveFormat::Binary
    }
}

/// Unpack `archive_path` into `dest_dir` according to `format`.
///
/// Returns the number of files written.
pub fn extract(
    archive_path: &Path,
    format: ArchiveFormat,
    dest_dir: &Path,
) -> Result<usize, ExtractError> {
    fs::create_dir_all(dest_dir)?;
    let count = match format {
        ArchiveFormat::Zip => extract_zip(archive_path, dest_dir)?,
        ArchiveFormat::TarGz => {
            let file = File::open(archive_path)?;
            let decoder = flate2::read::GzDecoder::new(BufReader::new(file));
            extract_tar(decoder, dest_dir)?
        }
        ArchiveFormat::Tar => {
            let file = File::open(archive_path)?;
            extract_tar(BufReader::new(file), dest_dir)?
        }
        ArchiveFormat::Binary => copy_raw(archive_path, dest_dir)?,
    };

    debug!(archive = %archive_path.display(), count, "extracted");
    Ok(count)
}

fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<usize, ExtractError> {
    let mut archive = tar::Archive::new(reader);
    let mut count = 0;

    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.header().entry_type().is_dir() {
            continue;
        }

        let relative_path = entry.path()?.into_owned();

        // Slip guard: entries must stay under the staging directory
        let escapes = relative_path
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir));
        if escapes {
            return Err(ExtractError::Archive(format!(
                "invalid path in archive: {}",
                relative_path.display()
            )));
        }
        let absolute_path = dest_dir.join(&relative_path);

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&absolute_path)?;
        count += 1;
    }

    Ok(count)
}

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;
    let mut count = 0;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        let relative_path = match file.enclosed_name() {
            Some(path) => path.to_owned(),
            None => continue,
        };

        if file.is_dir() {
            fs::create_dir_all(dest_dir.join(&relative_path))?;
            continue;
        }

        let absolute_path = dest_dir.join(&relative_path);
        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode))?;
        }

        count += 1;
    }

    Ok(count)
}

/// Raw binary resources are copied verbatim, keeping their filename, and
/// marked executable.
fn copy_raw(archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractError> {
    let filename = archive_path
        .file_name()
        .ok_or_else(|| ExtractError::Archive("invalid filename".to_string()))?;
    let dest_path = dest_dir.join(filename);
    fs::copy(archive_path, &dest_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&dest_path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(1)
}
