//! Write-once configuration files
//!
//! Generated config is advisory: it is installed on first run and never
//! overwritten afterwards, so user edits survive reinstalls.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

/// What happened to the target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    SkippedExisting,
}

/// Write `content` at `path` unless something already lives there.
///
/// Parent directories are created as needed; creation races lose cleanly to
/// whichever writer got there first.
pub fn write_if_absent(path: &Path, content: &str) -> io::Result<WriteOutcome> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(content.as_bytes())?;
            debug!(path = %path.display(), "config created");
            Ok(WriteOutcome::Created)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "config exists, left untouched");
            Ok(WriteOutcome::SkippedExisting)
        }
        Err(e) => Err(e),
    }
}
