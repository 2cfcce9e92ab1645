// src/fs/mod.rs

//! Temporary files owned by a session.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};

use crate::errors::{KernelError, Result};

/// Tracks every temporary file a session creates, and removes them.
///
/// Files stay on disk for the whole session (so a compiled binary can be
/// inspected between requests) and are removed exactly once: by
/// [`cleanup`](Self::cleanup), or when the tracker is dropped.
#[derive(Debug)]
pub struct TempFileTracker {
    dir: PathBuf,
    files: Vec<TempPath>,
}

impl TempFileTracker {
    /// Create a tracker placing files in `dir`, or the system temp
    /// directory when `None`.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir: dir.unwrap_or_else(std::env::temp_dir),
            files: Vec::new(),
        }
    }

    /// Directory new files are created in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create a new uniquely named file ending in `suffix`, holding
    /// `contents`, and start tracking it.
    ///
    /// The file is closed before its path is returned.
    pub fn create(&mut self, suffix: &str, contents: &[u8]) -> Result<PathBuf> {
        let mut file = tempfile::Builder::new()
            .prefix("ckernel-")
            .suffix(suffix)
            .tempfile_in(&self.dir)
            .map_err(|e| {
                KernelError::Resource(format!(
                    "creating temp file in {}: {e}",
                    self.dir.display()
                ))
            })?;

        let written = file.write_all(contents).and_then(|_| file.flush());
        if let Err(e) = written {
            return Err(KernelError::Resource(format!(
                "writing temp file {}: {e}",
                file.path().display()
            )));
        }

        let path = file.into_temp_path();
        let owned = path.to_path_buf();
        debug!(path = %owned.display(), "tracking temp file");
        self.files.push(path);
        Ok(owned)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths of all currently tracked files, in creation order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|p| p.to_path_buf()).collect()
    }

    /// Remove every tracked file.
    ///
    /// All removals are attempted; the tracked set is empty afterwards.
    /// A file that is already gone is not an error. The first other
    /// failure is returned.
    pub fn cleanup(&mut self) -> Result<()> {
        let mut first_error = None;

        for path in self.files.drain(..) {
            let removed = path.to_path_buf();
            match path.close() {
                Ok(()) => debug!(path = %removed.display(), "removed temp file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %removed.display(), "temp file already gone");
                }
                Err(e) => {
                    warn!(path = %removed.display(), error = %e, "failed to remove temp file");
                    first_error.get_or_insert_with(|| {
                        KernelError::Resource(format!("removing {}: {e}", removed.display()))
                    });
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Make `path` executable with the given permission bits.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub fn set_mode(path: &Path, _mode: u32) -> std::io::Result<()> {
    fs::metadata(path).map(|_| ())
}
