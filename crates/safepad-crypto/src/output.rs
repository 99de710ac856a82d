//! Output files that disappear unless fully written
//!
//! A [`PartialOutput`] owns a freshly created file. If it is dropped before
//! [`PartialOutput::commit`] (an error, a cancellation, a panic unwinding), the
//! file is deleted so no truncated container is left behind.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{VaultError, VaultResult};

pub struct PartialOutput {
    path: PathBuf,
    file: Option<File>,
}

impl PartialOutput {
    /// Create (or truncate) `path` for writing.
    ///
    /// Overwrite confirmation is the caller's responsibility.
    pub fn create(path: &Path) -> VaultResult<Self> {
        let file = File::create(path)
            .map_err(|e| VaultError::io(format!("creating {}", path.display()), e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> VaultResult<()> {
        let path = &self.path;
        match self.file.as_mut() {
            Some(file) => file
                .write_all(bytes)
                .map_err(|e| VaultError::io(format!("writing {}", path.display()), e)),
            None => Err(VaultError::io(
                format!("writing {}", path.display()),
                io::Error::other("output already committed"),
            )),
        }
    }

    /// Stream everything `reader` yields into the file.
    ///
    /// A read error (for example a failed archive checksum) is reported like a
    /// write error; the file is still removed on drop.
    pub fn copy_from(&mut self, reader: &mut impl Read) -> VaultResult<u64> {
        let path = &self.path;
        match self.file.as_mut() {
            Some(file) => io::copy(reader, file)
                .map_err(|e| VaultError::io(format!("writing {}", path.display()), e)),
            None => Err(VaultError::io(
                format!("writing {}", path.display()),
                io::Error::other("output already committed"),
            )),
        }
    }

    /// Flush to disk and keep the file.
    pub fn commit(mut self) -> VaultResult<PathBuf> {
        if let Some(file) = self.file.take() {
            file.sync_all()
                .map_err(|e| VaultError::io(format!("syncing {}", self.path.display()), e))?;
        }
        Ok(std::mem::take(&mut self.path))
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if self.file.take().is_none() {
            return;
        }
        debug!(path = %self.path.display(), "removing partial output");
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove partial output");
        }
    }
}

/// Write `bytes` to `path` via a uniquely named temp file in the same
/// directory, then rename over `path`.
///
/// Either the old content or the complete new content is visible at `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> VaultResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| VaultError::io(format!("creating temp file in {}", dir.display()), e))?;
    tmp.write_all(bytes)
        .map_err(|e| VaultError::io(format!("writing temp file for {}", path.display()), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| VaultError::io(format!("syncing temp file for {}", path.display()), e))?;

    tmp.persist(path)
        .map_err(|e| VaultError::io(format!("renaming into {}", path.display()), e.error))?;
    Ok(())
}
