//! Where split output lands.

use std::io::Write;
use std::path::Path;

use tempfile::Builder;

use crate::error::{Error, Result};

pub trait Storage {
    fn exists(&self, path: &Path) -> bool;

    /// Write `payload` to `path`. Either the whole file appears or nothing does.
    fn write(&self, path: &Path, payload: &[u8]) -> Result<()>;
}

/// Local filesystem. Writes go to a temporary file in the target directory
/// which is renamed over `path` once fully flushed.
///
/// New files get the same mode a plain create would give them (0666 less the
/// umask); a replaced file keeps its mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStorage;

impl Storage for FsStorage {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn write(&self, path: &Path, payload: &[u8]) -> Result<()> {
        let write_error = |source: std::io::Error| Error::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let existing = std::fs::metadata(path).ok().map(|m| m.permissions());

        #[cfg_attr(not(unix), allow(unused_mut))]
        let mut builder = Builder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let mut tmp = builder.tempfile_in(dir).map_err(write_error)?;
        if let Some(permissions) = existing {
            tmp.as_file().set_permissions(permissions).map_err(write_error)?;
        }
        tmp.write_all(payload).map_err(write_error)?;
        tmp.as_file().sync_all().map_err(write_error)?;
        tmp.persist(path).map_err(|e| write_error(e.error))?;

        tracing::debug!(path = %path.display(), bytes = payload.len(), "wrote file");
        Ok(())
    }
}
