//! Session store
//!
//! Flat directory of `<session_id>.json` files. Enumeration is a
//! point-in-time snapshot and no locking is performed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{Error, Result, SessionDocument};

/// Suffix of every session file
pub const SESSION_FILE_SUFFIX: &str = ".json";

/// Filesystem view over the sessions directory
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fail unless the sessions directory exists
    pub fn ensure_exists(&self) -> Result<()> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(Error::Startup(format!(
                "sessions directory not found: {}",
                self.dir.display()
            )))
        }
    }

    /// Backing file path for a session id
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}{SESSION_FILE_SUFFIX}"))
    }

    /// Ids of all `<id>.json` regular files, sorted
    ///
    /// Entries that cannot be read are logged and skipped.
    pub fn list_session_ids(&self) -> Result<Vec<String>> {
        self.ensure_exists()?;

        let mut ids = Vec::new();
        let walker = WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Error accessing session entry: {}", e);
                    continue;
                }
            };

            if !entry.path().is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                tracing::debug!("Skipping non UTF-8 file name: {}", entry.path().display());
                continue;
            };

            match name.strip_suffix(SESSION_FILE_SUFFIX) {
                Some(id) if !id.is_empty() => ids.push(id.to_string()),
                _ => {}
            }
        }

        Ok(ids)
    }

    /// Byte length of the session file
    pub fn size(&self, id: &str) -> Result<u64> {
        std::fs::metadata(self.path_for(id))
            .map(|m| m.len())
            .map_err(|e| self.map_io(id, e))
    }

    /// A session is empty iff its file has zero bytes
    pub fn is_empty(&self, id: &str) -> Result<bool> {
        Ok(self.size(id)? == 0)
    }

    pub fn load(&self, id: &str) -> Result<SessionDocument> {
        let bytes = std::fs::read(self.path_for(id)).map_err(|e| self.map_io(id, e))?;
        SessionDocument::from_slice(id, &bytes)
    }

    /// Remove the session file; fails with `MissingSession` if it was absent
    pub fn delete(&self, id: &str) -> Result<()> {
        std::fs::remove_file(self.path_for(id)).map_err(|e| self.map_io(id, e))
    }

    fn map_io(&self, id: &str, e: std::io::Error) -> Error {
        if e.kind() == ErrorKind::NotFound {
            Error::MissingSession(id.to_string())
        } else {
            Error::Io(e)
        }
    }
}
