//! Discussion guide store
//!
//! Guides are JSON documents living next to the `sessions` directory. The
//! only field this crate interprets is `sessions`, a list of session ids.
//! Every other field is carried through untouched (key order included).

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use walkdir::WalkDir;

use crate::session::json_kind;
use crate::{Error, Result};

const GUIDE_FILE_SUFFIX: &str = ".json";
const SESSIONS_KEY: &str = "sessions";

/// Reference to one guide file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GuideHandle {
    /// File stem of the guide
    pub id: String,
    pub path: PathBuf,
}

impl fmt::Display for GuideHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.id, GUIDE_FILE_SUFFIX)
    }
}

/// Interpretation of a guide's `sessions` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuideSessions {
    /// No `sessions` key (or the guide is not an object)
    Absent,
    /// `sessions` holds something other than an array
    NotAList,
    /// Array containing entries that are not strings
    NonStringEntries,
    Ids(Vec<String>),
}

/// Decoded guide document
#[derive(Debug, Clone, PartialEq)]
pub struct GuideDocument {
    value: Value,
}

impl GuideDocument {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn sessions(&self) -> GuideSessions {
        let Some(field) = self.value.as_object().and_then(|o| o.get(SESSIONS_KEY)) else {
            return GuideSessions::Absent;
        };
        let Some(items) = field.as_array() else {
            return GuideSessions::NotAList;
        };

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            match item.as_str() {
                Some(id) => ids.push(id.to_string()),
                None => return GuideSessions::NonStringEntries,
            }
        }
        GuideSessions::Ids(ids)
    }

    /// Replace the `sessions` list; no-op on a non-object guide
    pub fn set_sessions(&mut self, ids: Vec<String>) {
        if let Some(obj) = self.value.as_object_mut() {
            obj.insert(
                SESSIONS_KEY.to_string(),
                Value::Array(ids.into_iter().map(Value::String).collect()),
            );
        }
    }
}

/// Filesystem view over the guides directory
#[derive(Debug, Clone)]
pub struct GuideStore {
    dir: PathBuf,
}

impl GuideStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fail unless the guides directory exists
    pub fn ensure_exists(&self) -> Result<()> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(Error::Startup(format!(
                "guides directory not found: {}",
                self.dir.display()
            )))
        }
    }

    /// Handles for every `*.json` regular file directly in the guides directory
    pub fn list_guides(&self) -> Result<Vec<GuideHandle>> {
        self.ensure_exists()?;

        let mut guides = Vec::new();
        let walker = WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Error accessing guide entry: {}", e);
                    continue;
                }
            };
            if !entry.path().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if let Some(id) = name.strip_suffix(GUIDE_FILE_SUFFIX) {
                if !id.is_empty() {
                    guides.push(GuideHandle {
                        id: id.to_string(),
                        path: entry.path().to_path_buf(),
                    });
                }
            }
        }

        Ok(guides)
    }

    pub fn load(&self, handle: &GuideHandle) -> Result<GuideDocument> {
        let bytes = std::fs::read(&handle.path)?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| Error::MalformedGuide {
            path: handle.path.clone(),
            reason: e.to_string(),
        })?;
        if !value.is_object() {
            tracing::debug!(
                "Guide {} is {}, not an object",
                handle,
                json_kind(&value)
            );
        }
        Ok(GuideDocument::new(value))
    }

    /// Replace the guide file with a pretty-printed document
    ///
    /// Written to `<name>.json.tmp` first and renamed over the target, so
    /// readers see either the old or the new file.
    pub fn save(&self, handle: &GuideHandle, doc: &GuideDocument) -> Result<()> {
        let content = serde_json::to_string_pretty(doc.value()).map_err(|e| Error::MalformedGuide {
            path: handle.path.clone(),
            reason: e.to_string(),
        })?;

        let temp_path = temp_path_for(&handle.path);
        let result = write_and_sync(&temp_path, content.as_bytes())
            .and_then(|()| std::fs::rename(&temp_path, &handle.path));

        if let Err(e) = result {
            if let Err(cleanup) = std::fs::remove_file(&temp_path) {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(
                        "Failed to remove temporary guide {}: {}",
                        temp_path.display(),
                        cleanup
                    );
                }
            }
            return Err(Error::Io(e));
        }

        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
