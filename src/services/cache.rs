//! Persistent package → tag cache.
//!
//! The cache is a pretty-printed JSON object on disk. Every insert rewrites the
//! whole file through a temporary sibling that is renamed into place, so an
//! interrupted run loses at most the classification in flight.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Package identifier → tag string, loaded once and written through on every insert.
#[derive(Debug, Clone)]
pub struct TagCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl TagCache {
    /// An empty cache that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the cache stored at `path`.
    ///
    /// Never fails: a missing or blank file gives an empty cache, and an
    /// unreadable or malformed one is discarded with a warning.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No tag cache at {}, starting empty", path.display());
                return Self::empty(path);
            }
            Err(e) => {
                warn!(
                    "Could not read tag cache {}: {}. Starting with an empty cache.",
                    path.display(),
                    e
                );
                return Self::empty(path);
            }
        };

        if content.trim().is_empty() {
            return Self::empty(path);
        }

        match serde_json::from_str::<BTreeMap<String, String>>(&content) {
            Ok(entries) => {
                debug!("Loaded {} cached tag entries from {}", entries.len(), path.display());
                Self { path, entries }
            }
            Err(e) => {
                warn!(
                    "Tag cache {} is malformed: {}. Starting with an empty cache.",
                    path.display(),
                    e
                );
                Self::empty(path)
            }
        }
    }

    /// Look up the cached tag string for a package.
    pub fn get(&self, package: &str) -> Option<&str> {
        self.entries.get(package).map(String::as_str)
    }

    /// Insert a tag and immediately write the whole cache back to disk.
    ///
    /// The in-memory entry is kept even when the write fails.
    pub fn put_and_persist(&mut self, package: &str, tag: &str) -> Result<()> {
        self.entries.insert(package.to_string(), tag.to_string());
        self.persist()
    }

    /// Write the current entries to disk atomically.
    pub fn persist(&self) -> Result<()> {
        self.write_atomically().map_err(|source| Error::Persistence {
            path: self.path.clone(),
            source,
        })
    }

    fn write_atomically(&self) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, &self.entries)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn contains(&self, package: &str) -> bool {
        self.entries.contains_key(package)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
