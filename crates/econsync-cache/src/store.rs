//! Reading and writing the snapshot file

use crate::{CacheSnapshot, Error, Result, CACHE_VERSION};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk encoding of the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheFormat {
    /// RON format (Rust Object Notation)
    #[default]
    Ron,
    /// JSON format (requires serde_json feature)
    Json,
}

impl CacheFormat {
    fn file_name(self) -> &'static str {
        match self {
            CacheFormat::Ron => "cache.ron",
            CacheFormat::Json => "cache.json",
        }
    }
}

/// Location and format of one named snapshot
///
/// An empty directory name disables caching: loads return an empty
/// snapshot and saves do nothing.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    directory_name: String,
    format: CacheFormat,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>, directory_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            directory_name: directory_name.into(),
            format: CacheFormat::default(),
        }
    }

    pub fn with_format(mut self, format: CacheFormat) -> Self {
        self.format = format;
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.directory_name.is_empty()
    }

    /// Path of the snapshot file, if caching is enabled
    pub fn path(&self) -> Option<PathBuf> {
        self.is_enabled().then(|| {
            self.root
                .join(&self.directory_name)
                .join(self.format.file_name())
        })
    }

    /// Read the snapshot; a missing file yields an empty one
    pub fn load(&self) -> Result<CacheSnapshot> {
        let Some(path) = self.path() else {
            return Ok(CacheSnapshot::new());
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no cache file, starting empty");
            return Ok(CacheSnapshot::new());
        }

        let text = fs::read_to_string(&path).map_err(|source| Error::Io {
            operation: "read",
            path: path.clone(),
            source,
        })?;
        let snapshot = self.decode(&text)?;
        if snapshot.version() != CACHE_VERSION {
            return Err(Error::UnsupportedVersion {
                found: snapshot.version(),
                expected: CACHE_VERSION,
            });
        }

        tracing::info!(path = %path.display(), entries = snapshot.len(), "loaded cache");
        Ok(snapshot)
    }

    /// Write the whole snapshot, replacing any previous file
    pub fn save(&self, snapshot: &CacheSnapshot) -> Result<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            create_dir(parent)?;
        }

        let text = self.encode(snapshot)?;
        fs::write(&path, text).map_err(|source| Error::Io {
            operation: "write",
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), entries = snapshot.len(), "saved cache");
        Ok(())
    }

    fn encode(&self, snapshot: &CacheSnapshot) -> Result<String> {
        match self.format {
            CacheFormat::Ron => {
                ron::ser::to_string_pretty(snapshot, ron::ser::PrettyConfig::default())
                    .map_err(|e| Error::Serialization(e.to_string()))
            }
            #[cfg(feature = "serde_json")]
            CacheFormat::Json => serde_json::to_string_pretty(snapshot)
                .map_err(|e| Error::Serialization(e.to_string())),
            #[cfg(not(feature = "serde_json"))]
            CacheFormat::Json => Err(json_unavailable()),
        }
    }

    fn decode(&self, text: &str) -> Result<CacheSnapshot> {
        match self.format {
            CacheFormat::Ron => ron::from_str(text).map_err(|e| Error::Serialization(e.to_string())),
            #[cfg(feature = "serde_json")]
            CacheFormat::Json => {
                serde_json::from_str(text).map_err(|e| Error::Serialization(e.to_string()))
            }
            #[cfg(not(feature = "serde_json"))]
            CacheFormat::Json => Err(json_unavailable()),
        }
    }
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| Error::Io {
        operation: "create directory",
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(not(feature = "serde_json"))]
fn json_unavailable() -> Error {
    Error::FormatUnavailable("JSON cache files require the 'serde_json' feature".to_string())
}
