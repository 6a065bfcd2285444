//! On-disk store of per-image results, keyed by image file name.
//!
//! The file is a JSON object mapping file name to [`CacheEntry`]. Saving
//! overwrites the whole file; concurrent writers are last-writer-wins.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::OcrOutput;
use crate::region::RegionRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub image_path: String,
    pub text_data: Vec<RegionRecord>,
    pub total_texts: usize,
    pub method: String,
}

impl CacheEntry {
    pub fn from_output(image_path: &Path, output: &OcrOutput) -> Self {
        Self {
            image_path: image_path.display().to_string(),
            text_data: output.regions.clone(),
            total_texts: output.regions.len(),
            method: output.method.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to access cache {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse cache {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl ResultCache {
    /// An empty cache that will be written to `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            entries: BTreeMap::new(),
        }
    }

    /// Reads `path`, or starts empty when it does not exist yet.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new(path)),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        let entries = serde_json::from_str(&contents).map_err(|source| CacheError::Parse {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, entries })
    }

    pub fn save(&self) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            CacheError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, json).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&CacheEntry> {
        self.entries.get(name)
    }

    /// Stores `entry`, replacing any earlier result for the same name.
    pub fn insert(&mut self, name: impl Into<String>, entry: CacheEntry) -> Option<CacheEntry> {
        self.entries.insert(name.into(), entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
