//! Settings file support.
//!
//! Every field is optional; anything missing keeps the built-in default and
//! command line flags override whatever the file sets.
use std::path::{Path, PathBuf};

use coverscan_ocr::{ExtractorConfig, KeywordScorer, Preprocess};

use crate::cli::VisionProvider;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CACHE_FILE: &str = "hybrid_ocr_cache.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub extractor: ExtractorConfig,
    /// Terms expected on the page; each one found adds to a variant's score.
    pub keywords: Vec<String>,
    pub tesseract: TesseractSection,
    pub vision: VisionSection,
    pub cache_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractSection {
    pub binary: PathBuf,
    pub lang: String,
    pub oem: u32,
    /// Page segmentation modes tried on every image.
    pub psm: Vec<u32>,
    /// Preprocessing pipelines tried with every psm.
    pub preprocess: Vec<Preprocess>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionSection {
    /// Hosted backends tried, in order, when their API key is set.
    pub providers: Vec<VisionProvider>,
    /// OpenAI-compatible model.
    pub model: String,
    pub claude_model: String,
    pub max_tokens: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorConfig::default(),
            keywords: KeywordScorer::default().keywords().to_vec(),
            tesseract: TesseractSection::default(),
            vision: VisionSection::default(),
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
        }
    }
}

impl Default for TesseractSection {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            lang: "eng".to_string(),
            oem: 3,
            psm: vec![3, 6, 11],
            preprocess: vec![
                Preprocess::minimal(),
                Preprocess::high_contrast(150, 1.5),
                Preprocess::high_contrast(180, 1.2),
            ],
        }
    }
}

impl Default for VisionSection {
    fn default() -> Self {
        Self {
            providers: vec![VisionProvider::OpenAi, VisionProvider::Claude],
            model: coverscan_ocr::vision::DEFAULT_MODEL.to_string(),
            claude_model: coverscan_ocr::claude::DEFAULT_MODEL.to_string(),
            max_tokens: 1500,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn scorer(&self) -> KeywordScorer {
        KeywordScorer::new(&self.keywords)
    }
}
