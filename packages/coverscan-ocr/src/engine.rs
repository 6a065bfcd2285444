use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::region::{PageResult, RegionRecord};

#[derive(Debug, Clone)]
pub enum OcrInput {
    FilePath(PathBuf),
    Bytes(Vec<u8>),
}

impl OcrInput {
    pub(crate) async fn read_bytes(&self) -> Result<Vec<u8>, OcrError> {
        match self {
            OcrInput::FilePath(path) => tokio::fs::read(path).await.map_err(|e| {
                OcrError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
            }),
            OcrInput::Bytes(data) => Ok(data.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OcrOutput {
    /// Which backend and variant produced this output, e.g. `tesseract psm3 gray`.
    pub method: String,
    /// Region texts in reading order joined by a space.
    pub text: String,
    pub regions: Vec<RegionRecord>,
    /// Pixel-level result; only backends that report word boxes fill this in.
    pub page: Option<PageResult>,
}

impl OcrOutput {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("engine error: {0}")]
    EngineError(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Label identifying this backend configuration in reports and the cache.
    fn name(&self) -> String;

    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput, OcrError>;
}
