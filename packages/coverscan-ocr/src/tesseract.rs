//! Local OCR through the `tesseract` executable.
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::engine::{OcrEngine, OcrError, OcrInput, OcrOutput};
use crate::extractor::{extract_regions, to_records, ExtractorConfig};
use crate::hocr::parse_hocr;
use crate::preprocess::Preprocess;

/// One Tesseract configuration to try against an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractOptions {
    /// Executable to run; looked up on `PATH` when not absolute.
    pub binary: PathBuf,
    /// Page segmentation mode.
    pub psm: u32,
    /// OCR engine mode.
    pub oem: u32,
    pub lang: String,
    pub preprocess: Preprocess,
    pub extractor: ExtractorConfig,
}

impl Default for TesseractOptions {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            psm: 3,
            oem: 3,
            lang: "eng".to_string(),
            preprocess: Preprocess::default(),
            extractor: ExtractorConfig::default(),
        }
    }
}

pub struct TesseractEngine {
    options: TesseractOptions,
}

impl TesseractEngine {
    pub fn new(options: TesseractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TesseractOptions {
        &self.options
    }

    /// Runs Tesseract and returns its raw HOCR document.
    pub async fn run_hocr(&self, input: &OcrInput) -> Result<(String, (u32, u32)), OcrError> {
        let bytes = input.read_bytes().await?;
        let preprocess = self.options.preprocess.clone();

        let (tmp, dimensions) = tokio::task::spawn_blocking(move || prepare_image(&bytes, &preprocess))
            .await
            .map_err(|e| OcrError::EngineError(e.to_string()))??;

        tracing::debug!(
            psm = self.options.psm,
            oem = self.options.oem,
            lang = %self.options.lang,
            "running tesseract on {}",
            tmp.path().display()
        );
        let output = Command::new(&self.options.binary)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.options.lang)
            .arg("--oem")
            .arg(self.options.oem.to_string())
            .arg("--psm")
            .arg(self.options.psm.to_string())
            .arg("hocr")
            .output()
            .await
            .map_err(|e| {
                OcrError::EngineError(format!(
                    "failed to run {} (is it installed?): {}",
                    self.options.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::EngineError(format!(
                "tesseract failed: {}",
                stderr.trim()
            )));
        }
        Ok((String::from_utf8_lossy(&output.stdout).into_owned(), dimensions))
    }
}

fn prepare_image(
    bytes: &[u8],
    preprocess: &Preprocess,
) -> Result<(tempfile::NamedTempFile, (u32, u32)), OcrError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| OcrError::InvalidInput(format!("failed to decode image: {}", e)))?;
    let dimensions = (image.width(), image.height());
    let image = preprocess.apply(image);

    let mut tmp = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .map_err(|e| OcrError::EngineError(format!("failed to create temp file: {}", e)))?;
    image
        .write_to(&mut tmp, image::ImageFormat::Png)
        .map_err(|e| OcrError::EngineError(format!("failed to write temp image: {}", e)))?;
    tmp.flush()
        .map_err(|e| OcrError::EngineError(format!("failed to flush temp image: {}", e)))?;
    Ok((tmp, dimensions))
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> String {
        format!(
            "tesseract psm{} {}",
            self.options.psm,
            self.options.preprocess.label()
        )
    }

    async fn recognize(&self, input: &OcrInput) -> Result<OcrOutput, OcrError> {
        let (hocr, (width, height)) = self.run_hocr(input).await?;
        let parsed = parse_hocr(&hocr);
        let page = extract_regions(&parsed.detections, width, height, &self.options.extractor);
        tracing::debug!(
            words = parsed.detections.len(),
            kept = page.len(),
            "{} extracted regions",
            self.name()
        );

        Ok(OcrOutput {
            method: self.name(),
            text: page.linear_text(),
            regions: to_records(&page, &self.options.extractor),
            page: Some(page),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_includes_variant() {
        let engine = TesseractEngine::new(TesseractOptions {
            psm: 11,
            preprocess: Preprocess::minimal(),
            ..Default::default()
        });
        assert_eq!(engine.name(), "tesseract psm11 gray");
    }

    #[tokio::test]
    async fn test_undecodable_image_is_invalid_input() {
        let engine = TesseractEngine::new(TesseractOptions::default());
        let err = engine
            .recognize(&OcrInput::Bytes(b"definitely not a png".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_engine_error() {
        let mut png = Vec::new();
        image::DynamicImage::new_luma8(4, 4)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let engine = TesseractEngine::new(TesseractOptions {
            binary: PathBuf::from("/nonexistent/tesseract-binary"),
            ..Default::default()
        });
        let err = engine.recognize(&OcrInput::Bytes(png)).await.unwrap_err();
        assert!(matches!(err, OcrError::EngineError(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_invalid_input() {
        let engine = TesseractEngine::new(TesseractOptions::default());
        let err = engine
            .recognize(&OcrInput::FilePath(PathBuf::from("/nonexistent/cover.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidInput(_)));
    }
}
