//! Region extraction from OCR output saved on disk, without running a backend.
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use coverscan_ocr::{extract_regions, parse_hocr, parse_tsv, to_records, ExtractorConfig, RegionRecord};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RegionsReport {
  pub image_width: u32,
  pub image_height: u32,
  pub text: String,
  pub total_texts: usize,
  pub regions: Vec<RegionRecord>,
}

/// Reads a HOCR (or TSV) file and runs the region extractor over it.
///
/// `width`/`height` override the page size found in the file. A file that
/// does not parse yields an empty report rather than an error.
pub fn regions_from_file(
  path: &Path,
  tsv: bool,
  width: Option<u32>,
  height: Option<u32>,
  extractor: &ExtractorConfig,
) -> Result<RegionsReport> {
  let contents =
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

  let (dimensions, detections) = if tsv {
    let page = parse_tsv(&contents);
    (page.dimensions, page.detections)
  } else {
    let page = parse_hocr(&contents);
    (page.dimensions, page.detections)
  };

  let (image_width, image_height) = match (width, height, dimensions) {
    (Some(w), Some(h), _) => (w, h),
    (w, h, Some((pw, ph))) => (w.unwrap_or(pw), h.unwrap_or(ph)),
    (_, _, None) if detections.is_empty() => (width.unwrap_or(0), height.unwrap_or(0)),
    _ => {
      return Err(anyhow!(
        "{} has no page size; pass --width and --height",
        path.display()
      ))
    }
  };

  let page = extract_regions(&detections, image_width, image_height, extractor);
  tracing::debug!(words = detections.len(), kept = page.len(), "extracted regions from {}", path.display());

  Ok(RegionsReport {
    image_width,
    image_height,
    text: page.linear_text(),
    total_texts: page.len(),
    regions: to_records(&page, extractor),
  })
}
