//! # coverscan-ocr
//!
//! Turns OCR backend output into cleaned text regions in reading order.
//!
//! ```ignore
//! use coverscan_ocr::{extract_regions, parse_hocr, ExtractorConfig};
//!
//! let hocr = std::fs::read_to_string("cover.hocr")?;
//! let parsed = parse_hocr(&hocr);
//! let (width, height) = parsed.dimensions.unwrap_or((0, 0));
//! let page = extract_regions(&parsed.detections, width, height, &ExtractorConfig::default());
//! println!("{}", page.linear_text());
//! ```

pub mod cache;
pub mod claude;
pub mod classify;
pub mod engine;
pub mod extractor;
pub mod hocr;
pub mod preprocess;
pub mod region;
pub mod search;
pub mod select;
pub mod tesseract;
pub mod tsv;
pub mod vision;

#[cfg(test)]
mod test_support;

pub use cache::{CacheEntry, CacheError, ResultCache};
pub use claude::{ClaudeEngine, ClaudeOptions};
pub use classify::is_cover_page;
pub use engine::{OcrEngine, OcrError, OcrInput, OcrOutput};
pub use extractor::{extract_regions, is_meaningful_text, to_records, ExtractorConfig};
pub use hocr::{parse_hocr, HocrPage};
pub use preprocess::Preprocess;
pub use region::{BoundingBox, Detection, PageResult, RegionRecord, SizeClass, TextRegion};
pub use search::{search, SearchHit};
pub use select::{rank, select_best, Candidate, KeywordScorer, Score, Scored};
pub use tesseract::{TesseractEngine, TesseractOptions};
pub use tsv::{parse_tsv, TsvPage};
pub use vision::{parse_vision_response, VisionEngine, VisionOptions};
