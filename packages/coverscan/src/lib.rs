//! # coverscan
//!
//! Runs OCR backends over scanned magazine pages, keeps the best-scoring
//! variant per image and caches the resulting text regions.
//!
//! The heavy lifting lives in [`coverscan_ocr`]; this crate wires it to the
//! command line, the settings file and the on-disk cache.
//!
//! ```ignore
//! use coverscan::prelude::*;
//!
//! let options = ExtractOptions {
//!     inputs: vec!["scans/".into()],
//!     method: Method::Hybrid,
//!     config: AppConfig::default(),
//!     force: false,
//!     output_file_path: None,
//! };
//! let report = run_extract(&options).await?;
//! for result in report.results {
//!     println!("{}: {}", result.image, result.text);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod regions;

pub use config::{AppConfig, ConfigError};
pub use pipeline::{
  gather_images, run_extract, run_with_backends, BackendComparison, Backends, ExtractOptions,
  ExtractReport, ImageReport,
};
pub use regions::{regions_from_file, RegionsReport};

/// Prelude module for convenient imports
pub mod prelude {
  pub use crate::cli::Method;
  pub use crate::{
    gather_images, regions_from_file, run_extract, AppConfig, ExtractOptions, ExtractReport,
    ImageReport, RegionsReport,
  };
  pub use coverscan_ocr::{
    extract_regions, parse_hocr, search, ExtractorConfig, KeywordScorer, PageResult, ResultCache,
    TextRegion,
  };
}
