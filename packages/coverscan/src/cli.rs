//! Command line arguments backing the `coverscan` binary.
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
  name = "coverscan",
  about = "Compare OCR backends on scanned magazine covers and inspect the extracted text regions",
  version
)]
pub struct Args {
  /// Enable debug logging (RUST_LOG overrides)
  #[arg(long, short = 'v', global = true)]
  pub verbose: bool,

  #[command(subcommand)]
  pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
  /// Local Tesseract with every psm/preprocessing variant
  Tesseract,
  /// Hosted vision models
  Vision,
  /// Vision models for cover pages, Tesseract for the rest
  Hybrid,
  /// Run every available backend and report found and missing keywords for each
  Compare,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisionProvider {
  /// OpenAI-compatible chat completions (OPENAI_API_KEY)
  #[value(name = "openai")]
  #[serde(rename = "openai")]
  OpenAi,
  /// Anthropic Messages API (ANTHROPIC_API_KEY)
  Claude,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Print version information
  Version,
  /// Run OCR over images, keep the best-scoring variant per image
  Extract {
    /// Image files or directories (searched recursively)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Backend to use
    #[arg(long, short = 'm', value_enum, default_value = "tesseract")]
    method: Method,

    /// Hosted vision provider to use (repeatable, replaces the configured list)
    #[arg(long = "provider", value_enum)]
    providers: Vec<VisionProvider>,

    /// Settings file (TOML)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Page segmentation mode to try (repeatable)
    #[arg(long = "psm")]
    psm: Vec<u32>,

    /// Tesseract OCR engine mode
    #[arg(long)]
    oem: Option<u32>,

    /// Tesseract language code(s), e.g. eng or eng+fra
    #[arg(long)]
    lang: Option<String>,

    /// Minimum word confidence (0-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    min_confidence: Option<u8>,

    /// Expected keyword used to score variants (repeatable, replaces the defaults)
    #[arg(long = "keyword", short = 'k')]
    keywords: Vec<String>,

    /// Result cache file
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Reprocess images even when cached
    #[arg(long)]
    force: bool,

    /// Write a JSON report of all results here
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Convert to grayscale before OCR
    #[arg(long)]
    grayscale: bool,

    /// Binary threshold (0-255) applied before OCR
    #[arg(long)]
    threshold: Option<u8>,

    /// Contrast factor, e.g. 1.4
    #[arg(long)]
    contrast: Option<f32>,

    /// 3x3 median filter before thresholding
    #[arg(long)]
    denoise: bool,

    /// Sharpen as the last preprocessing step
    #[arg(long)]
    sharpen: bool,
  },
  /// Extract text regions from a saved HOCR (or TSV) file
  Regions {
    /// HOCR file produced by `tesseract <image> out hocr`
    file: PathBuf,

    /// Treat the file as Tesseract TSV instead of HOCR
    #[arg(long)]
    tsv: bool,

    /// Image width in pixels (defaults to the page size in the file)
    #[arg(long)]
    width: Option<u32>,

    /// Image height in pixels (defaults to the page size in the file)
    #[arg(long)]
    height: Option<u32>,

    /// Minimum word confidence (0-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    min_confidence: Option<u8>,

    /// Settings file (TOML)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
  },
  /// Search cached results for a word
  Search {
    /// Case-insensitive text to look for
    query: String,

    /// Result cache file
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Print hits as JSON
    #[arg(long)]
    json: bool,
  },
}
