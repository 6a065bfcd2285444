//! Per-image orchestration: cache lookup, backend variants, best-of selection.
//!
//! Images are processed one after another. A failing variant or image is
//! logged and skipped; it never aborts the run.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use coverscan_ocr::{
  claude, is_cover_page, select_best, vision, CacheEntry, ClaudeEngine, ClaudeOptions,
  KeywordScorer, OcrEngine, OcrError, OcrInput, OcrOutput, Preprocess, RegionRecord, ResultCache,
  Score, TesseractEngine, TesseractOptions, VisionEngine, VisionOptions,
};
use serde::Serialize;
use walkdir::WalkDir;

use crate::cli::{Method, VisionProvider};
use crate::config::AppConfig;

pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tiff", "bmp", "gif"];

/// Everything an extraction run needs, resolved from defaults, config file and flags.
pub struct ExtractOptions {
  pub inputs: Vec<PathBuf>,
  pub method: Method,
  pub config: AppConfig,
  pub force: bool,
  pub output_file_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
  pub image: String,
  pub method: String,
  pub cached: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub score: Option<Score>,
  pub text: String,
  pub total_texts: usize,
  pub regions: Vec<RegionRecord>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// Per-backend results, filled in by `--method compare`.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub comparison: Vec<BackendComparison>,
}

/// How one backend did on an image in compare mode.
#[derive(Debug, Clone, Serialize)]
pub struct BackendComparison {
  pub backend: String,
  /// Winning variant within the backend.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub method: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub score: Option<Score>,
  pub keywords_found: Vec<String>,
  pub keywords_missing: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractReport {
  pub generated_at: String,
  pub keywords: Vec<String>,
  pub total_images: usize,
  pub results: Vec<ImageReport>,
}

/// Expands directories (recursively) into image files, sorted and de-duplicated.
pub fn gather_images(inputs: &[PathBuf]) -> Vec<PathBuf> {
  let mut files = Vec::new();
  for input in inputs {
    if input.is_dir() {
      files.extend(
        WalkDir::new(input)
          .into_iter()
          .filter_map(|e| e.ok())
          .filter(|e| e.file_type().is_file())
          .map(|e| e.into_path())
          .filter(|p| is_image(p)),
      );
    } else if input.is_file() && is_image(input) {
      files.push(input.clone());
    } else {
      tracing::warn!("skipping {}: not an image file or directory", input.display());
    }
  }
  files.sort();
  files.dedup();
  files
}

fn is_image(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
    .unwrap_or(false)
}

fn cache_key(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}

/// Builds one Tesseract engine per psm × preprocessing combination.
pub fn tesseract_variants(config: &AppConfig) -> Vec<TesseractEngine> {
  let pipelines = if config.tesseract.preprocess.is_empty() {
    vec![Preprocess::default()]
  } else {
    config.tesseract.preprocess.clone()
  };
  let mut engines = Vec::new();
  for preprocess in &pipelines {
    for psm in &config.tesseract.psm {
      engines.push(TesseractEngine::new(TesseractOptions {
        binary: config.tesseract.binary.clone(),
        psm: *psm,
        oem: config.tesseract.oem,
        lang: config.tesseract.lang.clone(),
        preprocess: preprocess.clone(),
        extractor: config.extractor.clone(),
      }));
    }
  }
  engines
}

/// Engines available to an extraction run.
pub struct Backends {
  /// Tesseract variants, tried together and scored against each other.
  pub tesseract: Vec<Box<dyn OcrEngine>>,
  /// Hosted vision engines that have credentials, in configured order.
  pub hosted: Vec<Box<dyn OcrEngine>>,
}

impl Backends {
  /// Reads API keys from the environment.
  pub fn from_config(config: &AppConfig, method: Method) -> Self {
    Self::with_credentials(config, method, |name| std::env::var(name).ok())
  }

  /// `lookup` maps an environment variable name to its value.
  pub fn with_credentials<F>(config: &AppConfig, method: Method, lookup: F) -> Self
  where
    F: Fn(&str) -> Option<String>,
  {
    let tesseract = tesseract_variants(config)
      .into_iter()
      .map(|e| Box::new(e) as Box<dyn OcrEngine>)
      .collect();
    let hosted = if method == Method::Tesseract {
      Vec::new()
    } else {
      hosted_engines(config, lookup)
    };
    if method != Method::Tesseract && hosted.is_empty() {
      tracing::warn!("no hosted vision backend available, falling back to tesseract");
    }
    Self { tesseract, hosted }
  }

  /// Engines that should handle `image` under `method`.
  pub fn route(&self, method: Method, image: &Path) -> &[Box<dyn OcrEngine>] {
    let wants_hosted = match method {
      Method::Tesseract | Method::Compare => false,
      Method::Vision => true,
      Method::Hybrid => is_cover_page(image, &siblings(image)),
    };
    if wants_hosted && !self.hosted.is_empty() {
      &self.hosted
    } else {
      &self.tesseract
    }
  }
}

fn hosted_engines<F>(config: &AppConfig, lookup: F) -> Vec<Box<dyn OcrEngine>>
where
  F: Fn(&str) -> Option<String>,
{
  let mut engines: Vec<Box<dyn OcrEngine>> = Vec::new();
  for provider in &config.vision.providers {
    let engine: Result<Box<dyn OcrEngine>, OcrError> = match provider {
      VisionProvider::OpenAi => VisionEngine::from_key(
        lookup(vision::API_KEY_VAR),
        VisionOptions {
          model: config.vision.model.clone(),
          max_tokens: config.vision.max_tokens,
          ..Default::default()
        },
      )
      .map(|e| Box::new(e) as Box<dyn OcrEngine>),
      VisionProvider::Claude => ClaudeEngine::from_key(
        lookup(claude::API_KEY_VAR),
        ClaudeOptions {
          model: config.vision.claude_model.clone(),
          max_tokens: config.vision.max_tokens,
          ..Default::default()
        },
      )
      .map(|e| Box::new(e) as Box<dyn OcrEngine>),
    };
    match engine {
      Ok(engine) => engines.push(engine),
      Err(e) => tracing::info!("skipping {:?} backend: {}", provider, e),
    }
  }
  engines
}

/// Runs every engine on the image and keeps the best-scoring output.
pub async fn best_of(
  engines: &[Box<dyn OcrEngine>],
  image: &Path,
  scorer: &KeywordScorer,
) -> Option<(OcrOutput, Score)> {
  let input = OcrInput::FilePath(image.to_path_buf());
  let mut outputs = Vec::new();
  for engine in engines {
    match engine.recognize(&input).await {
      Ok(output) => {
        tracing::debug!(
          words = output.word_count(),
          "{} on {}",
          output.method,
          image.display()
        );
        outputs.push(output);
      }
      Err(e) => tracing::warn!("{} failed on {}: {}", engine.name(), image.display(), e),
    }
  }
  select_best(outputs, scorer).map(|best| (best.candidate, best.score))
}

/// Runs Tesseract (all variants together) and each hosted engine on its own,
/// then reports keywords found and missing per backend. Also returns the best
/// output overall.
pub async fn compare_backends(
  backends: &Backends,
  image: &Path,
  scorer: &KeywordScorer,
) -> (Vec<BackendComparison>, Option<(OcrOutput, Score)>) {
  let groups = std::iter::once(("tesseract".to_string(), backends.tesseract.as_slice())).chain(
    backends
      .hosted
      .iter()
      .map(|engine| (engine.name(), std::slice::from_ref(engine))),
  );

  let mut comparison = Vec::new();
  let mut outputs = Vec::new();
  for (backend, engines) in groups {
    if engines.is_empty() {
      continue;
    }
    match best_of(engines, image, scorer).await {
      Some((output, score)) => {
        comparison.push(BackendComparison {
          backend,
          method: Some(output.method.clone()),
          keywords_found: score.keywords_found.clone(),
          keywords_missing: scorer.missing(&score),
          score: Some(score),
          error: None,
        });
        outputs.push(output);
      }
      None => comparison.push(BackendComparison {
        backend,
        method: None,
        score: None,
        keywords_found: Vec::new(),
        keywords_missing: scorer.keywords().to_vec(),
        error: Some("all variants failed".to_string()),
      }),
    }
  }

  let best = select_best(outputs, scorer).map(|best| (best.candidate, best.score));
  (comparison, best)
}

/// Runs extraction over all inputs, updating and saving the cache.
pub async fn run_extract(options: &ExtractOptions) -> Result<ExtractReport> {
  let backends = Backends::from_config(&options.config, options.method);
  run_with_backends(options, &backends).await
}

/// Same as [`run_extract`] with the engines supplied by the caller.
pub async fn run_with_backends(options: &ExtractOptions, backends: &Backends) -> Result<ExtractReport> {
  let config = &options.config;
  let scorer = config.scorer();
  let compare = options.method == Method::Compare;

  let mut cache = match ResultCache::load(&config.cache_file) {
    Ok(cache) => {
      if !cache.is_empty() {
        tracing::info!("loaded {} cached results from {}", cache.len(), config.cache_file.display());
      }
      cache
    }
    Err(e) => {
      tracing::warn!("ignoring unreadable cache: {}", e);
      ResultCache::new(&config.cache_file)
    }
  };

  let images = gather_images(&options.inputs);
  tracing::info!("processing {} images", images.len());

  let mut results = Vec::new();
  for image in &images {
    let key = cache_key(image);
    if !options.force && !compare {
      if let Some(entry) = cache.get(&key) {
        tracing::info!("using cached result for {}", key);
        results.push(report_from_cache(image, entry));
        continue;
      }
    }

    let (comparison, best) = if compare {
      compare_backends(backends, image, &scorer).await
    } else {
      let engines = backends.route(options.method, image);
      (Vec::new(), best_of(engines, image, &scorer).await)
    };

    match best {
      Some((output, score)) => {
        let entry = CacheEntry::from_output(image, &output);
        cache.insert(key, entry);
        results.push(ImageReport {
          image: image.display().to_string(),
          method: output.method,
          cached: false,
          score: Some(score),
          text: output.text,
          total_texts: output.regions.len(),
          regions: output.regions,
          error: None,
          comparison,
        });
      }
      None => {
        tracing::warn!("all variants failed on {}", image.display());
        results.push(ImageReport {
          image: image.display().to_string(),
          method: String::new(),
          cached: false,
          score: None,
          text: String::new(),
          total_texts: 0,
          regions: Vec::new(),
          error: Some("all OCR variants failed".to_string()),
          comparison,
        });
      }
    }
  }

  if results.iter().any(|r| !r.cached && r.error.is_none()) {
    cache.save().context("failed to save result cache")?;
    tracing::info!("saved {} results to {}", cache.len(), cache.path().display());
  }

  let report = ExtractReport {
    generated_at: Utc::now().to_rfc3339(),
    keywords: scorer.keywords().to_vec(),
    total_images: results.len(),
    results,
  };

  if let Some(path) = &options.output_file_path {
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
  }

  Ok(report)
}

fn siblings(image: &Path) -> Vec<PathBuf> {
  let Some(parent) = image.parent() else {
    return Vec::new();
  };
  let dir = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
  match std::fs::read_dir(dir) {
    Ok(entries) => entries
      .filter_map(|e| e.ok())
      .map(|e| parent.join(e.file_name()))
      .collect(),
    Err(_) => Vec::new(),
  }
}

fn report_from_cache(image: &Path, entry: &CacheEntry) -> ImageReport {
  let text = entry
    .text_data
    .iter()
    .map(|r| r.text.as_str())
    .collect::<Vec<_>>()
    .join(" ");
  ImageReport {
    image: image.display().to_string(),
    method: entry.method.clone(),
    cached: true,
    score: None,
    text,
    total_texts: entry.total_texts,
    regions: entry.text_data.clone(),
    error: None,
    comparison: Vec::new(),
  }
}
