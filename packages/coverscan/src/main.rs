use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use coverscan::cli::{Args, Commands};
use coverscan::config::AppConfig;
use coverscan::pipeline::{run_extract, ExtractOptions};
use coverscan::regions::regions_from_file;
use coverscan_ocr::{search, Preprocess, ResultCache};

#[tokio::main]
async fn main() {
  let args = Args::parse();
  coverscan::logging::init(args.verbose);

  if let Err(e) = run(args).await {
    eprintln!("Error: {:#}", e);
    std::process::exit(1);
  }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
  match path {
    Some(path) => Ok(AppConfig::load(path)?),
    None => Ok(AppConfig::default()),
  }
}

fn join_or_dash(items: &[String]) -> String {
  if items.is_empty() {
    "-".to_string()
  } else {
    items.join(", ")
  }
}

async fn run(args: Args) -> Result<()> {
  match args.command {
    Commands::Version => {
      println!("coverscan {}", env!("CARGO_PKG_VERSION"));
    }
    Commands::Extract {
      inputs,
      method,
      providers,
      config,
      psm,
      oem,
      lang,
      min_confidence,
      keywords,
      cache,
      force,
      output,
      grayscale,
      threshold,
      contrast,
      denoise,
      sharpen,
    } => {
      let mut config = load_config(config.as_deref())?;
      if !providers.is_empty() {
        config.vision.providers = providers;
      }
      if !psm.is_empty() {
        config.tesseract.psm = psm;
      }
      if let Some(oem) = oem {
        config.tesseract.oem = oem;
      }
      if let Some(lang) = lang {
        config.tesseract.lang = lang;
      }
      if let Some(min_confidence) = min_confidence {
        config.extractor.min_confidence = min_confidence;
      }
      if !keywords.is_empty() {
        config.keywords = keywords;
      }
      if let Some(cache) = cache {
        config.cache_file = cache;
      }
      if grayscale || threshold.is_some() || contrast.is_some() || denoise || sharpen {
        config.tesseract.preprocess = vec![Preprocess {
          grayscale,
          contrast,
          denoise,
          threshold,
          sharpen,
        }];
      }

      let options = ExtractOptions {
        inputs,
        method,
        config,
        force,
        output_file_path: output,
      };
      let report = run_extract(&options).await?;
      if report.results.is_empty() {
        println!("No images found.");
      }
      for result in &report.results {
        println!("{}", result.image);
        match (&result.error, &result.score) {
          (Some(error), _) => println!("  error: {}", error),
          (None, Some(score)) => println!(
            "  {} | score {} | {} regions | keywords: {}",
            result.method,
            score.total,
            result.total_texts,
            join_or_dash(&score.keywords_found)
          ),
          (None, None) => println!("  {} (cached) | {} regions", result.method, result.total_texts),
        }
        for backend in &result.comparison {
          match &backend.error {
            Some(error) => println!("    {}: {}", backend.backend, error),
            None => println!(
              "    {}: score {} | found: {} | missing: {}",
              backend.backend,
              backend.score.as_ref().map(|s| s.total).unwrap_or(0),
              join_or_dash(&backend.keywords_found),
              join_or_dash(&backend.keywords_missing)
            ),
          }
        }
        if !result.text.is_empty() {
          println!("  {}", result.text);
        }
      }
    }
    Commands::Regions {
      file,
      tsv,
      width,
      height,
      min_confidence,
      config,
    } => {
      let mut config = load_config(config.as_deref())?;
      if let Some(min_confidence) = min_confidence {
        config.extractor.min_confidence = min_confidence;
      }
      let report = regions_from_file(&file, tsv, width, height, &config.extractor)?;
      println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Commands::Search { query, cache, json } => {
      let path = cache.unwrap_or_else(|| PathBuf::from(coverscan::config::DEFAULT_CACHE_FILE));
      let cache = ResultCache::load(&path).context("failed to load result cache")?;
      let hits = search(&cache, &query);
      if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
      }
      if hits.is_empty() {
        println!("No matches for '{}'", query);
      }
      for hit in hits {
        println!("{} ({} matches)", hit.filename, hit.matches);
        for region in hit.regions {
          println!(
            "  [{:5.1}%, {:5.1}%] {}",
            region.x_percent, region.y_percent, region.text
          );
        }
      }
    }
  }
  Ok(())
}
