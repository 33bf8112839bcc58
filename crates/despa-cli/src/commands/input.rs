//! Shared input handling: settings, catalog, page images and the OCR reader.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use despa_core::pdf::{PdfExtractor, PdfProcessor};
use despa_core::{Catalog, DespaConfig, OcrRegionReader, PageImage, PureOcrRecognizer};

use super::config::default_config_path;

/// Load settings from `--config`, else the default config file, else defaults.
pub fn load_settings(config_path: Option<&str>) -> anyhow::Result<DespaConfig> {
    if let Some(path) = config_path {
        return DespaConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to read config file {}", path));
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config file {}", default_path.display());
        return Ok(DespaConfig::from_file(&default_path)?);
    }

    Ok(DespaConfig::default())
}

pub fn load_catalog(path: &Path) -> anyhow::Result<Catalog> {
    if !path.exists() {
        anyhow::bail!("Catalog file not found: {}", path.display());
    }
    Catalog::from_file(path).with_context(|| format!("Failed to load catalog {}", path.display()))
}

/// Expand file arguments and glob patterns, keeping argument order.
pub fn expand_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let mut matched: Vec<PathBuf> = glob(pattern)?.filter_map(|r| r.ok()).collect();
        if matched.is_empty() {
            anyhow::bail!("Input file not found: {}", pattern);
        }
        matched.sort();
        files.extend(matched);
    }

    Ok(files)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Load the pages of a provisional document.
///
/// Each PDF contributes its scanned pages; each image file is one page.
/// Pages are numbered consecutively across inputs.
pub fn load_pages(inputs: &[PathBuf], config: &DespaConfig) -> anyhow::Result<Vec<PageImage>> {
    let mut pages = Vec::new();

    for input in inputs {
        match extension_of(input).as_str() {
            "pdf" => {
                let data = fs::read(input)?;
                let extractor = PdfExtractor::from_bytes(&data)
                    .with_context(|| format!("Failed to load {}", input.display()))?;
                append_pages(&mut pages, extractor.page_images(config.pdf.max_pages)?);
            }
            "png" | "jpg" | "jpeg" | "tiff" | "bmp" => {
                let page = PageImage::from_file(1, input)
                    .with_context(|| format!("Failed to load {}", input.display()))?;
                append_pages(&mut pages, vec![page]);
            }
            other => anyhow::bail!("Unsupported file format: {}", other),
        }
    }

    info!("Loaded {} pages from {} inputs", pages.len(), inputs.len());
    Ok(pages)
}

/// Append the pages of one input after those already loaded.
///
/// A PDF keeps its own page numbers, gaps included, shifted past the highest
/// number so far.
fn append_pages(pages: &mut Vec<PageImage>, mut new: Vec<PageImage>) {
    let offset = pages.iter().map(|p| p.page_number).max().unwrap_or(0);
    for page in &mut new {
        page.page_number += offset;
    }
    pages.extend(new);
}

/// Model directory from the command line, else from the settings.
pub fn model_dir(arg: Option<&Path>, config: &DespaConfig) -> PathBuf {
    arg.map(Path::to_path_buf)
        .unwrap_or_else(|| config.models.model_dir.clone())
}

pub fn load_recognizer(
    model_dir: &Path,
    config: &DespaConfig,
) -> anyhow::Result<PureOcrRecognizer> {
    PureOcrRecognizer::from_dir(model_dir, &config.models, config.ocr.clone()).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load OCR models from {}: {}\n\n\
             Expected {}, {} and {} in that directory.",
            model_dir.display(),
            e,
            config.models.detection_model,
            config.models.recognition_model,
            config.models.dictionary
        )
    })
}

pub fn build_reader(
    model_dir: &Path,
    config: &DespaConfig,
) -> anyhow::Result<OcrRegionReader<PureOcrRecognizer>> {
    Ok(OcrRegionReader::new(load_recognizer(model_dir, config)?).with_config(&config.ocr))
}

pub fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}

/// Print to stdout or write to `output`.
pub fn emit(content: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            println!(
                "{} Output written to {}",
                style("✓").green(),
                path.display()
            );
        }
        None => println!("{}", content),
    }
    Ok(())
}
