//! Detect command - classify the pages of a provisional document.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use despa_core::Pipeline;

use super::input;

/// Arguments for the detect command.
#[derive(Args)]
pub struct DetectArgs {
    /// Catalog file with page types and detection rules
    #[arg(long, required = true)]
    catalog: PathBuf,

    /// Provisional document (PDF or page images, glob patterns allowed)
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn run(args: DetectArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = input::load_settings(config_path)?;
    let catalog = input::load_catalog(&args.catalog)?;
    let files = input::expand_inputs(&args.inputs)?;

    let pb = input::spinner();
    pb.set_message("Loading pages...");
    let pages = input::load_pages(&files, &config)?;

    pb.set_message("Loading OCR models...");
    let model_dir = input::model_dir(args.model_dir.as_deref(), &config);
    let reader = input::build_reader(&model_dir, &config)?;

    pb.set_message(format!("Detecting {} pages...", pages.len()));
    let pipeline = Pipeline::new(&reader, &catalog).with_config(config);
    let detections = pipeline.detect_pages(&pages)?;
    pb.finish_and_clear();

    let detected = detections.iter().filter(|d| d.is_detected()).count();
    info!("{} of {} pages detected", detected, detections.len());

    input::emit(&serde_json::to_string_pretty(&detections)?, args.output.as_deref())?;

    eprintln!(
        "{} {} of {} pages detected",
        style("ℹ").blue(),
        detected,
        detections.len()
    );
    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
