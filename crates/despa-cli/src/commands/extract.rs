//! Extract command - detect page types and read their coordinate fields.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::debug;

use despa_core::Pipeline;

use super::input;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Catalog file with page types, rules and field coordinates
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

    /// Print only the extracted fields, without page detections
    #[arg(long)]
    fields_only: bool,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
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

    pb.set_message(format!("Extracting fields from {} pages...", pages.len()));
    let pipeline = Pipeline::new(&reader, &catalog).with_config(config);
    let extraction = pipeline.extract_provisional(&pages)?;
    pb.finish_and_clear();

    let output = if args.fields_only {
        serde_json::to_string_pretty(&extraction.extracted_data)?
    } else {
        serde_json::to_string_pretty(&extraction)?
    };
    input::emit(&output, args.output.as_deref())?;

    let empty = extraction
        .extracted_data
        .values()
        .filter(|v| v.is_empty())
        .count();
    if empty > 0 {
        eprintln!(
            "{} {} of {} fields could not be read",
            style("⚠").yellow(),
            empty,
            extraction.extracted_data.len()
        );
    }
    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
