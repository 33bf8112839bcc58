//! Text command - plain text of a commercial document.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::{debug, info};

use despa_core::error::PdfError;
use despa_core::{DespaError, PureOcrRecognizer, TextExtractor};

use super::input;

/// Arguments for the text command.
#[derive(Args)]
pub struct TextArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use only the PDF text layer, never OCR
    #[arg(long)]
    text_only: bool,
}

pub async fn run(args: TextArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = input::load_settings(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    info!("Extracting text from {}", args.input.display());

    let recognizer = if args.text_only {
        None
    } else {
        let model_dir = input::model_dir(args.model_dir.as_deref(), &config);
        match input::load_recognizer(&model_dir, &config) {
            Ok(recognizer) => Some(recognizer),
            Err(e) => {
                eprintln!(
                    "{} OCR unavailable, using the PDF text layer only",
                    style("⚠").yellow()
                );
                debug!("{}", e);
                None
            }
        }
    };

    let data = fs::read(&args.input)?;
    let mut extractor = TextExtractor::<PureOcrRecognizer>::new(recognizer.as_ref())
        .with_min_text_length(config.pdf.min_text_length);
    if args.text_only {
        extractor = extractor.text_layer_only();
    }

    let text = match extractor.extract_text(&data, &extension) {
        Err(DespaError::Pdf(PdfError::NoTextLayer)) if args.text_only => {
            anyhow::bail!(
                "PDF is image-based but --text-only flag was set. Remove flag to use OCR."
            );
        }
        result => result?,
    };

    input::emit(&text, args.output.as_deref())?;

    Ok(())
}
