//! Compare command - reconcile a provisional document with commercial documents.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use clap::Args;
use console::style;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use despa_core::models::fields::value_text;
use despa_core::{ComparisonResult, ComparisonStatus, FieldMap, Reconciler};

use super::input;

/// Arguments for the compare command.
#[derive(Args)]
pub struct CompareArgs {
    /// Catalog file with the comparable attributes
    #[arg(long, required = true)]
    catalog: PathBuf,

    /// Fields of the provisional document (JSON, as written by `despa extract`)
    #[arg(short, long, required = true)]
    provisional: PathBuf,

    /// Fields of a commercial document (JSON); repeat for several documents
    #[arg(long = "commercial", required = true)]
    commercial: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON report
    Json,
    /// One CSV row per compared attribute
    Csv,
    /// Plain text summary
    Text,
}

#[derive(Serialize)]
struct Report<'a> {
    compared_at: DateTime<Utc>,
    provisional: String,
    results: Vec<DocumentReport<'a>>,
}

#[derive(Serialize)]
struct DocumentReport<'a> {
    commercial_document: &'a str,
    #[serde(flatten)]
    result: &'a ComparisonResult,
}

pub async fn run(args: CompareArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = input::load_settings(config_path)?;
    let catalog = input::load_catalog(&args.catalog)?;

    let provisional = load_provisional(&args.provisional)?;
    let commercials = args
        .commercial
        .iter()
        .map(|path| Ok((document_id(path), load_fields(path)?)))
        .collect::<anyhow::Result<Vec<(String, FieldMap)>>>()?;

    let reconciler = Reconciler::new(&catalog).with_config(config.comparison);
    let results = reconciler.compare_with_all(&provisional, &commercials)?;

    info!("Compared against {} commercial documents", results.len());

    let output = match args.format {
        OutputFormat::Json => format_json(&args.provisional, &results)?,
        OutputFormat::Csv => format_csv(&results)?,
        OutputFormat::Text => format_text(&results),
    };
    input::emit(&output, args.output.as_deref())?;

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn document_id(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string()
}

fn load_fields(path: &Path) -> anyhow::Result<FieldMap> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }
    Ok(FieldMap::from_file(path)?)
}

/// Accept either a bare field map or the full `despa extract` output.
fn load_provisional(path: &Path) -> anyhow::Result<FieldMap> {
    let fields = load_fields(path)?;
    match fields.get("extracted_data") {
        Some(Value::Object(data)) => Ok(FieldMap::from(data.clone())),
        _ => Ok(fields),
    }
}

fn format_json(
    provisional: &Path,
    results: &[(String, ComparisonResult)],
) -> anyhow::Result<String> {
    let report = Report {
        compared_at: Utc::now(),
        provisional: provisional.display().to_string(),
        results: results
            .iter()
            .map(|(id, result)| DocumentReport {
                commercial_document: id,
                result,
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn format_csv(results: &[(String, ComparisonResult)]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "commercial_document",
        "attribute_key",
        "attribute_name",
        "commercial_value",
        "provisional_value",
        "match",
        "confidence",
        "required",
        "reason",
        "status",
    ])?;

    for (id, result) in results {
        for comparison in &result.comparisons {
            wtr.write_record([
                id.as_str(),
                comparison.attribute_key.as_str(),
                comparison.attribute_name.as_str(),
                cell(&comparison.commercial_value).as_str(),
                cell(&comparison.provisional_value).as_str(),
                comparison.matched.to_string().as_str(),
                format!("{:.2}", comparison.confidence).as_str(),
                comparison.required.to_string().as_str(),
                comparison.reason.as_deref().unwrap_or(""),
                result.status.as_str(),
            ])?;
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn cell(value: &Value) -> String {
    if value.is_null() {
        String::new()
    } else {
        value_text(value)
    }
}

fn format_text(results: &[(String, ComparisonResult)]) -> String {
    let mut output = String::new();

    for (id, result) in results {
        let status = match result.status {
            ComparisonStatus::Approved => style(result.status.as_str()).green(),
            ComparisonStatus::PendingReview => style(result.status.as_str()).yellow(),
            ComparisonStatus::Rejected => style(result.status.as_str()).red(),
        };
        output.push_str(&format!(
            "{}: {} ({}/{} attributes, {:.2}%)\n",
            id, status, result.matches, result.total_comparisons, result.match_percentage
        ));

        for comparison in &result.comparisons {
            let mark = if comparison.matched {
                style("✓").green()
            } else {
                style("✗").red()
            };
            output.push_str(&format!(
                "  {} {}: {} / {}",
                mark,
                comparison.attribute_name,
                cell(&comparison.commercial_value),
                cell(&comparison.provisional_value)
            ));
            if let Some(reason) = &comparison.reason {
                output.push_str(&format!(" ({})", reason));
            }
            output.push('\n');
        }
        output.push('\n');
    }

    output
}
