//! CLI application for customs document reconciliation.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{catalog, compare, config, detect, extract, text};

/// Customs document reconciliation - detect page types, extract fields and compare documents
#[derive(Parser)]
#[command(name = "despa")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the page type of every page of a provisional document
    Detect(detect::DetectArgs),

    /// Detect page types and extract coordinate fields
    Extract(extract::ExtractArgs),

    /// Compare a provisional document with commercial documents
    Compare(compare::CompareArgs),

    /// Extract plain text from a commercial document
    Text(text::TextArgs),

    /// Manage configuration
    Config(config::ConfigArgs),

    /// Seed catalog snapshots with default attributes
    Catalog(catalog::CatalogArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Detect(args) => detect::run(args, config_path).await,
        Commands::Extract(args) => extract::run(args, config_path).await,
        Commands::Compare(args) => compare::run(args, config_path).await,
        Commands::Text(args) => text::run(args, config_path).await,
        Commands::Config(args) => config::run(args).await,
        Commands::Catalog(args) => catalog::run(args).await,
    }
}
