//! Catalog command - seed catalog snapshots with the default attributes.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use despa_core::Catalog;

/// Arguments for the catalog command.
#[derive(Args)]
pub struct CatalogArgs {
    #[command(subcommand)]
    command: CatalogCommand,
}

#[derive(Subcommand)]
enum CatalogCommand {
    /// Write a new catalog holding the default attributes
    Init {
        /// Output path for the catalog
        #[arg(short, long, default_value = "catalog.json")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Add the default attributes missing from an existing catalog
    Defaults {
        /// Catalog snapshot to update in place
        catalog: PathBuf,
    },
}

pub async fn run(args: CatalogArgs) -> anyhow::Result<()> {
    match args.command {
        CatalogCommand::Init { output, force } => init_catalog(output, force),
        CatalogCommand::Defaults { catalog } => add_defaults(catalog),
    }
}

fn init_catalog(output: PathBuf, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Catalog already exists at {}. Use --force to overwrite.",
            output.display()
        );
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut catalog = Catalog::default();
    let added = catalog.add_default_attributes();
    catalog.save(&output)?;

    println!(
        "{} Created catalog with {} attributes at {}",
        style("✓").green(),
        added.len(),
        output.display()
    );

    Ok(())
}

fn add_defaults(path: PathBuf) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("Catalog not found: {}", path.display());
    }

    let mut catalog = Catalog::from_file(&path)?;
    let added = catalog.add_default_attributes();

    if added.is_empty() {
        println!("{} All default attributes already exist", style("ℹ").blue());
        return Ok(());
    }

    catalog.save(&path)?;
    for name in &added {
        println!("  {} {}", style("+").green(), name);
    }
    println!(
        "{} Added {} default attributes",
        style("✓").green(),
        added.len()
    );

    Ok(())
}
