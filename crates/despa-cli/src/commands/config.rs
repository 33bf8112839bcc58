//! Config command - manage settings.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use despa_core::DespaConfig;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current settings
    Show,

    /// Write a settings file with default values
    Init(InitArgs),

    /// Get a specific value
    Get {
        /// Dotted key (e.g., "comparison.approve_at")
        key: String,
    },

    /// Set a value
    Set {
        /// Dotted key
        key: String,
        /// New value, parsed as JSON when possible
        value: String,
    },

    /// Show settings file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for the settings file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(),
        ConfigCommand::Init(init_args) => init_config(init_args),
        ConfigCommand::Get { key } => get_config(&key),
        ConfigCommand::Set { key, value } => set_config(&key, &value),
        ConfigCommand::Path => show_path(),
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("despa")
        .join("config.json")
}

fn load_or_default() -> anyhow::Result<DespaConfig> {
    let config_path = default_config_path();
    if config_path.exists() {
        Ok(DespaConfig::from_file(&config_path)?)
    } else {
        Ok(DespaConfig::default())
    }
}

fn show_config() -> anyhow::Result<()> {
    if !default_config_path().exists() {
        println!(
            "{} No config file found, showing defaults.",
            style("ℹ").blue()
        );
    }

    let config = load_or_default()?;
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}

fn init_config(args: InitArgs) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or_else(default_config_path);

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    DespaConfig::default().save(&output_path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );

    Ok(())
}

fn lookup<'v>(json: &'v Value, key: &str) -> Option<&'v Value> {
    key.split('.').try_fold(json, |current, part| current.get(part))
}

fn get_config(key: &str) -> anyhow::Result<()> {
    let json = serde_json::to_value(load_or_default()?)?;

    let value = lookup(&json, key)
        .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;

    println!("{}", serde_json::to_string_pretty(value)?);

    Ok(())
}

fn set_config(key: &str, value: &str) -> anyhow::Result<()> {
    let config_path = default_config_path();
    let config = load_or_default()?;

    let parsed_value: Value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    let mut json = serde_json::to_value(&config)?;

    let (parent_key, field) = match key.rsplit_once('.') {
        Some((parent, field)) => (Some(parent), field),
        None => (None, key),
    };

    let parent = match parent_key {
        Some(path) => path
            .split('.')
            .try_fold(&mut json, |current, part| current.get_mut(part))
            .ok_or_else(|| anyhow::anyhow!("Configuration path not found: {}", key))?,
        None => &mut json,
    };

    let Some(object) = parent.as_object_mut() else {
        anyhow::bail!("Cannot set value at non-object path");
    };
    if !object.contains_key(field) {
        anyhow::bail!("Configuration key not found: {}", key);
    }
    object.insert(field.to_string(), parsed_value.clone());

    let config: DespaConfig = serde_json::from_value(json)
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    config.save(&config_path)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&parsed_value)?
    );

    Ok(())
}

fn show_path() -> anyhow::Result<()> {
    let config_path = default_config_path();

    println!("Configuration file: {}", config_path.display());

    if config_path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'despa config init' to create a configuration file.");
    }

    Ok(())
}
