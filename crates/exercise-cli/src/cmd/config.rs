use super::load_config;
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use exercise_core::config::{ExerciseConfig, CONFIG_FILE_NAME};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration (file values over defaults)
    Show,

    /// Check the configuration for values a run would reject
    Validate,

    /// Write a default exercise.yaml into the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(config_path: Option<&Path>, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(config_path, json),
        ConfigSubcommand::Validate => validate(config_path, json),
        ConfigSubcommand::Init { force } => init(force),
    }
}

fn show(config_path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    if json {
        return print_json(&config);
    }
    match config_path {
        Some(path) => println!("# {}", path.display()),
        None => println!("# built-in defaults"),
    }
    print!("{}", config.to_yaml()?);
    Ok(())
}

fn validate(config_path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let problem = config
        .validate()
        .and_then(|_| config.resolve_location().map(|_| ()))
        .err()
        .map(|e| e.to_string());

    if json {
        print_json(&serde_json::json!({
            "valid": problem.is_none(),
            "error": problem,
        }))?;
    } else if problem.is_none() {
        println!("Config OK.");
    }
    match problem {
        Some(p) => anyhow::bail!("invalid config: {p}"),
        None => Ok(()),
    }
}

fn init(force: bool) -> anyhow::Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);
    if path.exists() && !force {
        anyhow::bail!("{CONFIG_FILE_NAME} already exists (use --force to overwrite)");
    }
    let yaml = ExerciseConfig::default().to_yaml()?;
    std::fs::write(path, yaml).with_context(|| format!("failed to write {CONFIG_FILE_NAME}"))?;
    println!("Wrote {CONFIG_FILE_NAME}");
    Ok(())
}
