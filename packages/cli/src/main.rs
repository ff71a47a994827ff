#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the Seoul transit scarcity pipeline.
//!
//! Runs a built-in or file-based pipeline config and prints the fused
//! district table (or its JSON) plus every data-quality warning. With no
//! subcommand it falls back to an interactive `dialoguer` menu.
//!
//! Uses `indicatif-log-bridge` (via [`seoul_transit_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod interactive;
mod render;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use seoul_transit_cli_utils::{IndicatifProgress, MultiProgress};
use seoul_transit_district_models::SEOUL_DISTRICTS;
use seoul_transit_pipeline::run_pipeline;
use seoul_transit_source::config::load_config;
use seoul_transit_source::registry::{all_configs, find_config};
use seoul_transit_source_models::PipelineConfig;

/// Built-in config used when neither `--config` nor `--builtin` is given.
const DEFAULT_BUILTIN: &str = "seoul";

#[derive(Parser)]
#[command(name = "seoul_transit", about = "Seoul district transit scarcity pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline and print the district table
    Run {
        /// Path to a pipeline config TOML file
        #[arg(long, conflicts_with = "builtin")]
        config: Option<PathBuf>,
        /// Identifier of a built-in config (e.g., "seoul")
        #[arg(long)]
        builtin: Option<String>,
        /// Print the full report as JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Only show the N most underserved districts
        #[arg(long)]
        top: Option<usize>,
    },
    /// List the canonical Seoul district names
    Districts,
    /// List the built-in pipeline configs
    Configs,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = seoul_transit_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&multi);
    };

    match command {
        Commands::Run {
            config,
            builtin,
            json,
            top,
        } => {
            let config = resolve_config(config.as_deref(), builtin.as_deref())?;
            run_and_print(&multi, &config, json, top)?;
        }
        Commands::Districts => list_districts(),
        Commands::Configs => list_configs(),
    }

    Ok(())
}

/// Loads the config named on the command line.
fn resolve_config(
    path: Option<&Path>,
    builtin: Option<&str>,
) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(load_config(path)?);
    }

    let id = builtin.unwrap_or(DEFAULT_BUILTIN);
    let config = find_config(id).ok_or_else(|| format!("Unknown built-in config '{id}'"))?;
    log::info!("Using built-in config '{}' ({})", config.id, config.name);
    Ok(config)
}

/// Runs `config` with a progress bar and prints the result.
fn run_and_print(
    multi: &MultiProgress,
    config: &PipelineConfig,
    json: bool,
    top: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::stages_bar(multi, &config.name);
    let report = run_pipeline(config, &progress)?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        println!();
        print!("{}", render::format_table(&report, top));
        println!();
        print!("{}", render::format_summary(&report));
    }

    Ok(())
}

fn list_districts() {
    for (i, name) in SEOUL_DISTRICTS.iter().enumerate() {
        println!("{:>2}  {name}", i + 1);
    }
}

fn list_configs() {
    let configs = all_configs();
    println!("{:<20} NAME", "ID");
    println!("{}", "-".repeat(50));
    for config in &configs {
        println!("{:<20} {}", config.id, config.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "seoul_transit",
            "run",
            "--builtin",
            "seoul",
            "--json",
            "--top",
            "5",
        ])
        .unwrap();
        let Some(Commands::Run {
            config,
            builtin,
            json,
            top,
        }) = cli.command
        else {
            panic!("expected run");
        };
        assert!(config.is_none());
        assert_eq!(builtin.as_deref(), Some("seoul"));
        assert!(json);
        assert_eq!(top, Some(5));
    }

    #[test]
    fn config_and_builtin_conflict() {
        assert!(
            Cli::try_parse_from([
                "seoul_transit",
                "run",
                "--config",
                "a.toml",
                "--builtin",
                "seoul",
            ])
            .is_err()
        );
    }

    #[test]
    fn no_subcommand_is_interactive() {
        let cli = Cli::try_parse_from(["seoul_transit"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn resolves_default_builtin() {
        let config = resolve_config(None, None).unwrap();
        assert_eq!(config.id, DEFAULT_BUILTIN);
        assert!(resolve_config(None, Some("busan")).is_err());
    }
}
