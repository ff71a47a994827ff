//! Interactive menu for the seoul transit CLI.
//!
//! Lets users pick a config and output format without memorizing flags.

use std::path::Path;

use dialoguer::{Confirm, Input, Select};
use seoul_transit_cli_utils::MultiProgress;
use seoul_transit_source::config::load_config;
use seoul_transit_source::registry::all_configs;

use crate::{list_configs, list_districts, run_and_print};

/// Top-level actions available in the interactive menu.
enum Action {
    RunBuiltin,
    RunFile,
    ListDistricts,
    ListConfigs,
}

impl Action {
    const ALL: &[Self] = &[
        Self::RunBuiltin,
        Self::RunFile,
        Self::ListDistricts,
        Self::ListConfigs,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::RunBuiltin => "Run a built-in config",
            Self::RunFile => "Run a config file",
            Self::ListDistricts => "List districts",
            Self::ListConfigs => "List built-in configs",
        }
    }
}

/// Runs the interactive menu.
///
/// # Errors
///
/// Returns an error if a prompt fails, the config cannot be loaded, or the
/// pipeline fails.
pub fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("Seoul Transit Scarcity");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::RunBuiltin => {
            let configs = all_configs();
            let names: Vec<String> = configs
                .iter()
                .map(|c| format!("{} ({})", c.name, c.id))
                .collect();
            let choice = Select::new()
                .with_prompt("Config")
                .items(&names)
                .default(0)
                .interact()?;
            let (json, top) = prompt_output()?;
            run_and_print(multi, &configs[choice], json, top)?;
        }
        Action::RunFile => {
            let path: String = Input::new()
                .with_prompt("Config file path")
                .interact_text()?;
            let config = load_config(Path::new(path.trim()))?;
            let (json, top) = prompt_output()?;
            run_and_print(multi, &config, json, top)?;
        }
        Action::ListDistricts => list_districts(),
        Action::ListConfigs => list_configs(),
    }

    Ok(())
}

/// Asks for the output format and an optional top-N limit.
fn prompt_output() -> Result<(bool, Option<usize>), Box<dyn std::error::Error>> {
    let json = Confirm::new()
        .with_prompt("Print JSON instead of a table?")
        .default(false)
        .interact()?;
    if json {
        return Ok((true, None));
    }

    let top: usize = Input::new()
        .with_prompt("Show only the N most underserved districts (0 = all)")
        .default(0)
        .interact_text()?;

    Ok((false, (top > 0).then_some(top)))
}
