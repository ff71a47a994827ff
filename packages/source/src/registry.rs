//! Config registry: loads built-in pipeline configs embedded at compile time.
//!
//! Each `.toml` file in `packages/source/configs/` is baked into the
//! binary via [`include_str!`]. Adding a new built-in config is as simple
//! as creating a new TOML file and adding it to the list below.

use seoul_transit_source_models::PipelineConfig;

use crate::config::parse_config;

/// Number of embedded configs. Enforced by a test.
#[cfg(test)]
const EXPECTED_CONFIG_COUNT: usize = 1;

/// TOML configs embedded at compile time.
const CONFIG_TOMLS: &[(&str, &str)] = &[("seoul", include_str!("../configs/seoul.toml"))];

/// Returns all embedded pipeline configs.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse or validate. Since
/// these are compile-time constants, failures indicate a development
/// error and are caught by the tests below.
#[must_use]
pub fn all_configs() -> Vec<PipelineConfig> {
    CONFIG_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            parse_config(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse embedded config '{name}': {e}"))
        })
        .collect()
}

/// Returns the embedded config with the given id.
#[must_use]
pub fn find_config(id: &str) -> Option<PipelineConfig> {
    all_configs().into_iter().find(|config| config.id == id)
}
