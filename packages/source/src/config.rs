//! Loading and validating [`PipelineConfig`] files.

use std::collections::BTreeSet;
use std::path::Path;

use seoul_transit_source_models::PipelineConfig;
use thiserror::Error;

/// Errors that can occur while loading a pipeline config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Config file path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config is not valid TOML for [`PipelineConfig`].
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config parsed but is inconsistent.
    #[error("Invalid config '{id}': {message}")]
    Invalid {
        /// Config identifier.
        id: String,
        /// Description of the problem.
        message: String,
    },
}

/// Parses and validates a config from TOML text.
///
/// # Errors
///
/// Returns [`ConfigError`] if the text does not parse or fails
/// [`validate`].
pub fn parse_config(toml_str: &str) -> Result<PipelineConfig, ConfigError> {
    let config: PipelineConfig = toml::de::from_str(toml_str)?;
    validate(&config)?;
    Ok(config)
}

/// Reads a config file and resolves relative source paths against the
/// file's directory.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, parsed, or
/// validated.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut config = parse_config(&text)?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    log::info!("Loaded config '{}' from {}", config.id, path.display());
    Ok(config)
}

/// Checks cross-field invariants that serde cannot express.
///
/// - every candidate column list is non-empty
/// - source ids are unique
/// - each count column is written by at most one source
/// - the canonical district list, if given, is non-empty and unique
/// - CSV delimiters are single ASCII characters
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] describing the first violation.
pub fn validate(config: &PipelineConfig) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::Invalid {
        id: config.id.clone(),
        message,
    };

    if config.boundary.name_columns.is_empty() {
        return Err(invalid("boundary.name_columns is empty".to_string()));
    }

    if let Some(districts) = &config.districts {
        if districts.is_empty() {
            return Err(invalid("districts is empty".to_string()));
        }
        let unique: BTreeSet<_> = districts.iter().collect();
        if unique.len() != districts.len() {
            return Err(invalid("districts contains duplicates".to_string()));
        }
    }

    if config.timeout_secs == 0 {
        return Err(invalid("timeout_secs must be positive".to_string()));
    }

    let mut ids = BTreeSet::new();
    let mut columns = BTreeSet::new();

    let check_delimiter = |id: &str, delimiter: Option<char>| match delimiter {
        Some(c) if !c.is_ascii() => Err(invalid(format!(
            "source '{id}' has delimiter '{c}', which is not a single ASCII character"
        ))),
        _ => Ok(()),
    };

    for source in &config.tabular {
        check_delimiter(&source.id, source.delimiter)?;
        if source.key_columns.is_empty() || source.value_columns.is_empty() {
            return Err(invalid(format!(
                "tabular source '{}' needs key_columns and value_columns",
                source.id
            )));
        }
        if !ids.insert(source.id.as_str()) {
            return Err(invalid(format!("duplicate source id '{}'", source.id)));
        }
        if !columns.insert(source.column) {
            return Err(invalid(format!(
                "column '{}' is written by more than one source",
                source.column
            )));
        }
    }

    for source in &config.points {
        check_delimiter(&source.id, source.delimiter)?;
        if source.format == seoul_transit_source_models::PointFormat::Csv
            && (source.x_columns.is_empty() || source.y_columns.is_empty())
        {
            return Err(invalid(format!(
                "point source '{}' needs x_columns and y_columns",
                source.id
            )));
        }
        if !ids.insert(source.id.as_str()) {
            return Err(invalid(format!("duplicate source id '{}'", source.id)));
        }
        if !columns.insert(source.column) {
            return Err(invalid(format!(
                "column '{}' is written by more than one source",
                source.column
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
id = "test"
name = "Test"

[boundary]
location = { type = "path", path = "b.geojson" }
format = "geojson"
name_columns = ["name"]
"#;

    const POPULATION: &str = r#"
[[tabular]]
id = "population"
column = "population"
location = { type = "path", path = "pop.csv" }
key_columns = ["gu"]
value_columns = ["pop"]
"#;

    #[test]
    fn accepts_minimal_config() {
        assert!(parse_config(BASE).is_ok());
    }

    #[test]
    fn rejects_two_sources_for_one_column() {
        let text = format!(
            "{BASE}{POPULATION}\n\
             [[points]]\n\
             id = \"people\"\n\
             column = \"population\"\n\
             location = {{ type = \"path\", path = \"p.csv\" }}\n\
             x_columns = [\"x\"]\n\
             y_columns = [\"y\"]\n"
        );
        let err = parse_config(&text).unwrap_err();
        assert!(err.to_string().contains("more than one source"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let text = format!(
            "{BASE}{POPULATION}\n\
             [[tabular]]\n\
             id = \"population\"\n\
             column = \"facility\"\n\
             location = {{ type = \"path\", path = \"f.csv\" }}\n\
             key_columns = [\"gu\"]\n\
             value_columns = [\"n\"]\n"
        );
        assert!(
            parse_config(&text)
                .unwrap_err()
                .to_string()
                .contains("duplicate source id")
        );
    }

    #[test]
    fn rejects_empty_name_columns() {
        let text = BASE.replace("name_columns = [\"name\"]", "name_columns = []");
        assert!(matches!(
            parse_config(&text),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_csv_points_without_coordinate_columns() {
        let text = format!(
            "{BASE}\n\
             [[points]]\n\
             id = \"bus\"\n\
             column = \"bus\"\n\
             location = {{ type = \"path\", path = \"bus.csv\" }}\n"
        );
        assert!(parse_config(&text).is_err());
    }

    #[test]
    fn rejects_non_ascii_delimiters() {
        let tabular = format!("{BASE}{POPULATION}delimiter = \"；\"\n");
        let err = parse_config(&tabular).unwrap_err();
        assert!(err.to_string().contains("not a single ASCII character"));

        let points = format!(
            "{BASE}\n\
             [[points]]\n\
             id = \"bus\"\n\
             column = \"bus\"\n\
             location = {{ type = \"path\", path = \"bus.csv\" }}\n\
             x_columns = [\"x\"]\n\
             y_columns = [\"y\"]\n\
             delimiter = \"·\"\n"
        );
        assert!(matches!(
            parse_config(&points),
            Err(ConfigError::Invalid { .. })
        ));

        let tab = format!("{BASE}{POPULATION}delimiter = \"\\t\"\n");
        assert!(parse_config(&tab).is_ok());
    }

    #[test]
    fn reports_toml_errors() {
        assert!(matches!(
            parse_config("id = "),
            Err(ConfigError::Parse(_))
        ));
    }
}
