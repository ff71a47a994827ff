#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tabular metric joiner.
//!
//! A tabular source (resident population, commercial facilities) may list
//! a district on many rows, for example one row per dong or per quarter.
//! Each source is reduced to one value per district by arithmetic mean,
//! then left-joined onto the district table. Districts the source does not
//! cover receive `0` and a [`DataQualityWarning::ZeroFilled`].

use std::collections::BTreeMap;

use seoul_transit_district_models::{CountColumn, DataQualityWarning, DistrictMetrics};
use seoul_transit_source::SourceError;
use seoul_transit_source::columns::resolve_column;
use seoul_transit_source::fetch::Fetcher;
use seoul_transit_source::parsing::parse_number;
use seoul_transit_source::table::CsvTable;
use seoul_transit_source_models::TabularSource;
use thiserror::Error;

/// Errors that can occur while loading a tabular source.
#[derive(Debug, Error)]
pub enum TabularError {
    /// The source could not be read, or lacks its key or value column.
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// One source reduced to a single value per matched district.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedColumn {
    /// Source identifier.
    pub source_id: String,
    /// The count column the values belong in.
    pub column: CountColumn,
    /// Mean value per canonical district the source mentions.
    pub values: BTreeMap<String, f64>,
}

/// A reduced source plus the findings recorded while reducing it.
#[derive(Debug, Clone)]
pub struct TabularLoad {
    /// Per-district values.
    pub reduced: ReducedColumn,
    /// Unmatched names plus coerced and negative values.
    pub warnings: Vec<DataQualityWarning>,
}

/// Fetches and reduces a tabular source.
///
/// # Errors
///
/// Returns [`TabularError`] if the source cannot be read or lacks its key
/// or value column.
pub fn load_tabular(
    source: &TabularSource,
    canonical: &[String],
    fetcher: &Fetcher,
) -> Result<TabularLoad, TabularError> {
    log::info!("[{}] Loading table from {}", source.id, source.location);

    let bytes = fetcher.fetch(&source.location)?;
    let table = CsvTable::parse(&bytes, source.delimiter)?;

    reduce_table(source, &table, canonical)
}

/// Reduces a parsed table to the arithmetic mean per canonical district.
///
/// Key cells are trimmed and compared exactly against `canonical`. Rows
/// naming anything else are dropped with one
/// [`DataQualityWarning::UnmatchedName`] per distinct name. Value cells
/// that do not parse as numbers are dropped with a
/// [`DataQualityWarning::CoercedValue`], and negative counts with a
/// [`DataQualityWarning::NegativeValue`].
///
/// # Errors
///
/// Returns [`TabularError::Source`] wrapping a schema error if no key or
/// value column candidate is present.
pub fn reduce_table(
    source: &TabularSource,
    table: &CsvTable,
    canonical: &[String],
) -> Result<TabularLoad, TabularError> {
    let key_idx = resolve_column(&table.headers, &source.key_columns, "district key")?;
    let value_idx = resolve_column(&table.headers, &source.value_columns, "value")?;

    log::debug!(
        "[{}] key column '{}', value column '{}'",
        source.id,
        table.headers[key_idx],
        table.headers[value_idx]
    );

    let mut sums: BTreeMap<String, (f64, u64)> = BTreeMap::new();
    let mut unmatched: BTreeMap<String, u64> = BTreeMap::new();
    let mut warnings = Vec::new();

    for (i, row) in table.rows.iter().enumerate() {
        let name = row.get(key_idx).unwrap_or_default().trim();
        if !canonical.iter().any(|c| c == name) {
            *unmatched.entry(name.to_string()).or_default() += 1;
            continue;
        }

        let raw = row.get(value_idx).unwrap_or_default();
        let Some(value) = parse_number(raw) else {
            warnings.push(DataQualityWarning::CoercedValue {
                source_id: source.id.clone(),
                row: i as u64 + 1,
                value: raw.to_string(),
            });
            continue;
        };
        if value < 0.0 {
            warnings.push(DataQualityWarning::NegativeValue {
                source_id: source.id.clone(),
                row: i as u64 + 1,
                value,
            });
            continue;
        }

        let entry = sums.entry(name.to_string()).or_default();
        entry.0 += value;
        entry.1 += 1;
    }

    let dropped = warnings.len();
    warnings.extend(
        unmatched
            .into_iter()
            .map(|(name, rows)| DataQualityWarning::UnmatchedName {
                source_id: source.id.clone(),
                name,
                rows,
            }),
    );

    #[allow(clippy::cast_precision_loss)]
    let values: BTreeMap<String, f64> = sums
        .into_iter()
        .map(|(name, (sum, n))| (name, sum / n as f64))
        .collect();

    log::info!(
        "[{}] reduced {} rows to {} districts ({} unmatched names, {dropped} dropped values)",
        source.id,
        table.rows.len(),
        values.len(),
        warnings.len() - dropped
    );

    Ok(TabularLoad {
        reduced: ReducedColumn {
            source_id: source.id.clone(),
            column: source.column,
            values,
        },
        warnings,
    })
}

/// Left-joins a reduced column onto the district table.
///
/// Every row receives a value. Rows the column does not cover get `0` and
/// a [`DataQualityWarning::ZeroFilled`]. Each call writes only
/// `reduced.column`, so joins of different columns commute.
pub fn left_join(rows: &mut [DistrictMetrics], reduced: &ReducedColumn) -> Vec<DataQualityWarning> {
    let mut warnings = Vec::new();

    for row in rows.iter_mut() {
        let value = reduced.values.get(&row.name).copied().unwrap_or_else(|| {
            warnings.push(DataQualityWarning::ZeroFilled {
                source_id: reduced.source_id.clone(),
                column: reduced.column,
                district: row.name.clone(),
            });
            0.0
        });
        row.set_count(reduced.column, value);
    }

    if !warnings.is_empty() {
        log::warn!(
            "[{}] {} districts had no {} value and were zero-filled",
            reduced.source_id,
            warnings.len(),
            reduced.column
        );
    }

    warnings
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use seoul_transit_source_models::SourceLocation;

    use super::*;

    fn canonical(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    fn population_source() -> TabularSource {
        TabularSource {
            id: "population".to_string(),
            column: CountColumn::Population,
            location: SourceLocation::Path {
                path: PathBuf::from("population.csv"),
            },
            key_columns: vec!["자치구".to_string(), "gu".to_string()],
            value_columns: vec!["인구".to_string(), "population".to_string()],
            delimiter: None,
        }
    }

    fn table(csv: &str) -> CsvTable {
        CsvTable::parse(csv.as_bytes(), None).unwrap()
    }

    fn rows(names: &[&str]) -> Vec<DistrictMetrics> {
        names.iter().map(|n| DistrictMetrics::new(n, 1.0)).collect()
    }

    #[test]
    fn reduces_by_mean_not_sum() {
        let t = table("자치구,인구\n중구,100\n중구,300\n종로구,50\n");
        let load = reduce_table(&population_source(), &t, &canonical(&["종로구", "중구"])).unwrap();
        assert!((load.reduced.values["중구"] - 200.0).abs() < f64::EPSILON);
        assert!((load.reduced.values["종로구"] - 50.0).abs() < f64::EPSILON);
        assert!(load.warnings.is_empty());
    }

    #[test]
    fn trims_keys_and_reports_unmatched_names_once() {
        let t = table("gu,population\n  중구 ,10\n합계,999\n합계,999\nJung-gu,5\n");
        let load = reduce_table(&population_source(), &t, &canonical(&["중구"])).unwrap();

        assert_eq!(load.reduced.values.len(), 1);
        assert!((load.reduced.values["중구"] - 10.0).abs() < f64::EPSILON);
        assert_eq!(
            load.warnings,
            vec![
                DataQualityWarning::UnmatchedName {
                    source_id: "population".to_string(),
                    name: "Jung-gu".to_string(),
                    rows: 1,
                },
                DataQualityWarning::UnmatchedName {
                    source_id: "population".to_string(),
                    name: "합계".to_string(),
                    rows: 2,
                },
            ]
        );
    }

    #[test]
    fn coerces_thousands_separators_and_drops_garbage() {
        let t = table("자치구,인구\n중구,\"1,200\"\n중구,n/a\n");
        let load = reduce_table(&population_source(), &t, &canonical(&["중구"])).unwrap();

        assert!((load.reduced.values["중구"] - 1200.0).abs() < f64::EPSILON);
        assert_eq!(
            load.warnings,
            vec![DataQualityWarning::CoercedValue {
                source_id: "population".to_string(),
                row: 2,
                value: "n/a".to_string(),
            }]
        );
    }

    #[test]
    fn drops_negative_counts() {
        let t = table("gu,population\nA,-100\nA,300\nB,200\n");
        let load = reduce_table(&population_source(), &t, &canonical(&["A", "B"])).unwrap();

        assert!((load.reduced.values["A"] - 300.0).abs() < f64::EPSILON);
        assert!(load.reduced.values.values().all(|v| *v >= 0.0));
        assert_eq!(
            load.warnings,
            vec![DataQualityWarning::NegativeValue {
                source_id: "population".to_string(),
                row: 1,
                value: -100.0,
            }]
        );
    }

    #[test]
    fn missing_value_column_is_schema_error() {
        let t = table("자치구,세대수\n중구,10\n");
        let err = reduce_table(&population_source(), &t, &canonical(&["중구"])).unwrap_err();
        let TabularError::Source(inner) = err;
        assert!(inner.is_schema());
    }

    #[test]
    fn left_join_zero_fills_uncovered_districts() {
        let names = ["A", "B", "C", "D", "E"];
        let t = table("gu,population\nA,1\nB,2\nC,3\n");
        let load = reduce_table(&population_source(), &t, &canonical(&names)).unwrap();

        let mut table_rows = rows(&names);
        let warnings = left_join(&mut table_rows, &load.reduced);

        assert_eq!(table_rows.len(), names.len());
        assert!((table_rows[3].population_count).abs() < f64::EPSILON);
        assert!((table_rows[4].population_count).abs() < f64::EPSILON);
        assert!((table_rows[2].population_count - 3.0).abs() < f64::EPSILON);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| matches!(
            w,
            DataQualityWarning::ZeroFilled { column: CountColumn::Population, .. }
        )));
    }

    #[test]
    fn joins_commute() {
        let population = ReducedColumn {
            source_id: "population".to_string(),
            column: CountColumn::Population,
            values: BTreeMap::from([("A".to_string(), 100.0), ("B".to_string(), 200.0)]),
        };
        let facilities = ReducedColumn {
            source_id: "facilities".to_string(),
            column: CountColumn::Facility,
            values: BTreeMap::from([("B".to_string(), 7.5)]),
        };

        let mut forward = rows(&["A", "B"]);
        left_join(&mut forward, &population);
        left_join(&mut forward, &facilities);

        let mut backward = rows(&["A", "B"]);
        left_join(&mut backward, &facilities);
        left_join(&mut backward, &population);

        assert_eq!(forward, backward);
        assert!((forward[1].facility_count - 7.5).abs() < f64::EPSILON);
    }
}
