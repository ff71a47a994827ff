#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! End-to-end transit scarcity pipeline.
//!
//! Runs the four stages in dependency order:
//!
//! 1. boundaries (fatal on failure)
//! 2. point sources counted per district
//! 3. tabular sources reduced and left-joined
//! 4. derived densities, per-capita ratio, and scarcity rank
//!
//! An optional source that fails does not stop the run. Its column is
//! zero-filled, a [`DataQualityWarning::SourceFailed`] is recorded, and the
//! report is marked [`RunStatus::Degraded`].

pub mod cache;

use std::sync::Arc;
use std::time::Duration;

use seoul_transit_boundary::{BoundaryError, load_boundaries};
use seoul_transit_district_models::{
    CountColumn, DataQualityWarning, DistrictMetrics, RankBasis, RankMethod,
};
use seoul_transit_metrics::{derive_metrics, most_underserved};
use seoul_transit_source::SourceError;
use seoul_transit_source::config::{ConfigError, validate};
use seoul_transit_source::fetch::Fetcher;
use seoul_transit_source::progress::ProgressCallback;
use seoul_transit_source_models::PipelineConfig;
use seoul_transit_spatial::{SpatialIndex, count_source};
use seoul_transit_tabular::{left_join, load_tabular};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub use cache::PipelineCache;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The config failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The boundary stage failed. No district table can be produced.
    #[error("Boundary stage failed: {0}")]
    Boundary(#[from] BoundaryError),
}

/// Outcome of a run that produced a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    /// Every configured source loaded.
    Complete,
    /// At least one optional source failed and its column was zero-filled.
    Degraded,
}

/// The fused district table plus everything needed to interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Config identifier the report was produced from.
    pub config_id: String,
    /// Whether any optional source failed.
    pub status: RunStatus,
    /// Quantity `scarcity_rank` was computed over.
    pub rank_basis: RankBasis,
    /// Tie handling used for `scarcity_rank`.
    pub rank_method: RankMethod,
    /// One row per district with a boundary, in canonical order.
    pub districts: Vec<DistrictMetrics>,
    /// Columns that were zero-filled because their source failed.
    pub degraded_columns: Vec<CountColumn>,
    /// Every non-fatal finding, in stage order.
    pub warnings: Vec<DataQualityWarning>,
}

impl PipelineReport {
    /// Returns the row for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DistrictMetrics> {
        self.districts.iter().find(|row| row.name == name)
    }

    /// The `n` most transit-scarce districts.
    #[must_use]
    pub fn most_underserved(&self, n: usize) -> Vec<&DistrictMetrics> {
        most_underserved(&self.districts, n)
    }

    /// Serializes the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Runs every stage of `config`.
///
/// # Errors
///
/// Returns [`PipelineError`] if the config is invalid or the boundary
/// stage fails. Tabular and point source failures degrade the report
/// instead of failing it.
pub fn run_pipeline(
    config: &PipelineConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<PipelineReport, PipelineError> {
    validate(config)?;

    let canonical = config.canonical_districts();
    let fetcher = Fetcher::new(Duration::from_secs(config.timeout_secs))?;

    let steps = 2 + config.tabular.len() + config.points.len();
    progress.set_total(steps as u64);

    log::info!(
        "Running '{}' over {} canonical districts",
        config.id,
        canonical.len()
    );

    // Stage 1: boundaries
    progress.set_message("boundaries".to_string());
    let boundary = load_boundaries(
        &config.boundary,
        &canonical,
        &config.area_projection,
        &fetcher,
    )?;
    progress.inc(1);

    let mut warnings = boundary.warnings;
    let mut degraded_columns = Vec::new();
    let mut rows: Vec<DistrictMetrics> = boundary
        .districts
        .iter()
        .map(|district| DistrictMetrics::new(&district.name, district.area_km2))
        .collect();

    // Stage 2: point counts
    let index = SpatialIndex::new(&boundary.districts);
    for source in &config.points {
        progress.set_message(source.id.clone());
        match count_source(source, &index, &fetcher) {
            Ok(result) => {
                for row in &mut rows {
                    #[allow(clippy::cast_precision_loss)]
                    let count = result.counts.get(&row.name).unwrap_or(0) as f64;
                    row.set_count(source.column, count);
                }
                warnings.extend(result.warnings);
            }
            Err(e) => degrade(
                &mut rows,
                &mut warnings,
                &mut degraded_columns,
                &source.id,
                source.column,
                &e,
            ),
        }
        progress.inc(1);
    }

    // Stage 3: tabular joins
    for source in &config.tabular {
        progress.set_message(source.id.clone());
        match load_tabular(source, &canonical, &fetcher) {
            Ok(load) => {
                warnings.extend(load.warnings);
                warnings.extend(left_join(&mut rows, &load.reduced));
            }
            Err(e) => degrade(
                &mut rows,
                &mut warnings,
                &mut degraded_columns,
                &source.id,
                source.column,
                &e,
            ),
        }
        progress.inc(1);
    }

    // Stage 4: derived metrics
    progress.set_message("metrics".to_string());
    derive_metrics(&mut rows, config.rank_basis, config.rank_method);
    progress.inc(1);

    let status = if degraded_columns.is_empty() {
        RunStatus::Complete
    } else {
        RunStatus::Degraded
    };

    log::info!(
        "'{}' finished {status}: {} districts, {} warnings",
        config.id,
        rows.len(),
        warnings.len()
    );
    progress.finish(format!("{} districts ({status})", rows.len()));

    Ok(PipelineReport {
        config_id: config.id.clone(),
        status,
        rank_basis: config.rank_basis,
        rank_method: config.rank_method,
        districts: rows,
        degraded_columns,
        warnings,
    })
}

fn degrade(
    rows: &mut [DistrictMetrics],
    warnings: &mut Vec<DataQualityWarning>,
    degraded_columns: &mut Vec<CountColumn>,
    source_id: &str,
    column: CountColumn,
    error: &dyn std::error::Error,
) {
    log::warn!("[{source_id}] source failed, {column} zero-filled: {error}");

    for row in rows.iter_mut() {
        row.set_count(column, 0.0);
    }
    warnings.push(DataQualityWarning::SourceFailed {
        source_id: source_id.to_string(),
        column,
        message: error.to_string(),
    });
    degraded_columns.push(column);
}


#[cfg(test)]
mod tests {
    use seoul_transit_source::progress::null_progress;
    use seoul_transit_source_models::{PointFormat, PointSource, SourceLocation};

    use super::fixtures::write_fixture;
    use super::*;

    fn close(actual: f64, expected: f64, tolerance: f64) -> bool {
        (actual - expected).abs() <= tolerance
    }

    #[test]
    fn end_to_end_two_districts() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path());

        let report = run_pipeline(&config, &null_progress()).unwrap();
        assert_eq!(report.status, RunStatus::Complete);
        assert_eq!(report.districts.len(), 2);

        let a = report.get("A").unwrap();
        let b = report.get("B").unwrap();

        assert!(close(a.area_km2, 10.0, 1e-3), "A area {}", a.area_km2);
        assert!(close(b.area_km2, 20.0, 1e-3), "B area {}", b.area_km2);
        assert!(close(a.population_density, 10.0, 1e-3));
        assert!(close(b.population_density, 10.0, 1e-3));
        assert!(close(a.bus_count, 5.0, f64::EPSILON));
        assert!(close(b.bus_count, 10.0, f64::EPSILON));
        assert!(close(a.bus_density, 0.5, 1e-3));
        assert!(close(b.bus_density, 0.5, 1e-3));

        // Subway and facility have no source; the one outside point is
        // reported.
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            DataQualityWarning::PointsOutside { dropped: 1, .. }
        )));
        assert_eq!(report.most_underserved(1)[0].scarcity_rank, 1);
    }

    #[derive(Default)]
    struct RecordingProgress {
        total: std::sync::atomic::AtomicU64,
        done: std::sync::atomic::AtomicU64,
        stages: std::sync::Mutex<Vec<String>>,
    }

    impl ProgressCallback for RecordingProgress {
        fn set_total(&self, total: u64) {
            self.total.store(total, std::sync::atomic::Ordering::SeqCst);
        }

        fn inc(&self, delta: u64) {
            self.done.fetch_add(delta, std::sync::atomic::Ordering::SeqCst);
        }

        fn set_message(&self, msg: String) {
            self.stages.lock().unwrap().push(msg);
        }

        fn finish(&self, _msg: String) {}
    }

    #[test]
    fn reports_one_stage_per_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path());
        let recorder = Arc::new(RecordingProgress::default());
        let progress: Arc<dyn ProgressCallback> = recorder.clone();

        run_pipeline(&config, &progress).unwrap();

        let total = recorder.total.load(std::sync::atomic::Ordering::SeqCst);
        assert_eq!(total, 4);
        assert_eq!(recorder.done.load(std::sync::atomic::Ordering::SeqCst), total);
        assert_eq!(
            *recorder.stages.lock().unwrap(),
            vec!["boundaries", "bus_stops", "population", "metrics"]
        );
    }

    #[test]
    fn identical_inputs_give_identical_json() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path());

        let first = run_pipeline(&config, &null_progress()).unwrap();
        let second = run_pipeline(&config, &null_progress()).unwrap();
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn missing_optional_source_degrades_its_column() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_fixture(dir.path());
        config.points.push(PointSource {
            id: "subway_stations".to_string(),
            column: CountColumn::Subway,
            location: SourceLocation::Path {
                path: dir.path().join("does_not_exist.csv"),
            },
            format: PointFormat::Csv,
            x_columns: vec!["x".to_string()],
            y_columns: vec!["y".to_string()],
            crs: None,
            delimiter: None,
        });

        let report = run_pipeline(&config, &null_progress()).unwrap();
        assert_eq!(report.status, RunStatus::Degraded);
        assert_eq!(report.degraded_columns, vec![CountColumn::Subway]);
        assert!(report.districts.iter().all(|r| r.subway_count == 0.0));
        assert!(close(report.get("A").unwrap().bus_count, 5.0, f64::EPSILON));
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            DataQualityWarning::SourceFailed { column: CountColumn::Subway, .. }
        )));
    }

    #[test]
    fn uncovered_district_is_zero_filled() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path());
        std::fs::write(dir.path().join("population.csv"), "gu,population\nA,100\n").unwrap();

        let report = run_pipeline(&config, &null_progress()).unwrap();
        assert_eq!(report.status, RunStatus::Complete);
        assert!(report.get("B").unwrap().population_count == 0.0);
        assert!(report.warnings.contains(&DataQualityWarning::ZeroFilled {
            source_id: "population".to_string(),
            column: CountColumn::Population,
            district: "B".to_string(),
        }));
    }

    #[test]
    fn negative_population_never_yields_negative_density() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path());
        std::fs::write(
            dir.path().join("population.csv"),
            "gu,population\nA,-100\nB,200\n",
        )
        .unwrap();

        let report = run_pipeline(&config, &null_progress()).unwrap();
        assert!(report.districts.iter().all(|r| {
            r.population_density >= 0.0 && r.bus_density >= 0.0 && r.subway_density >= 0.0
        }));
        assert!(report.get("A").unwrap().population_count == 0.0);
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            DataQualityWarning::NegativeValue { row: 1, .. }
        )));
        assert!(report.warnings.contains(&DataQualityWarning::ZeroFilled {
            source_id: "population".to_string(),
            column: CountColumn::Population,
            district: "A".to_string(),
        }));
    }

    #[test]
    fn boundary_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path());
        std::fs::remove_file(dir.path().join("boundaries.geojson")).unwrap();

        let err = run_pipeline(&config, &null_progress()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Boundary(BoundaryError::Source(SourceError::Unavailable { .. }))
        ));
    }

    #[test]
    fn boundary_without_name_column_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_fixture(dir.path());
        config.boundary.name_columns = vec!["SIG_KOR_NM".to_string()];

        let err = run_pipeline(&config, &null_progress()).unwrap_err();
        match err {
            PipelineError::Boundary(inner) => assert!(inner.is_schema()),
            other => panic!("expected boundary error, got {other}"),
        }
    }

    #[test]
    fn report_serializes_snake_case() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path());
        let report = run_pipeline(&config, &null_progress()).unwrap();

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "complete");
        assert_eq!(json["rank_basis"], "transit_per_capita");
        assert_eq!(json["districts"][0]["name"], "A");
        assert!(json["districts"][0]["transit_per_capita"].is_number());
    }
}
