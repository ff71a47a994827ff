//! Plain-text rendering of pipeline reports.

use std::fmt::Write as _;

use console::{Alignment, pad_str, style};
use seoul_transit_district_models::{DataQualityWarning, DistrictMetrics};
use seoul_transit_pipeline::{PipelineReport, RunStatus};

/// Display width of the district column. Korean names render two cells per
/// syllable.
const NAME_WIDTH: usize = 10;

/// Total width of a table row.
const TABLE_WIDTH: usize = 4 + NAME_WIDTH + 8 + 10 + 6 + 6 + 11 + 14 + 2 * 7;

/// Renders the district table. With `top`, only the `top` most underserved
/// districts are shown, most scarce first.
#[must_use]
pub fn format_table(report: &PipelineReport, top: Option<usize>) -> String {
    let rows: Vec<&DistrictMetrics> = top.map_or_else(
        || report.districts.iter().collect(),
        |n| report.most_underserved(n),
    );

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {}  {:>8}  {:>10}  {:>6}  {:>6}  {:>11}  {:>14}",
        "RANK",
        pad_str("DISTRICT", NAME_WIDTH, Alignment::Left, None),
        "AREA_KM2",
        "POPULATION",
        "BUS",
        "SUBWAY",
        "TRANSIT/KM2",
        "TRANSIT/1K POP"
    );
    let _ = writeln!(out, "{}", "-".repeat(TABLE_WIDTH));

    for row in rows {
        let _ = writeln!(
            out,
            "{:>4}  {}  {:>8.2}  {:>10.0}  {:>6.0}  {:>6.0}  {:>11.2}  {:>14.3}",
            row.scarcity_rank,
            pad_str(&row.name, NAME_WIDTH, Alignment::Left, None),
            row.area_km2,
            row.population_count,
            row.bus_count,
            row.subway_count,
            row.transit_density,
            row.transit_per_capita * 1000.0
        );
    }

    out
}

/// Renders the run status line and every warning.
#[must_use]
pub fn format_summary(report: &PipelineReport) -> String {
    let mut out = String::new();

    let status = match report.status {
        RunStatus::Complete => style(report.status.as_ref()).green(),
        RunStatus::Degraded => style(report.status.as_ref()).yellow(),
    };
    let _ = writeln!(
        out,
        "Status: {status} ({} districts, ranked by {} / {})",
        report.districts.len(),
        report.rank_basis,
        report.rank_method
    );

    if !report.degraded_columns.is_empty() {
        let columns: Vec<&str> = report
            .degraded_columns
            .iter()
            .map(AsRef::<str>::as_ref)
            .collect();
        let _ = writeln!(out, "Degraded columns: {}", columns.join(", "));
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "Warnings ({}):", report.warnings.len());
        for (source, warnings) in group_by_source(&report.warnings) {
            let _ = writeln!(out, "  {source}:");
            for warning in warnings {
                let _ = writeln!(out, "    - {warning}");
            }
        }
    }

    out
}

/// Groups warnings by originating source, keeping first-seen source order.
/// Warnings without a source are listed under `boundary`.
fn group_by_source(warnings: &[DataQualityWarning]) -> Vec<(&str, Vec<&DataQualityWarning>)> {
    let mut groups: Vec<(&str, Vec<&DataQualityWarning>)> = Vec::new();

    for warning in warnings {
        let source = warning.source_id().unwrap_or("boundary");
        match groups.iter_mut().find(|(s, _)| *s == source) {
            Some((_, list)) => list.push(warning),
            None => groups.push((source, vec![warning])),
        }
    }

    groups
}
