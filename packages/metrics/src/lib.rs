#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Derived metrics engine.
//!
//! Pure functions over the joined district table: densities, the transit
//! total, transit per capita, and the scarcity rank. Nothing here reads
//! I/O or caches, so every run recomputes from the joined counts.

use seoul_transit_district_models::{DistrictMetrics, RankBasis, RankMethod};

/// `count / area`, or `0` when `area` is zero, negative, or not finite.
///
/// Never returns NaN or infinity for finite `count`.
#[must_use]
pub fn density(count: f64, area: f64) -> f64 {
    if area <= 0.0 || !area.is_finite() {
        return 0.0;
    }
    count / area
}

/// `transit / max(population, 1)`.
#[must_use]
pub fn per_capita(transit: f64, population: f64) -> f64 {
    transit / population.max(1.0)
}

/// Ranks `values` ascending, 1 = smallest.
///
/// Equal values share the smaller rank. With [`RankMethod::Dense`] the
/// next distinct value gets the next integer; with [`RankMethod::Min`] it
/// gets one more than the number of strictly smaller values.
#[must_use]
pub fn rank(values: &[f64], method: RankMethod) -> Vec<u32> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    if method == RankMethod::Dense {
        sorted.dedup_by(|a, b| a.total_cmp(b).is_eq());
    }

    values
        .iter()
        .map(|v| {
            let smaller = sorted.partition_point(|s| s.total_cmp(v).is_lt());
            u32::try_from(smaller + 1).unwrap_or(u32::MAX)
        })
        .collect()
}

/// Fills every derived column of `rows` from their count columns and ranks
/// them over `basis`.
pub fn derive_metrics(rows: &mut [DistrictMetrics], basis: RankBasis, method: RankMethod) {
    for row in rows.iter_mut() {
        row.population_density = density(row.population_count, row.area_km2);
        row.bus_density = density(row.bus_count, row.area_km2);
        row.subway_density = density(row.subway_count, row.area_km2);
        row.transit_total_count = row.bus_count + row.subway_count;
        row.transit_density = density(row.transit_total_count, row.area_km2);
        row.transit_per_capita = per_capita(row.transit_total_count, row.population_count);
    }

    let values: Vec<f64> = rows.iter().map(|r| r.rank_value(basis)).collect();
    for (row, rank) in rows.iter_mut().zip(rank(&values, method)) {
        row.scarcity_rank = rank;
    }

    log::debug!("Derived metrics for {} districts ranked by {basis}", rows.len());
}

/// The `n` most transit-scarce rows, by rank then table order.
#[must_use]
pub fn most_underserved(table: &[DistrictMetrics], n: usize) -> Vec<&DistrictMetrics> {
    let mut sorted: Vec<&DistrictMetrics> = table.iter().collect();
    // Stable sort keeps table order within a rank.
    sorted.sort_by_key(|row| row.scarcity_rank);
    sorted.truncate(n);
    sorted
}
