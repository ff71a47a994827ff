#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! District table types shared by every pipeline stage.
//!
//! A [`District`] is the unit of analysis: one Seoul autonomous district
//! (자치구) with its boundary and equal-area size. [`DistrictMetrics`] is
//! the fused, per-district analytical row that the pipeline hands to the
//! dashboard. Columns are populated in stage order and never removed.

pub mod names;
pub mod warning;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use names::{SEOUL_DISTRICTS, is_seoul_district};
pub use warning::DataQualityWarning;

/// One administrative district with its merged boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct District {
    /// Canonical district name (e.g. "강남구").
    pub name: String,
    /// Merged boundary in WGS84 lon/lat.
    pub boundary: MultiPolygon<f64>,
    /// Area in square kilometres, measured under an equal-area projection.
    pub area_km2: f64,
}

/// A count-like column fed by a tabular or point source.
///
/// Each configured source writes exactly one of these columns.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CountColumn {
    /// Resident population.
    Population,
    /// Commercial facilities.
    Facility,
    /// Bus stops.
    Bus,
    /// Subway stations.
    Subway,
}

impl CountColumn {
    /// Every count column, in table order.
    pub const ALL: &[Self] = &[Self::Population, Self::Facility, Self::Bus, Self::Subway];
}

/// The quantity that `scarcity_rank` is computed over.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RankBasis {
    /// `transit_total_count / max(population_count, 1)`.
    #[default]
    TransitPerCapita,
    /// `transit_total_count / area_km2`.
    TransitDensity,
    /// Raw bus stop + subway station count.
    TransitTotalCount,
}

/// How ties and the values after them are ranked.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RankMethod {
    /// Ties share a rank and the next distinct value gets the next integer
    /// (`[5, 5, 2, 8]` ranks as `[2, 2, 1, 3]`).
    #[default]
    Dense,
    /// Ties share a rank and the next distinct value gets
    /// `count_of_smaller + 1` (`[5, 5, 2, 8]` ranks as `[2, 2, 1, 4]`).
    Min,
}

/// The fused analytical row for one district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictMetrics {
    /// Canonical district name.
    pub name: String,
    /// Equal-area size in square kilometres.
    pub area_km2: f64,
    /// Resident population (mean over source rows).
    pub population_count: f64,
    /// Commercial facility count (mean over source rows).
    pub facility_count: f64,
    /// Bus stops inside the district.
    pub bus_count: f64,
    /// Subway stations inside the district.
    pub subway_count: f64,
    /// Residents per square kilometre.
    pub population_density: f64,
    /// Bus stops per square kilometre.
    pub bus_density: f64,
    /// Subway stations per square kilometre.
    pub subway_density: f64,
    /// `bus_count + subway_count`.
    pub transit_total_count: f64,
    /// Transit points per square kilometre.
    pub transit_density: f64,
    /// Transit points per resident (population floored at 1).
    pub transit_per_capita: f64,
    /// 1 = most transit-scarce district.
    pub scarcity_rank: u32,
}

impl DistrictMetrics {
    /// Creates a row with only the area populated.
    #[must_use]
    pub fn new(name: &str, area_km2: f64) -> Self {
        Self {
            name: name.to_string(),
            area_km2,
            population_count: 0.0,
            facility_count: 0.0,
            bus_count: 0.0,
            subway_count: 0.0,
            population_density: 0.0,
            bus_density: 0.0,
            subway_density: 0.0,
            transit_total_count: 0.0,
            transit_density: 0.0,
            transit_per_capita: 0.0,
            scarcity_rank: 0,
        }
    }

    /// Returns the value of a count column.
    #[must_use]
    pub const fn count(&self, column: CountColumn) -> f64 {
        match column {
            CountColumn::Population => self.population_count,
            CountColumn::Facility => self.facility_count,
            CountColumn::Bus => self.bus_count,
            CountColumn::Subway => self.subway_count,
        }
    }

    /// Sets the value of a count column.
    pub const fn set_count(&mut self, column: CountColumn, value: f64) {
        match column {
            CountColumn::Population => self.population_count = value,
            CountColumn::Facility => self.facility_count = value,
            CountColumn::Bus => self.bus_count = value,
            CountColumn::Subway => self.subway_count = value,
        }
    }

    /// Returns the value the scarcity rank is computed over.
    #[must_use]
    pub const fn rank_value(&self, basis: RankBasis) -> f64 {
        match basis {
            RankBasis::TransitPerCapita => self.transit_per_capita,
            RankBasis::TransitDensity => self.transit_density,
            RankBasis::TransitTotalCount => self.transit_total_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn count_columns_round_trip_through_strings() {
        for column in CountColumn::ALL {
            assert_eq!(CountColumn::from_str(column.as_ref()).unwrap(), *column);
        }
        assert_eq!(CountColumn::Population.to_string(), "population");
    }

    #[test]
    fn rank_basis_defaults_to_per_capita() {
        assert_eq!(RankBasis::default(), RankBasis::TransitPerCapita);
        assert_eq!(RankMethod::default(), RankMethod::Dense);
        assert_eq!(
            RankBasis::from_str("transit_density").unwrap(),
            RankBasis::TransitDensity
        );
    }

    #[test]
    fn set_count_writes_the_matching_field() {
        let mut row = DistrictMetrics::new("중구", 9.96);
        row.set_count(CountColumn::Subway, 12.0);
        row.set_count(CountColumn::Population, 120_000.0);
        assert!((row.subway_count - 12.0).abs() < f64::EPSILON);
        assert!((row.count(CountColumn::Population) - 120_000.0).abs() < f64::EPSILON);
        assert!(row.bus_count.abs() < f64::EPSILON);
    }

    #[test]
    fn serializes_with_snake_case_columns() {
        let row = DistrictMetrics::new("중구", 9.96);
        let json = serde_json::to_value(&row).unwrap();
        assert!(json.get("transit_per_capita").is_some());
        assert!(json.get("scarcity_rank").is_some());
    }
}
