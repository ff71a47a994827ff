#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Point-feature aggregation by district.
//!
//! Loads point sources (bus stops, subway stations), brings them into
//! WGS84, and assigns each point to the district polygon that contains it
//! using an R-tree of district envelopes. The result is one non-negative
//! count per district, zero when no point fell inside.

pub mod points;

use geo::{BoundingRect as _, Contains as _, Intersects as _, MultiPolygon, Point};
use rstar::{AABB, RTree, RTreeObject};
use seoul_transit_boundary::DistrictSet;
use seoul_transit_boundary::projection::ProjectionError;
use seoul_transit_district_models::DataQualityWarning;
use seoul_transit_source::SourceError;
use seoul_transit_source::fetch::Fetcher;
use seoul_transit_source_models::PointSource;
use thiserror::Error;

pub use points::{PointFeature, PointRead};

/// Errors that can occur while reading a point source.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The source could not be read, or lacks coordinate columns.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The source was read but could not be parsed.
    #[error("Point source parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// The source CRS could not be built.
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// A district polygon stored in the R-tree with its canonical position.
struct DistrictEntry {
    order: usize,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for DistrictEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over district boundaries for point-in-polygon lookups.
///
/// Built once per run from the boundary stage's output.
pub struct SpatialIndex {
    names: Vec<String>,
    tree: RTree<DistrictEntry>,
}

impl SpatialIndex {
    /// Builds the index from districts in canonical order.
    #[must_use]
    pub fn new(districts: &DistrictSet) -> Self {
        let entries: Vec<DistrictEntry> = districts
            .iter()
            .enumerate()
            .map(|(order, district)| DistrictEntry {
                order,
                envelope: compute_envelope(&district.boundary),
                polygon: district.boundary.clone(),
            })
            .collect();

        log::debug!("Indexed {} district polygons", entries.len());

        Self {
            names: districts.iter().map(|d| d.name.clone()).collect(),
            tree: RTree::bulk_load(entries),
        }
    }

    /// Returns the canonical position of the district containing the
    /// point.
    ///
    /// Boundaries may have small gaps or overlaps, so assignment is
    /// deterministic:
    ///
    /// 1. a point strictly inside one or more districts goes to the first
    ///    of them in canonical order;
    /// 2. otherwise a point on an edge goes to the first district, in
    ///    canonical order, whose boundary it touches;
    /// 3. otherwise the point belongs to no district.
    #[must_use]
    pub fn locate(&self, lon: f64, lat: f64) -> Option<usize> {
        let point = Point::new(lon, lat);
        let query_env = AABB::from_point([lon, lat]);

        let mut inside: Option<usize> = None;
        let mut on_edge: Option<usize> = None;

        for entry in self.tree.locate_in_envelope_intersecting(&query_env) {
            if entry.polygon.contains(&point) {
                inside = Some(inside.map_or(entry.order, |o| o.min(entry.order)));
            } else if entry.polygon.intersects(&point) {
                on_edge = Some(on_edge.map_or(entry.order, |o| o.min(entry.order)));
            }
        }

        inside.or(on_edge)
    }

    /// Returns the name of the district containing the point.
    #[must_use]
    pub fn locate_name(&self, lon: f64, lat: f64) -> Option<&str> {
        self.locate(lon, lat).map(|i| self.names[i].as_str())
    }

    /// Counts points per district.
    #[must_use]
    pub fn count<'a>(&self, points: impl IntoIterator<Item = &'a PointFeature>) -> PointCounts {
        let mut counts = vec![0u64; self.names.len()];
        let mut outside = 0u64;

        for point in points {
            match self.locate(point.lon, point.lat) {
                Some(i) => counts[i] += 1,
                None => outside += 1,
            }
        }

        PointCounts {
            counts: self.names.iter().cloned().zip(counts).collect(),
            outside,
        }
    }
}

/// Per-district point counts, in canonical order, zero-filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointCounts {
    /// `(district, count)` for every district with a boundary.
    pub counts: Vec<(String, u64)>,
    /// Points that fell outside every district.
    pub outside: u64,
}

impl PointCounts {
    /// Returns the count for a district, or `None` if it has no boundary.
    #[must_use]
    pub fn get(&self, district: &str) -> Option<u64> {
        self.counts
            .iter()
            .find(|(name, _)| name == district)
            .map(|(_, count)| *count)
    }

    /// Total points assigned to some district.
    #[must_use]
    pub fn assigned(&self) -> u64 {
        self.counts.iter().map(|(_, count)| count).sum()
    }
}

/// Result of aggregating one point source.
#[derive(Debug, Clone)]
pub struct SourceCounts {
    /// Per-district counts.
    pub counts: PointCounts,
    /// Dropped-record findings for this source.
    pub warnings: Vec<DataQualityWarning>,
}

/// Reads `source` and counts its points per district.
///
/// # Errors
///
/// Returns [`SpatialError`] if the source cannot be read, lacks
/// coordinate columns, or declares an invalid CRS.
pub fn count_source(
    source: &PointSource,
    index: &SpatialIndex,
    fetcher: &Fetcher,
) -> Result<SourceCounts, SpatialError> {
    log::info!("[{}] Loading points from {}", source.id, source.location);

    let bytes = fetcher.fetch(&source.location)?;
    let read = points::read_points(source, &bytes)?;
    let counts = index.count(&read.points);

    log::info!(
        "[{}] assigned {} of {} points ({} outside, {} malformed)",
        source.id,
        counts.assigned(),
        read.points.len(),
        counts.outside,
        read.malformed
    );

    let mut warnings = Vec::new();
    if read.malformed > 0 {
        warnings.push(DataQualityWarning::MalformedCoordinates {
            source_id: source.id.clone(),
            dropped: read.malformed,
        });
    }
    if counts.outside > 0 {
        warnings.push(DataQualityWarning::PointsOutside {
            source_id: source.id.clone(),
            dropped: counts.outside,
        });
    }

    Ok(SourceCounts { counts, warnings })
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
