#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! District boundary loading.
//!
//! Reads the district polygon source (`GeoJSON`, shapefile, or zipped
//! shapefile), resolves the district-name attribute from an ordered list
//! of candidate labels, keeps only valid geometries whose name is
//! canonical, merges fragments that share a name, and measures each
//! district's area under an equal-area projection. Nothing downstream can
//! run without this stage, so every failure here is fatal to the pipeline.

pub mod projection;
pub mod records;

use std::collections::BTreeMap;

use geo::{Area as _, BooleanOps as _, MultiPolygon, Validation as _};
use seoul_transit_district_models::{DataQualityWarning, District};
use seoul_transit_source::SourceError;
use seoul_transit_source::columns::resolve_column;
use seoul_transit_source::fetch::Fetcher;
use seoul_transit_source_models::{BoundaryFormat, BoundarySource, SourceLocation};
use thiserror::Error;

use crate::projection::{ProjectionError, Projector};
use crate::records::{BoundaryRecords, read_geojson, read_shapefile, read_shapefile_zip};

/// Square metres per square kilometre.
const M2_PER_KM2: f64 = 1_000_000.0;

/// Errors that can occur while loading boundaries.
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// The source could not be read.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The source was read but could not be parsed as the declared format.
    #[error("Boundary parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// The source lacks a usable district-name attribute.
    #[error("Boundary schema error: {message}")]
    Schema {
        /// Description of what is missing.
        message: String,
    },

    /// A projection could not be built or applied.
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

impl BoundaryError {
    /// Returns `true` for schema problems, `false` for unavailable or
    /// unparsable sources.
    #[must_use]
    pub const fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. } | Self::Source(SourceError::Schema { .. }))
    }

    /// Returns `true` when the source could not be read or could not be
    /// parsed as its declared format.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::Source(SourceError::Unavailable { .. })
        )
    }
}

/// The loaded districts, in canonical order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistrictSet {
    districts: Vec<District>,
}

impl DistrictSet {
    /// Wraps districts that are already in canonical order.
    #[must_use]
    pub const fn new(districts: Vec<District>) -> Self {
        Self { districts }
    }

    /// Number of districts with a boundary.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.districts.len()
    }

    /// Returns `true` if no district has a boundary.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }

    /// Iterates over districts in canonical order.
    pub fn iter(&self) -> std::slice::Iter<'_, District> {
        self.districts.iter()
    }

    /// Returns the district with the given canonical name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&District> {
        self.districts.iter().find(|d| d.name == name)
    }

    /// Returns the districts as a slice, in canonical order.
    #[must_use]
    pub fn as_slice(&self) -> &[District] {
        &self.districts
    }
}

impl<'a> IntoIterator for &'a DistrictSet {
    type Item = &'a District;
    type IntoIter = std::slice::Iter<'a, District>;

    fn into_iter(self) -> Self::IntoIter {
        self.districts.iter()
    }
}

/// Result of the boundary stage.
#[derive(Debug, Clone, Default)]
pub struct BoundaryLoad {
    /// Districts with a boundary, in canonical order.
    pub districts: DistrictSet,
    /// Canonical districts that had no usable geometry.
    pub warnings: Vec<DataQualityWarning>,
}

/// Fetches, parses, and builds the district table for `source`.
///
/// # Errors
///
/// Returns [`BoundaryError`] if the source is unreachable or unparsable,
/// the name attribute cannot be resolved, no canonical district matches,
/// or a projection fails.
pub fn load_boundaries(
    source: &BoundarySource,
    canonical: &[String],
    area_projection: &str,
    fetcher: &Fetcher,
) -> Result<BoundaryLoad, BoundaryError> {
    log::info!("Loading district boundaries from {}", source.location);

    let records = match source.format {
        BoundaryFormat::Geojson => read_geojson(&fetcher.fetch(&source.location)?)?,
        BoundaryFormat::ShapefileZip => read_shapefile_zip(&fetcher.fetch(&source.location)?)?,
        BoundaryFormat::Shapefile => match &source.location {
            SourceLocation::Path { path } => {
                if !path.is_file() {
                    return Err(SourceError::unavailable(path.display(), "file not found").into());
                }
                read_shapefile(path)?
            }
            SourceLocation::Url { url } => {
                return Err(BoundaryError::Parse {
                    message: format!(
                        "{url}: a remote shapefile must be packaged as shapefile_zip"
                    ),
                });
            }
        },
    };

    log::info!("Read {} boundary features", records.records.len());

    build_districts(
        records,
        &source.name_columns,
        source.crs.as_deref(),
        canonical,
        area_projection,
    )
}

/// Builds the district table from already-parsed records.
///
/// - the name column is the first of `name_columns` present on the source
/// - names are trimmed and must equal a canonical name exactly
/// - invalid geometries are dropped
/// - fragments sharing a name are unioned into one multipolygon
/// - `area_km2` is measured after projecting into `area_projection`
///
/// # Errors
///
/// Returns [`BoundaryError::Schema`] if no name column is present or no
/// canonical district matches, and [`BoundaryError::Projection`] if the
/// area projection is invalid.
pub fn build_districts(
    records: BoundaryRecords,
    name_columns: &[String],
    source_crs: Option<&str>,
    canonical: &[String],
    area_projection: &str,
) -> Result<BoundaryLoad, BoundaryError> {
    let name_index = resolve_column(&records.labels, name_columns, "district name").map_err(
        |e| BoundaryError::Schema {
            message: e.to_string(),
        },
    )?;
    let name_label = records.labels[name_index].clone();

    let to_wgs84 = source_crs.map(Projector::to_wgs84).transpose()?;
    let to_area = Projector::from_wgs84(area_projection)?;

    let mut fragments: BTreeMap<String, Vec<MultiPolygon<f64>>> = BTreeMap::new();
    let mut out_of_scope = 0usize;
    let mut invalid = 0usize;

    for record in records.records {
        let Some(name) = record.attributes.get(&name_label).map(|s| s.trim()) else {
            out_of_scope += 1;
            continue;
        };
        if !canonical.iter().any(|c| c == name) {
            log::debug!("Dropping boundary for non-canonical name '{name}'");
            out_of_scope += 1;
            continue;
        }

        let shape = match &to_wgs84 {
            Some(projector) => match projector.project_multipolygon(&record.shape) {
                Ok(shape) => shape,
                Err(e) => {
                    log::debug!("Dropping fragment of {name}: {e}");
                    invalid += 1;
                    continue;
                }
            },
            None => record.shape,
        };

        if shape.0.is_empty() || !shape.is_valid() {
            log::debug!("Dropping invalid geometry fragment of {name}");
            invalid += 1;
            continue;
        }

        fragments.entry(name.to_string()).or_default().push(shape);
    }

    if out_of_scope > 0 || invalid > 0 {
        log::info!(
            "Dropped {out_of_scope} out-of-scope and {invalid} invalid boundary features"
        );
    }

    let mut districts = Vec::with_capacity(canonical.len());
    let mut warnings = Vec::new();

    for name in canonical {
        let Some(parts) = fragments.remove(name) else {
            log::warn!("No valid boundary for {name}");
            warnings.push(DataQualityWarning::MissingBoundary {
                district: name.clone(),
            });
            continue;
        };
        if parts.len() > 1 {
            log::debug!("Merging {} fragments of {name}", parts.len());
        }

        let boundary = merge_fragments(parts);
        let area_km2 = to_area.project_multipolygon(&boundary)?.unsigned_area() / M2_PER_KM2;

        districts.push(District {
            name: name.clone(),
            boundary,
            area_km2,
        });
    }

    if districts.is_empty() {
        return Err(BoundaryError::Schema {
            message: format!("no feature's '{name_label}' matched a canonical district name"),
        });
    }

    log::info!("Loaded {} district boundaries", districts.len());

    Ok(BoundaryLoad {
        districts: DistrictSet::new(districts),
        warnings,
    })
}

/// Unions all fragments of one district so shared area is counted once.
fn merge_fragments(parts: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    let mut parts = parts.into_iter();
    let first = parts.next().unwrap_or_else(|| MultiPolygon(Vec::new()));
    parts.fold(first, |merged, part| merged.union(&part))
}
