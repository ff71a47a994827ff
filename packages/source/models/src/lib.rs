#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pipeline configuration and input source definition types.
//!
//! Defines the TOML schema for a pipeline run: one mandatory boundary
//! source, any number of tabular sources, and any number of point
//! sources. Each optional source writes exactly one count column.

use std::path::{Path, PathBuf};

use seoul_transit_district_models::{CountColumn, RankBasis, RankMethod, SEOUL_DISTRICTS};
use serde::{Deserialize, Serialize};

/// Lambert azimuthal equal-area projection centred on Seoul.
pub const DEFAULT_AREA_PROJECTION: &str =
    "+proj=laea +lat_0=37.55 +lon_0=126.99 +x_0=0 +y_0=0 +ellps=GRS80 +units=m +no_defs";

/// Default per-request timeout for remote sources, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A complete pipeline run definition, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Unique config identifier (e.g., `"seoul"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Canonical district names. Defaults to the 25 Seoul districts.
    #[serde(default)]
    pub districts: Option<Vec<String>>,
    /// Quantity that `scarcity_rank` is computed over.
    #[serde(default)]
    pub rank_basis: RankBasis,
    /// Tie handling for `scarcity_rank`.
    #[serde(default)]
    pub rank_method: RankMethod,
    /// PROJ.4 string of the equal-area CRS used for area measurement.
    #[serde(default = "default_area_projection")]
    pub area_projection: String,
    /// Per-request timeout for remote sources, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Explicit cache-busting key, mixed into the cache key.
    ///
    /// Needed for remote sources, whose content is not hashed.
    #[serde(default)]
    pub cache_key: Option<String>,
    /// District boundary source (mandatory).
    pub boundary: BoundarySource,
    /// Pre-aggregated per-district tabular sources.
    #[serde(default)]
    pub tabular: Vec<TabularSource>,
    /// Point coordinate sources.
    #[serde(default)]
    pub points: Vec<PointSource>,
}

fn default_area_projection() -> String {
    DEFAULT_AREA_PROJECTION.to_string()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl PipelineConfig {
    /// Returns the canonical district names for this run, in output order.
    #[must_use]
    pub fn canonical_districts(&self) -> Vec<String> {
        self.districts.clone().unwrap_or_else(|| {
            SEOUL_DISTRICTS
                .iter()
                .map(|name| (*name).to_string())
                .collect()
        })
    }

    /// Rewrites every relative `path` location to be relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        self.boundary.location.resolve(base);
        for source in &mut self.tabular {
            source.location.resolve(base);
        }
        for source in &mut self.points {
            source.location.resolve(base);
        }
    }

    /// Iterates over every input location, boundary first.
    pub fn locations(&self) -> impl Iterator<Item = &SourceLocation> {
        std::iter::once(&self.boundary.location)
            .chain(self.tabular.iter().map(|s| &s.location))
            .chain(self.points.iter().map(|s| &s.location))
    }
}

/// Where a source's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceLocation {
    /// A local file.
    Path {
        /// File path, relative to the config file when not absolute.
        path: PathBuf,
    },
    /// A remote HTTP(S) resource.
    Url {
        /// Full URL.
        url: String,
    },
}

impl SourceLocation {
    fn resolve(&mut self, base: &Path) {
        if let Self::Path { path } = self
            && path.is_relative()
        {
            *path = base.join(&*path);
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path { path } => write!(f, "{}", path.display()),
            Self::Url { url } => f.write_str(url),
        }
    }
}

/// The district boundary source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundarySource {
    /// Where to read the geometry from.
    pub location: SourceLocation,
    /// Container format. Declared, never sniffed.
    pub format: BoundaryFormat,
    /// Candidate attribute labels for the district name, highest priority
    /// first.
    pub name_columns: Vec<String>,
    /// PROJ.4 string of the source CRS. `None` means WGS84 lon/lat.
    #[serde(default)]
    pub crs: Option<String>,
}

/// Container format of a boundary source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryFormat {
    /// A `GeoJSON` `FeatureCollection`.
    Geojson,
    /// An ESRI shapefile (`.shp` with `.shx`/`.dbf` alongside).
    Shapefile,
    /// A `.zip` archive containing one shapefile.
    ShapefileZip,
}

/// A pre-aggregated per-district tabular source (CSV).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularSource {
    /// Unique source identifier (e.g., `"population"`).
    pub id: String,
    /// The count column this source fills.
    pub column: CountColumn,
    /// Where to read the CSV from.
    pub location: SourceLocation,
    /// Candidate header labels for the district name, highest priority
    /// first.
    pub key_columns: Vec<String>,
    /// Candidate header labels for the numeric measure, highest priority
    /// first.
    pub value_columns: Vec<String>,
    /// Field delimiter (default: comma).
    #[serde(default)]
    pub delimiter: Option<char>,
}

/// A point coordinate source (bus stops, subway stations).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointSource {
    /// Unique source identifier (e.g., `"bus_stops"`).
    pub id: String,
    /// The count column this source fills.
    pub column: CountColumn,
    /// Where to read the points from.
    pub location: SourceLocation,
    /// File format.
    #[serde(default)]
    pub format: PointFormat,
    /// Candidate header labels for the X (longitude / easting) column.
    #[serde(default)]
    pub x_columns: Vec<String>,
    /// Candidate header labels for the Y (latitude / northing) column.
    #[serde(default)]
    pub y_columns: Vec<String>,
    /// PROJ.4 string of the point CRS. `None` means WGS84 lon/lat.
    #[serde(default)]
    pub crs: Option<String>,
    /// Field delimiter for CSV sources (default: comma).
    #[serde(default)]
    pub delimiter: Option<char>,
}

/// File format of a point source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointFormat {
    /// CSV with X/Y columns.
    #[default]
    Csv,
    /// A `GeoJSON` `FeatureCollection` of `Point` features.
    Geojson,
}
