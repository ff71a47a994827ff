//! Coordinate reference system transforms.
//!
//! District boundaries are stored in WGS84 lon/lat. Areas are measured
//! after projecting into an equal-area planar CRS, and point sources in a
//! local planar grid are brought back to WGS84 before containment tests.
//! Measuring area directly in degrees gives numerically wrong results, so
//! every area goes through [`Projector`].

use geo::{Coord, MapCoords as _, MultiPolygon};
use proj4rs::{proj::Proj as Proj4, transform::transform};
use thiserror::Error;

/// PROJ.4 definition of WGS84 geographic coordinates.
pub const WGS84: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Errors from building or applying a projection.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The PROJ.4 string could not be parsed.
    #[error("Invalid projection '{definition}': {message}")]
    Definition {
        /// The offending PROJ.4 string.
        definition: String,
        /// Parser message.
        message: String,
    },

    /// A coordinate could not be transformed.
    #[error("Failed to transform ({x}, {y}): {message}")]
    Transform {
        /// Input x.
        x: f64,
        /// Input y.
        y: f64,
        /// Transform message.
        message: String,
    },
}

/// A reusable transform between two CRSs.
///
/// Geographic CRSs take and return degrees; the radian conversion that
/// `proj4rs` expects is handled internally.
pub struct Projector {
    from: Proj4,
    to: Proj4,
    from_latlong: bool,
    to_latlong: bool,
}

impl std::fmt::Debug for Projector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Projector")
            .field("from_latlong", &self.from_latlong)
            .field("to_latlong", &self.to_latlong)
            .finish_non_exhaustive()
    }
}

impl Projector {
    /// Builds a transform from `from` to `to` (both PROJ.4 strings).
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Definition`] if either string is invalid.
    pub fn new(from: &str, to: &str) -> Result<Self, ProjectionError> {
        Ok(Self {
            from: parse_definition(from)?,
            to: parse_definition(to)?,
            from_latlong: is_latlong(from),
            to_latlong: is_latlong(to),
        })
    }

    /// Builds a transform from `from` into WGS84.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Definition`] if `from` is invalid.
    pub fn to_wgs84(from: &str) -> Result<Self, ProjectionError> {
        Self::new(from, WGS84)
    }

    /// Builds a transform from WGS84 into `to`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Definition`] if `to` is invalid.
    pub fn from_wgs84(to: &str) -> Result<Self, ProjectionError> {
        Self::new(WGS84, to)
    }

    /// Transforms a single coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Transform`] if the coordinate is outside
    /// the projection's domain.
    pub fn project(&self, coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        let mut point = if self.from_latlong {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };

        transform(&self.from, &self.to, &mut point).map_err(|e| ProjectionError::Transform {
            x: coord.x,
            y: coord.y,
            message: e.to_string(),
        })?;

        if !point.0.is_finite() || !point.1.is_finite() {
            return Err(ProjectionError::Transform {
                x: coord.x,
                y: coord.y,
                message: "non-finite result".to_string(),
            });
        }

        Ok(if self.to_latlong {
            Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            }
        } else {
            Coord {
                x: point.0,
                y: point.1,
            }
        })
    }

    /// Transforms every vertex of a multipolygon.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProjectionError::Transform`] encountered.
    pub fn project_multipolygon(
        &self,
        shape: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, ProjectionError> {
        shape.try_map_coords(|coord| self.project(coord))
    }
}

fn parse_definition(definition: &str) -> Result<Proj4, ProjectionError> {
    Proj4::from_proj_string(definition).map_err(|e| ProjectionError::Definition {
        definition: definition.to_string(),
        message: e.to_string(),
    })
}

fn is_latlong(definition: &str) -> bool {
    definition
        .split_whitespace()
        .any(|token| matches!(token, "+proj=longlat" | "+proj=latlong" | "+proj=lonlat"))
}
