//! Point source readers.
//!
//! A point source is either a CSV extract with X/Y columns or a `GeoJSON`
//! `FeatureCollection` of `Point` features. Coordinates in a planar CRS
//! are reprojected to WGS84. Rows whose coordinates are missing,
//! unparseable, zero, or fail to reproject are dropped and counted as
//! malformed.

use geo::Coord;
use geojson::{GeoJson, Value};
use seoul_transit_boundary::projection::Projector;
use seoul_transit_source::columns::resolve_column;
use seoul_transit_source::parsing::{parse_xy_f64, parse_xy_str};
use seoul_transit_source::table::CsvTable;
use seoul_transit_source_models::{PointFormat, PointSource};

use crate::SpatialError;

/// A transit facility location in WGS84.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointFeature {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

/// Points read from one source.
#[derive(Debug, Clone, Default)]
pub struct PointRead {
    /// Valid points in WGS84.
    pub points: Vec<PointFeature>,
    /// Records dropped for bad coordinates.
    pub malformed: u64,
}

/// Parses `bytes` according to `source.format` and reprojects to WGS84.
///
/// # Errors
///
/// Returns [`SpatialError`] if the bytes cannot be parsed, the X/Y columns
/// are missing, or `source.crs` is not a valid PROJ.4 string.
pub fn read_points(source: &PointSource, bytes: &[u8]) -> Result<PointRead, SpatialError> {
    let projector = source.crs.as_deref().map(Projector::to_wgs84).transpose()?;

    let (raw, mut malformed) = match source.format {
        PointFormat::Csv => read_csv(source, bytes)?,
        PointFormat::Geojson => read_geojson(bytes)?,
    };

    let mut points = Vec::with_capacity(raw.len());
    for (x, y) in raw {
        let coord = match &projector {
            Some(projector) => match projector.project(Coord { x, y }) {
                Ok(coord) => coord,
                Err(e) => {
                    log::trace!("[{}] {e}", source.id);
                    malformed += 1;
                    continue;
                }
            },
            None => Coord { x, y },
        };
        points.push(PointFeature {
            lon: coord.x,
            lat: coord.y,
        });
    }

    if malformed > 0 {
        log::warn!(
            "[{}] dropped {malformed} records with malformed coordinates",
            source.id
        );
    }

    Ok(PointRead { points, malformed })
}

fn read_csv(source: &PointSource, bytes: &[u8]) -> Result<(Vec<(f64, f64)>, u64), SpatialError> {
    let table = CsvTable::parse(bytes, source.delimiter)?;
    let x_idx = resolve_column(&table.headers, &source.x_columns, "x coordinate")?;
    let y_idx = resolve_column(&table.headers, &source.y_columns, "y coordinate")?;

    let mut raw = Vec::with_capacity(table.rows.len());
    let mut malformed = 0u64;

    for row in &table.rows {
        match parse_xy_str(row.get(x_idx), row.get(y_idx)) {
            Some(xy) => raw.push(xy),
            None => malformed += 1,
        }
    }

    Ok((raw, malformed))
}

fn read_geojson(bytes: &[u8]) -> Result<(Vec<(f64, f64)>, u64), SpatialError> {
    let text = std::str::from_utf8(bytes).map_err(|e| SpatialError::Parse {
        message: format!("GeoJSON is not UTF-8: {e}"),
    })?;
    let geojson: GeoJson = text.parse().map_err(|e| SpatialError::Parse {
        message: format!("Failed to parse GeoJSON: {e}"),
    })?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(SpatialError::Parse {
            message: "GeoJSON is not a FeatureCollection".to_string(),
        });
    };

    let mut raw = Vec::with_capacity(collection.features.len());
    let mut malformed = 0u64;

    for feature in collection.features {
        let xy = match feature.geometry.map(|g| g.value) {
            Some(Value::Point(position)) => {
                parse_xy_f64(position.first().copied(), position.get(1).copied())
            }
            _ => None,
        };
        match xy {
            Some(xy) => raw.push(xy),
            None => malformed += 1,
        }
    }

    Ok((raw, malformed))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use seoul_transit_district_models::CountColumn;
    use seoul_transit_source::SourceError;
    use seoul_transit_source_models::SourceLocation;

    use super::*;

    const SEOUL_TM: &str = "+proj=tmerc +lat_0=38 +lon_0=127 +k=1 +x_0=200000 +y_0=600000 +ellps=GRS80 +units=m +no_defs";

    fn csv_source(crs: Option<&str>) -> PointSource {
        PointSource {
            id: "bus_stops".to_string(),
            column: CountColumn::Bus,
            location: SourceLocation::Path {
                path: PathBuf::from("stops.csv"),
            },
            format: PointFormat::Csv,
            x_columns: vec!["X좌표".to_string(), "lon".to_string()],
            y_columns: vec!["Y좌표".to_string(), "lat".to_string()],
            crs: crs.map(str::to_string),
            delimiter: None,
        }
    }

    #[test]
    fn reads_csv_and_counts_malformed_rows() {
        let csv = "정류소명,lon,lat\n\
                   시청,126.9784,37.5666\n\
                   빈칸,,37.5\n\
                   영점,0,0\n\
                   문자,abc,37.5\n\
                   광화문,126.9769,37.5759\n";
        let read = read_points(&csv_source(None), csv.as_bytes()).unwrap();
        assert_eq!(read.points.len(), 2);
        assert_eq!(read.malformed, 3);
        assert!((read.points[0].lon - 126.9784).abs() < 1e-12);
    }

    #[test]
    fn reprojects_planar_coordinates() {
        let forward = Projector::from_wgs84(SEOUL_TM).unwrap();
        let planar = forward
            .project(Coord {
                x: 126.9784,
                y: 37.5666,
            })
            .unwrap();
        let csv = format!("X좌표,Y좌표\n{},{}\n", planar.x, planar.y);

        let read = read_points(&csv_source(Some(SEOUL_TM)), csv.as_bytes()).unwrap();
        assert_eq!(read.points.len(), 1);
        assert!((read.points[0].lon - 126.9784).abs() < 1e-7);
        assert!((read.points[0].lat - 37.5666).abs() < 1e-7);
    }

    #[test]
    fn missing_coordinate_column_is_schema_error() {
        let err = read_points(&csv_source(None), b"name,lat\na,37.5\n").unwrap_err();
        assert!(matches!(
            err,
            SpatialError::Source(SourceError::Schema { .. })
        ));
    }

    #[test]
    fn invalid_crs_is_projection_error() {
        let err = read_points(&csv_source(Some("+proj=nope")), b"lon,lat\n1,1\n").unwrap_err();
        assert!(matches!(err, SpatialError::Projection(_)));
    }

    #[test]
    fn reads_geojson_points() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "name": "시청역" },
                  "geometry": { "type": "Point", "coordinates": [126.9772, 37.5657] } },
                { "type": "Feature", "properties": {},
                  "geometry": { "type": "LineString", "coordinates": [[0,0],[1,1]] } },
                { "type": "Feature", "properties": {}, "geometry": null }
            ]
        }"#;
        let source = PointSource {
            format: PointFormat::Geojson,
            x_columns: vec![],
            y_columns: vec![],
            ..csv_source(None)
        };
        let read = read_points(&source, json.as_bytes()).unwrap();
        assert_eq!(
            read.points,
            vec![PointFeature {
                lon: 126.9772,
                lat: 37.5657
            }]
        );
        assert_eq!(read.malformed, 2);
    }
}
