//! Raw boundary records, before name resolution and filtering.
//!
//! Readers for each container format produce [`BoundaryRecords`]: every
//! polygonal feature with its attributes rendered as strings, plus the
//! union of attribute labels so the name column can be resolved once for
//! the whole source.

use std::collections::BTreeMap;
use std::io::Read as _;
use std::path::Path;

use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::GeoJson;
use shapefile::dbase::FieldValue;

use crate::BoundaryError;

/// One polygonal feature with its attributes.
#[derive(Debug, Clone)]
pub struct BoundaryRecord {
    /// Attribute label to string value.
    pub attributes: BTreeMap<String, String>,
    /// Geometry in the source CRS.
    pub shape: MultiPolygon<f64>,
}

/// All polygonal features of a boundary source.
#[derive(Debug, Clone, Default)]
pub struct BoundaryRecords {
    /// Attribute labels seen on any feature, in first-seen order.
    pub labels: Vec<String>,
    /// Polygonal features in source order.
    pub records: Vec<BoundaryRecord>,
}

impl BoundaryRecords {
    fn push(&mut self, attributes: BTreeMap<String, String>, shape: MultiPolygon<f64>) {
        for label in attributes.keys() {
            if !self.labels.contains(label) {
                self.labels.push(label.clone());
            }
        }
        self.records.push(BoundaryRecord { attributes, shape });
    }
}

/// Parses a `GeoJSON` `FeatureCollection`.
///
/// Features without geometry, or with non-polygonal geometry, are skipped.
///
/// # Errors
///
/// Returns [`BoundaryError::Parse`] if the bytes are not a `GeoJSON`
/// `FeatureCollection`.
pub fn read_geojson(bytes: &[u8]) -> Result<BoundaryRecords, BoundaryError> {
    let text = std::str::from_utf8(bytes).map_err(|e| BoundaryError::Parse {
        message: format!("GeoJSON is not UTF-8: {e}"),
    })?;
    let geojson: GeoJson = text.parse().map_err(|e| BoundaryError::Parse {
        message: format!("Failed to parse GeoJSON: {e}"),
    })?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(BoundaryError::Parse {
            message: "GeoJSON is not a FeatureCollection".to_string(),
        });
    };

    let mut out = BoundaryRecords::default();
    let mut skipped = 0usize;

    for feature in collection.features {
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };
        let shape = match geo::Geometry::<f64>::try_from(geometry) {
            Ok(geo::Geometry::MultiPolygon(mp)) => mp,
            Ok(geo::Geometry::Polygon(p)) => MultiPolygon(vec![p]),
            Ok(_) | Err(_) => {
                skipped += 1;
                continue;
            }
        };

        let attributes = feature
            .properties
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| json_to_string(&value).map(|v| (key, v)))
            .collect();

        out.push(attributes, shape);
    }

    if skipped > 0 {
        log::debug!("Skipped {skipped} GeoJSON features without polygon geometry");
    }

    Ok(out)
}

fn json_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads an ESRI shapefile from `path` (sidecar `.shx`/`.dbf` alongside).
///
/// # Errors
///
/// Returns [`BoundaryError::Parse`] if the shapefile cannot be opened or
/// read.
pub fn read_shapefile(path: &Path) -> Result<BoundaryRecords, BoundaryError> {
    let mut reader = shapefile::Reader::from_path(path).map_err(|e| BoundaryError::Parse {
        message: format!("Failed to open shapefile {}: {e}", path.display()),
    })?;

    let mut out = BoundaryRecords::default();
    let mut skipped = 0usize;

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.map_err(|e| BoundaryError::Parse {
            message: format!("Error reading shape+record: {e}"),
        })?;

        let shapefile::Shape::Polygon(polygon) = shape else {
            skipped += 1;
            continue;
        };

        let attributes = record
            .into_iter()
            .filter_map(|(field, value)| field_to_string(value).map(|v| (field, v)))
            .collect();

        out.push(attributes, shp_to_geo(&polygon));
    }

    if skipped > 0 {
        log::debug!("Skipped {skipped} non-polygon shapes");
    }

    Ok(out)
}

/// Extracts the first shapefile found in a `.zip` archive and reads it.
///
/// # Errors
///
/// Returns [`BoundaryError::Parse`] if the archive is invalid or contains
/// no `.shp` file.
pub fn read_shapefile_zip(bytes: &[u8]) -> Result<BoundaryRecords, BoundaryError> {
    let parse_err = |message: String| BoundaryError::Parse { message };

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| parse_err(format!("Invalid zip archive: {e}")))?;
    let dir = tempfile::tempdir()
        .map_err(|e| parse_err(format!("Failed to create temp dir: {e}")))?;

    let mut shp_paths = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| parse_err(format!("Failed to read zip entry {i}: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        let Some(file_name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(std::ffi::OsStr::to_os_string))
        else {
            continue;
        };
        let target = dir.path().join(&file_name);

        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|e| parse_err(format!("Failed to extract {}: {e}", target.display())))?;
        std::fs::write(&target, content)
            .map_err(|e| parse_err(format!("Failed to extract {}: {e}", target.display())))?;

        if target
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("shp"))
        {
            shp_paths.push(target);
        }
    }

    shp_paths.sort();
    let Some(shp_path) = shp_paths.first() else {
        return Err(parse_err("Zip archive contains no .shp file".to_string()));
    };
    if shp_paths.len() > 1 {
        log::warn!(
            "Zip archive contains {} shapefiles, using {}",
            shp_paths.len(),
            shp_path.display()
        );
    }

    read_shapefile(shp_path)
}

fn field_to_string(value: FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => Some(s),
        FieldValue::Numeric(Some(n)) => Some(n.to_string()),
        FieldValue::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Converts a shapefile polygon into a multipolygon.
///
/// Shapefiles store rings flat: each outer ring is followed by its holes.
fn shp_to_geo(polygon: &shapefile::Polygon) -> MultiPolygon<f64> {
    fn to_line_string(points: &[shapefile::Point]) -> LineString<f64> {
        let mut coords: Vec<Coord<f64>> =
            points.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect();
        if coords.first() != coords.last()
            && let Some(first) = coords.first().copied()
        {
            coords.push(first);
        }
        LineString(coords)
    }

    let mut polygons = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes = Vec::new();

    for ring in polygon.rings() {
        match ring {
            shapefile::PolygonRing::Outer(points) => {
                if let Some(ext) = exterior.take() {
                    polygons.push(Polygon::new(ext, std::mem::take(&mut holes)));
                }
                exterior = Some(to_line_string(points));
            }
            shapefile::PolygonRing::Inner(points) => holes.push(to_line_string(points)),
        }
    }
    if let Some(ext) = exterior {
        polygons.push(Polygon::new(ext, holes));
    }

    MultiPolygon(polygons)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_polygons_and_stringifies_properties() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "name": "중구", "code": 11140, "nested": { "a": 1 } },
                    "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]] }
                },
                {
                    "type": "Feature",
                    "properties": { "SIG_KOR_NM": "종로구" },
                    "geometry": { "type": "MultiPolygon", "coordinates": [[[[2,2],[3,2],[3,3],[2,2]]]] }
                }
            ]
        }"#;
        let records = read_geojson(json.as_bytes()).unwrap();
        assert_eq!(records.records.len(), 2);
        assert_eq!(records.labels, vec!["code", "name", "SIG_KOR_NM"]);
        assert_eq!(records.records[0].attributes["code"], "11140");
        assert!(!records.records[0].attributes.contains_key("nested"));
        assert_eq!(records.records[1].shape.0.len(), 1);
    }

    #[test]
    fn skips_points_and_null_geometry() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "name": "a" }, "geometry": null },
                { "type": "Feature", "properties": { "name": "b" },
                  "geometry": { "type": "Point", "coordinates": [1, 1] } }
            ]
        }"#;
        let records = read_geojson(json.as_bytes()).unwrap();
        assert!(records.records.is_empty());
    }

    #[test]
    fn rejects_non_collections() {
        let json = r#"{ "type": "Point", "coordinates": [1, 1] }"#;
        assert!(matches!(
            read_geojson(json.as_bytes()),
            Err(BoundaryError::Parse { .. })
        ));
        assert!(read_geojson(b"<html>").is_err());
    }

    #[test]
    fn rejects_invalid_zip() {
        assert!(matches!(
            read_shapefile_zip(b"not a zip"),
            Err(BoundaryError::Parse { .. })
        ));
    }

    #[test]
    fn groups_holes_with_preceding_outer_ring() {
        let square = |min: f64, max: f64| {
            vec![
                shapefile::Point::new(min, min),
                shapefile::Point::new(min, max),
                shapefile::Point::new(max, max),
                shapefile::Point::new(max, min),
                shapefile::Point::new(min, min),
            ]
        };
        let polygon = shapefile::Polygon::with_rings(vec![
            shapefile::PolygonRing::Outer(square(0.0, 10.0)),
            shapefile::PolygonRing::Inner(square(4.0, 6.0)),
            shapefile::PolygonRing::Outer(square(20.0, 30.0)),
        ]);
        let mp = shp_to_geo(&polygon);
        assert_eq!(mp.0.len(), 2);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert!(mp.0[1].interiors().is_empty());
    }
}
