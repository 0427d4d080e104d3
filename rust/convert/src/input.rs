// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GeoJSON footprint ingestion
//!
//! Reads a `FeatureCollection` into [`Footprint`] records, one per feature and
//! in feature order, so failure indices in the assembly line up with the
//! input file. Features without geometry become empty geometry collections
//! and are reported as unsupported downstream.

use crate::error::{ConvertError, Result};
use footprint3d_geometry::{AttributeValue, Footprint};
use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    geometry: Option<GeometryObject>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

/// Positions may carry a third (altitude) value, which is ignored
type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum GeometryObject {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

/// Read footprints from a GeoJSON file
pub fn read_footprints(path: &Path) -> Result<Vec<Footprint>> {
    let content = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
    let footprints = parse_footprints(&content)?;
    tracing::info!(
        path = %path.display(),
        footprints = footprints.len(),
        "Loaded footprints"
    );
    Ok(footprints)
}

/// Parse a GeoJSON `FeatureCollection`
pub fn parse_footprints(content: &str) -> Result<Vec<Footprint>> {
    let collection: FeatureCollection = serde_json::from_str(content)?;
    if collection.kind != "FeatureCollection" {
        return Err(ConvertError::GeoJson(format!(
            "expected a FeatureCollection, found '{}'",
            collection.kind
        )));
    }

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            let geometry = match feature.geometry {
                Some(g) => convert_geometry(g)
                    .map_err(|e| ConvertError::GeoJson(format!("feature {}: {}", index, e)))?,
                None => Geometry::GeometryCollection(GeometryCollection(Vec::new())),
            };
            Ok(Footprint {
                geometry,
                attributes: convert_properties(feature.properties.unwrap_or_default()),
            })
        })
        .collect()
}

fn coord(position: &[f64]) -> std::result::Result<Coord<f64>, String> {
    match position {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(format!("position needs at least 2 values, got {}", position.len())),
    }
}

fn line(positions: &[Position]) -> std::result::Result<LineString<f64>, String> {
    positions
        .iter()
        .map(|p| coord(p))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Position>]) -> std::result::Result<Polygon<f64>, String> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| "polygon has no rings".to_string())?;
    Ok(Polygon::new(
        line(exterior)?,
        interiors.iter().map(|r| line(r)).collect::<std::result::Result<_, _>>()?,
    ))
}

fn convert_geometry(geometry: GeometryObject) -> std::result::Result<Geometry<f64>, String> {
    Ok(match geometry {
        GeometryObject::Point(p) => Geometry::Point(Point::from(coord(&p)?)),
        GeometryObject::MultiPoint(points) => Geometry::MultiPoint(MultiPoint::new(
            points
                .iter()
                .map(|p| coord(p).map(Point::from))
                .collect::<std::result::Result<_, _>>()?,
        )),
        GeometryObject::LineString(positions) => Geometry::LineString(line(&positions)?),
        GeometryObject::MultiLineString(lines) => Geometry::MultiLineString(MultiLineString::new(
            lines.iter().map(|l| line(l)).collect::<std::result::Result<_, _>>()?,
        )),
        GeometryObject::Polygon(rings) => Geometry::Polygon(polygon(&rings)?),
        GeometryObject::MultiPolygon(polygons) => Geometry::MultiPolygon(MultiPolygon::new(
            polygons.iter().map(|p| polygon(p)).collect::<std::result::Result<_, _>>()?,
        )),
    })
}

/// Flatten JSON properties into attribute values; nulls are dropped
fn convert_properties(properties: Map<String, Value>) -> FxHashMap<String, AttributeValue> {
    properties
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::Number(n) => match n.as_f64() {
                    Some(f) => AttributeValue::Number(f),
                    None => AttributeValue::Text(n.to_string()),
                },
                Value::String(s) => AttributeValue::Text(s),
                Value::Bool(b) => AttributeValue::Text(b.to_string()),
                other => AttributeValue::Text(other.to_string()),
            };
            Some((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "height": 12, "name": "hall", "floors": "3", "note": null },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [
                        [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
                        [[4, 4], [6, 4], [6, 6], [4, 6], [4, 4]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": { "type": "Point", "coordinates": [1.5, 2.5, 30.0] }
            },
            {
                "type": "Feature",
                "properties": null,
                "geometry": null
            },
            {
                "type": "Feature",
                "properties": { "flag": true },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[0, 0], [1, 0], [1, 1], [0, 0]]]]
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_feature_collection() {
        let footprints = parse_footprints(SAMPLE).unwrap();
        assert_eq!(footprints.len(), 4);

        match &footprints[0].geometry {
            Geometry::Polygon(p) => {
                assert_eq!(p.exterior().0.len(), 5);
                assert_eq!(p.interiors().len(), 1);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
        assert_eq!(
            footprints[0].attributes.get("height"),
            Some(&AttributeValue::Number(12.0))
        );
        assert_eq!(
            footprints[0].attributes.get("name"),
            Some(&AttributeValue::Text("hall".to_string()))
        );
        assert!(!footprints[0].attributes.contains_key("note"));
        assert_eq!(footprints[0].numeric_attribute("floors").unwrap(), 3.0);
    }

    #[test]
    fn test_other_geometries_keep_their_slot() {
        let footprints = parse_footprints(SAMPLE).unwrap();
        assert!(matches!(footprints[1].geometry, Geometry::Point(p) if p.x() == 1.5 && p.y() == 2.5));
        assert!(matches!(footprints[2].geometry, Geometry::GeometryCollection(ref c) if c.0.is_empty()));
        assert!(footprints[2].attributes.is_empty());
        assert!(matches!(footprints[3].geometry, Geometry::MultiPolygon(_)));
        assert_eq!(
            footprints[3].attributes.get("flag"),
            Some(&AttributeValue::Text("true".to_string()))
        );
    }

    #[test]
    fn test_rejects_non_collections() {
        let err = parse_footprints(r#"{ "type": "Feature", "features": [] }"#).unwrap_err();
        assert!(matches!(err, ConvertError::GeoJson(_)));

        let err = parse_footprints("not json").unwrap_err();
        assert!(matches!(err, ConvertError::Json(_)));
    }

    #[test]
    fn test_rejects_short_positions() {
        let content = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": [1.0] } }
            ]
        }"#;
        let err = parse_footprints(content).unwrap_err();
        assert!(err.to_string().contains("feature 0"));
    }
}
