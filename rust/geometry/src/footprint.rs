// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Footprint records and their 2D profiles

use crate::assembly::CoordinateMode;
use crate::error::{Error, Result};
use crate::geodesy::GeoPoint;
use crate::triangulation::{triangulate, PlanarMesh};
use geo::{BoundingRect, Centroid, Coord, Geometry, LineString, Polygon};
use nalgebra::Point2;
use rustc_hash::FxHashMap;

/// Attribute value attached to a footprint record
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
}

impl AttributeValue {
    /// Numeric view: numbers as-is, text if it parses as a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

/// One input record: a geometry plus its attribute table row
#[derive(Debug, Clone)]
pub struct Footprint {
    pub geometry: Geometry<f64>,
    pub attributes: FxHashMap<String, AttributeValue>,
}

impl Footprint {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry,
            attributes: FxHashMap::default(),
        }
    }

    /// Builder-style attribute insert
    pub fn with_attribute(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Numeric attribute lookup
    ///
    /// A missing field and a value that is not a number are both errors.
    pub fn numeric_attribute(&self, field: &str) -> Result<f64> {
        let value = self.attributes.get(field).ok_or_else(|| {
            Error::InvalidFootprint(format!("missing attribute '{}'", field))
        })?;
        value
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                Error::InvalidFootprint(format!(
                    "attribute '{}' is not numeric: {:?}",
                    field, value
                ))
            })
    }

    /// The polygon geometry, or `UnsupportedGeometry` for anything else
    pub fn polygon(&self) -> Result<&Polygon<f64>> {
        match &self.geometry {
            Geometry::Polygon(polygon) => Ok(polygon),
            other => Err(Error::UnsupportedGeometry(geometry_kind(other).to_string())),
        }
    }
}

/// Human-readable geometry type name
pub fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Centre of the total bounding box of the collection
///
/// In geographic mode a geometry whose extent leaves the WGS-84 domain is left
/// out; that footprint then fails on its own when it is projected. Non-finite
/// extents are always left out.
///
/// Returns `None` when no geometry contributes an extent.
pub fn collection_center(footprints: &[Footprint], mode: CoordinateMode) -> Option<GeoPoint> {
    let mut bounds: Option<(f64, f64, f64, f64)> = None;
    for (index, footprint) in footprints.iter().enumerate() {
        let Some(rect) = footprint.geometry.bounding_rect() else {
            continue;
        };
        let (min, max) = (rect.min(), rect.max());
        if !extent_in_domain(min, max, mode) {
            tracing::debug!(index, "footprint extent left out of the collection centre");
            continue;
        }
        bounds = Some(match bounds {
            None => (min.x, min.y, max.x, max.y),
            Some((x0, y0, x1, y1)) => (x0.min(min.x), y0.min(min.y), x1.max(max.x), y1.max(max.y)),
        });
    }
    bounds.map(|(x0, y0, x1, y1)| GeoPoint::new((x0 + x1) / 2.0, (y0 + y1) / 2.0))
}

fn extent_in_domain(min: Coord<f64>, max: Coord<f64>, mode: CoordinateMode) -> bool {
    let finite = [min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite());
    match mode {
        CoordinateMode::Planar => finite,
        CoordinateMode::Geographic => {
            finite && min.x >= -180.0 && max.x <= 180.0 && min.y >= -90.0 && max.y <= 90.0
        }
    }
}

/// 2D profile of a polygon footprint
#[derive(Debug, Clone)]
pub struct Profile2D {
    /// Outer boundary, closing point removed
    pub outer: Vec<Point2<f64>>,
    /// Holes, closing point removed
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl Profile2D {
    /// Extract the rings of a `geo` polygon
    pub fn from_polygon(polygon: &Polygon<f64>) -> Self {
        Self {
            outer: open_ring(polygon.exterior()),
            holes: polygon.interiors().iter().map(open_ring).collect(),
        }
    }

    /// Constrained triangulation of the outer ring and holes
    pub fn triangulate(&self) -> Result<PlanarMesh> {
        triangulate(&self.outer, &self.holes)
    }
}

/// Ring points without the repeated closing point
fn open_ring(ring: &LineString<f64>) -> Vec<Point2<f64>> {
    let mut points: Vec<Point2<f64>> = ring.coords().map(|c| Point2::new(c.x, c.y)).collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Area-weighted centroid of a polygon
pub fn polygon_centroid(polygon: &Polygon<f64>) -> Result<GeoPoint> {
    polygon
        .centroid()
        .map(GeoPoint::from)
        .ok_or_else(|| Error::InvalidFootprint("polygon has no centroid".to_string()))
}
