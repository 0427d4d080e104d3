// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geographic to local planar projection
//!
//! Footprints arrive as WGS-84 longitude/latitude. Each point is placed in a
//! local metric frame around a reference centre by measuring two ellipsoidal
//! distances (along the centre's meridian and along the centre's parallel),
//! signing them by quadrant and turning the result a quarter turn so that the
//! first planar axis follows north-south and the second east-west.

use crate::error::{Error, Result};
use crate::transform::rotate_2d;
use geo::{Coord, GeodesicDistance, Point};
use nalgebra::{Point2, Vector2};

/// Angle applied to the signed `(east-west, -north-south)` vector
const FRAME_ROTATION_DEGREES: f64 = -90.0;

/// Geographic coordinate in degrees (WGS-84)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    #[inline]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Check the coordinate is finite and inside the WGS-84 domain
    pub fn validate(&self) -> Result<()> {
        if !self.lon.is_finite() || !self.lat.is_finite() {
            return Err(Error::GeodesyError(format!(
                "non-finite coordinate ({}, {})",
                self.lon, self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(Error::GeodesyError(format!(
                "longitude {} outside [-180, 180]",
                self.lon
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(Error::GeodesyError(format!(
                "latitude {} outside [-90, 90]",
                self.lat
            )));
        }
        Ok(())
    }

    /// Same coordinate as a planar point (x = lon, y = lat)
    #[inline]
    pub fn to_planar(self) -> Point2<f64> {
        Point2::new(self.lon, self.lat)
    }
}

impl From<Coord<f64>> for GeoPoint {
    #[inline]
    fn from(c: Coord<f64>) -> Self {
        Self::new(c.x, c.y)
    }
}

impl From<Point<f64>> for GeoPoint {
    #[inline]
    fn from(p: Point<f64>) -> Self {
        Self::new(p.x(), p.y())
    }
}

impl From<Point2<f64>> for GeoPoint {
    #[inline]
    fn from(p: Point2<f64>) -> Self {
        Self::new(p.x, p.y)
    }
}

impl From<GeoPoint> for Point<f64> {
    #[inline]
    fn from(g: GeoPoint) -> Self {
        Point::new(g.lon, g.lat)
    }
}

/// Maps a source coordinate into the local planar frame
///
/// The extruder only needs this narrow seam, which lets callers choose between
/// geodesic projection of lon/lat input and plain offsetting of input that is
/// already metric.
pub trait Projection: Sync {
    fn project(&self, target: Point2<f64>) -> Result<Point2<f64>>;
}

/// Geodesic projection around a fixed centre
#[derive(Debug, Clone, Copy)]
pub struct GeodesicProjection {
    pub center: GeoPoint,
}

impl GeodesicProjection {
    pub fn new(center: GeoPoint) -> Result<Self> {
        center.validate()?;
        Ok(Self { center })
    }
}

impl Projection for GeodesicProjection {
    #[inline]
    fn project(&self, target: Point2<f64>) -> Result<Point2<f64>> {
        project(GeoPoint::from(target), self.center)
    }
}

/// Offset projection for coordinates that are already in metres
///
/// Uses the same axis convention as [`GeodesicProjection`]: the first planar
/// axis follows the source y axis and the second the source x axis.
#[derive(Debug, Clone, Copy)]
pub struct PlanarProjection {
    pub origin: Point2<f64>,
}

impl PlanarProjection {
    pub fn new(origin: Point2<f64>) -> Self {
        Self { origin }
    }
}

impl Projection for PlanarProjection {
    #[inline]
    fn project(&self, target: Point2<f64>) -> Result<Point2<f64>> {
        if !target.x.is_finite() || !target.y.is_finite() {
            return Err(Error::GeodesyError(format!(
                "non-finite coordinate ({}, {})",
                target.x, target.y
            )));
        }
        let dx = target.x - self.origin.x;
        let dy = target.y - self.origin.y;
        let rotated = rotate_2d(Vector2::new(dx, -dy), FRAME_ROTATION_DEGREES);
        Ok(Point2::new(rotated.x, rotated.y))
    }
}

/// WGS-84 geodesic distance in metres
#[inline]
fn geodesic_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    Point::from(a).geodesic_distance(&Point::from(b))
}

/// Project `target` into the local planar frame centred on `center`
///
/// Returns `(x, y)` in metres where `x` is (up to float residue) the signed
/// north-south distance and `y` the signed east-west distance.
///
/// Signs come from the quadrant of the raw degree deltas. A zero delta on
/// either axis counts as positive, so a point due west on exactly the same
/// parallel keeps a positive east-west distance.
pub fn project(target: GeoPoint, center: GeoPoint) -> Result<Point2<f64>> {
    target.validate()?;
    center.validate()?;

    let dlon = target.lon - center.lon;
    let dlat = target.lat - center.lat;

    let mut lon_positive = true;
    let mut lat_positive = true;
    if dlon < 0.0 && dlat < 0.0 {
        lon_positive = false;
        lat_positive = false;
    } else if dlon < 0.0 && dlat > 0.0 {
        lon_positive = false;
    } else if dlon > 0.0 && dlat < 0.0 {
        lat_positive = false;
    }

    // Along the centre's meridian, then along the centre's parallel
    let mut north_south = geodesic_distance(
        GeoPoint::new(center.lon, target.lat),
        GeoPoint::new(center.lon, center.lat),
    );
    let mut east_west = geodesic_distance(
        GeoPoint::new(target.lon, center.lat),
        GeoPoint::new(center.lon, center.lat),
    );

    if !lon_positive {
        east_west = -east_west;
    }
    if !lat_positive {
        north_south = -north_south;
    }

    let rotated = rotate_2d(Vector2::new(east_west, -north_south), FRAME_ROTATION_DEGREES);
    Ok(Point2::new(rotated.x, rotated.y))
}
