// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extrusion operations - turning a planar footprint mesh into a prism
//!
//! The height axis is the second coordinate: every planar vertex is projected
//! to `(x, z)` and emitted once at the base height and once at the top.
//! Face indices are 1-based and local to the prism; the assembler shifts them
//! when merging.

use crate::error::{Error, Result};
use crate::geodesy::{GeoPoint, GeodesicProjection, Projection};
use crate::triangulation::PlanarMesh;
use nalgebra::{Point2, Point3};
use rustc_hash::FxHashSet;

/// Which triangle edges receive vertical walls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WallMode {
    /// Every edge of every triangle, interior edges included
    #[default]
    AllEdges,
    /// Only edges used by a single triangle (the footprint outline and holes)
    BoundaryEdges,
}

/// Winding of the two cap triangulations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CapWinding {
    /// Top and bottom reuse the planar triangle order
    #[default]
    Shared,
    /// Bottom normals face down, top normals face up
    Outward,
}

/// Extrusion options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtrudeOptions {
    pub walls: WallMode,
    pub caps: CapWinding,
}

/// Extruded solid of one footprint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prism {
    /// Bottom ring of vertices followed by the top ring
    pub positions: Vec<Point3<f64>>,
    /// 1-based indices local to this prism
    pub faces: Vec<[u32; 3]>,
}

impl Prism {
    /// Shift every position in the ground plane
    #[inline]
    pub fn translate(&mut self, dx: f64, dz: f64) {
        for p in &mut self.positions {
            p.x += dx;
            p.z += dz;
        }
    }
}

/// Extrude with a geodesic projection around `center` and default options
#[inline]
pub fn extrude(mesh: &PlanarMesh, center: GeoPoint, base_height: f64, wall_height: f64) -> Result<Prism> {
    let projection = GeodesicProjection::new(center)?;
    extrude_with(mesh, &projection, base_height, wall_height, &ExtrudeOptions::default())
}

/// Extrude a planar mesh between `base_height` and `base_height + wall_height`
pub fn extrude_with<P: Projection + ?Sized>(
    mesh: &PlanarMesh,
    projection: &P,
    base_height: f64,
    wall_height: f64,
    options: &ExtrudeOptions,
) -> Result<Prism> {
    if !base_height.is_finite() || !wall_height.is_finite() {
        return Err(Error::InvalidExtrusion(format!(
            "heights must be finite (base {}, wall {})",
            base_height, wall_height
        )));
    }
    if mesh.is_empty() {
        return Err(Error::InvalidExtrusion("planar mesh has no triangles".to_string()));
    }

    let vertex_count = mesh.vertex_count();
    if let Some(t) = mesh
        .triangles
        .iter()
        .position(|tri| tri.iter().any(|&i| i >= vertex_count))
    {
        return Err(Error::InvalidExtrusion(format!(
            "triangle {} references a vertex beyond {}",
            t, vertex_count
        )));
    }
    let offset = u32::try_from(vertex_count)
        .ok()
        .filter(|v| v.checked_mul(2).is_some())
        .ok_or_else(|| Error::InvalidExtrusion("too many vertices".to_string()))?;

    let projected: Vec<Point2<f64>> = mesh
        .vertices
        .iter()
        .map(|v| projection.project(*v))
        .collect::<Result<_>>()?;

    let top_height = base_height + wall_height;
    let mut positions = Vec::with_capacity(vertex_count * 2);
    positions.extend(projected.iter().map(|p| Point3::new(p.x, base_height, p.y)));
    positions.extend(projected.iter().map(|p| Point3::new(p.x, top_height, p.y)));

    let boundary = match options.walls {
        WallMode::AllEdges => None,
        WallMode::BoundaryEdges => Some(mesh.boundary_edges().into_iter().collect::<FxHashSet<_>>()),
    };
    let wall_faces = boundary.as_ref().map_or(6 * mesh.triangle_count(), |b| 2 * b.len());
    let mut faces = Vec::with_capacity(2 * mesh.triangle_count() + wall_faces);

    // Bottom caps
    for tri in &mesh.triangles {
        let [i, j, k] = local_indices(tri);
        faces.push(match options.caps {
            CapWinding::Shared => [i, j, k],
            CapWinding::Outward if ccw(&projected, tri) => [i, j, k],
            CapWinding::Outward => [i, k, j],
        });
    }

    // Top caps
    for tri in &mesh.triangles {
        let [i, j, k] = local_indices(tri);
        let (i, j, k) = (i + offset, j + offset, k + offset);
        faces.push(match options.caps {
            CapWinding::Shared => [i, j, k],
            CapWinding::Outward if ccw(&projected, tri) => [i, k, j],
            CapWinding::Outward => [i, j, k],
        });
    }

    // Side walls, one quad per triangle edge
    for tri in &mesh.triangles {
        let local = local_indices(tri);
        for e in 0..3 {
            let (a, b) = (tri[e], tri[(e + 1) % 3]);
            if let Some(edges) = &boundary {
                let key = if a < b { [a, b] } else { [b, a] };
                if !edges.contains(&key) {
                    continue;
                }
            }
            let (ba, bb) = (local[e], local[(e + 1) % 3]);
            let (ta, tb) = (ba + offset, bb + offset);
            faces.push([ba, bb, tb]);
            faces.push([ba, tb, ta]);
        }
    }

    tracing::trace!(
        vertices = positions.len(),
        faces = faces.len(),
        "extruded footprint"
    );

    Ok(Prism { positions, faces })
}

/// 1-based local indices of a planar triangle
#[inline]
fn local_indices(tri: &[usize; 3]) -> [u32; 3] {
    [tri[0] as u32 + 1, tri[1] as u32 + 1, tri[2] as u32 + 1]
}

/// Counter-clockwise in the projected `(x, z)` plane
///
/// In the `(x, height, z)` frame a counter-clockwise `(x, z)` triangle has a
/// normal pointing down the height axis.
#[inline]
fn ccw(projected: &[Point2<f64>], tri: &[usize; 3]) -> bool {
    let (a, b, c) = (projected[tri[0]], projected[tri[1]], projected[tri[2]]);
    (b - a).perp(&(c - a)) > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::PlanarProjection;
    use crate::triangulation::triangulate;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn square() -> PlanarMesh {
        triangulate(
            &[
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
                Point2::new(0.0, 10.0),
            ],
            &[],
        )
        .unwrap()
    }

    fn square_with_hole() -> PlanarMesh {
        triangulate(
            &[
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
                Point2::new(0.0, 10.0),
            ],
            &[vec![
                Point2::new(4.0, 4.0),
                Point2::new(6.0, 4.0),
                Point2::new(6.0, 6.0),
                Point2::new(4.0, 6.0),
            ]],
        )
        .unwrap()
    }

    fn normal(prism: &Prism, face: [u32; 3]) -> Vector3<f64> {
        let p = |i: u32| prism.positions[i as usize - 1];
        (p(face[1]) - p(face[0])).cross(&(p(face[2]) - p(face[0])))
    }

    #[test]
    fn test_extrude_square() {
        let mesh = square();
        let projection = PlanarProjection::new(Point2::new(5.0, 5.0));
        let prism = extrude_with(&mesh, &projection, 0.0, 3.0, &ExtrudeOptions::default()).unwrap();

        assert_eq!(prism.positions.len(), 8);
        assert_eq!(prism.faces.len(), 8 * mesh.triangle_count());

        for (i, p) in prism.positions.iter().enumerate() {
            assert!(p.x.abs() <= 5.0 + 1e-9 && p.z.abs() <= 5.0 + 1e-9);
            let expected = if i < 4 { 0.0 } else { 3.0 };
            assert_eq!(p.y, expected);
        }
        // Top vertex i+4 sits above bottom vertex i
        for i in 0..4 {
            assert_eq!(prism.positions[i].x, prism.positions[i + 4].x);
            assert_eq!(prism.positions[i].z, prism.positions[i + 4].z);
        }
    }

    #[test]
    fn test_face_layout() {
        let mesh = square();
        let projection = PlanarProjection::new(Point2::new(5.0, 5.0));
        let prism = extrude_with(&mesh, &projection, 1.0, 2.0, &ExtrudeOptions::default()).unwrap();

        let t = mesh.triangle_count();
        let [i, j, k] = local_indices(&mesh.triangles[0]);
        assert_eq!(prism.faces[0], [i, j, k]);
        assert_eq!(prism.faces[t], [i + 4, j + 4, k + 4]);
        assert_eq!(
            &prism.faces[2 * t..2 * t + 6],
            &[
                [i, j, j + 4],
                [i, j + 4, i + 4],
                [j, k, k + 4],
                [j, k + 4, j + 4],
                [k, i, i + 4],
                [k, i + 4, k + 4],
            ]
        );
        assert!(prism.faces.iter().flatten().all(|&f| f >= 1 && f <= 8));
    }

    #[test]
    fn test_counts_with_hole() {
        let mesh = square_with_hole();
        let projection = PlanarProjection::new(Point2::new(5.0, 5.0));
        let prism = extrude_with(&mesh, &projection, 0.0, 3.0, &ExtrudeOptions::default()).unwrap();
        assert_eq!(prism.positions.len(), 2 * mesh.vertex_count());
        assert_eq!(prism.faces.len(), 8 * mesh.triangle_count());
    }

    #[test]
    fn test_boundary_walls_only() {
        let mesh = square_with_hole();
        let projection = PlanarProjection::new(Point2::new(5.0, 5.0));
        let options = ExtrudeOptions {
            walls: WallMode::BoundaryEdges,
            ..Default::default()
        };
        let prism = extrude_with(&mesh, &projection, 0.0, 3.0, &options).unwrap();
        let boundary = mesh.boundary_edges().len();
        assert_eq!(boundary, 8);
        assert_eq!(prism.faces.len(), 2 * mesh.triangle_count() + 2 * boundary);
    }

    #[test]
    fn test_shared_caps_face_the_same_way() {
        let mesh = square();
        let projection = PlanarProjection::new(Point2::new(5.0, 5.0));
        let prism = extrude_with(&mesh, &projection, 0.0, 3.0, &ExtrudeOptions::default()).unwrap();
        let t = mesh.triangle_count();
        let bottom = normal(&prism, prism.faces[0]);
        let top = normal(&prism, prism.faces[t]);
        assert!(bottom.y * top.y > 0.0);
    }

    #[test]
    fn test_outward_caps() {
        let mesh = square_with_hole();
        let projection = PlanarProjection::new(Point2::new(5.0, 5.0));
        let options = ExtrudeOptions {
            caps: CapWinding::Outward,
            ..Default::default()
        };
        let prism = extrude_with(&mesh, &projection, 0.0, 3.0, &options).unwrap();
        let t = mesh.triangle_count();
        for f in &prism.faces[..t] {
            assert!(normal(&prism, *f).y < 0.0);
        }
        for f in &prism.faces[t..2 * t] {
            assert!(normal(&prism, *f).y > 0.0);
        }
    }

    #[test]
    fn test_geodesic_extrude() {
        let center = GeoPoint::new(116.39, 39.91);
        let d = 0.0001;
        let mesh = triangulate(
            &[
                Point2::new(center.lon - d, center.lat - d),
                Point2::new(center.lon + d, center.lat - d),
                Point2::new(center.lon + d, center.lat + d),
                Point2::new(center.lon - d, center.lat + d),
            ],
            &[],
        )
        .unwrap();
        let prism = extrude(&mesh, center, 10.0, 5.0).unwrap();
        assert_eq!(prism.positions.len(), 8);
        // ~11 m north-south and ~8.5 m east-west either side of the centre
        let (x, z) = (prism.positions[2].x, prism.positions[2].z);
        assert_relative_eq!(x, 11.1, epsilon = 0.1);
        assert_relative_eq!(z, 8.5, epsilon = 0.1);
        assert_eq!(prism.positions[6].y, 15.0);
    }

    #[test]
    fn test_translate() {
        let mesh = square();
        let projection = PlanarProjection::new(Point2::new(5.0, 5.0));
        let mut prism = extrude_with(&mesh, &projection, 0.0, 3.0, &ExtrudeOptions::default()).unwrap();
        let before = prism.positions[0];
        prism.translate(100.0, -50.0);
        assert_eq!(prism.positions[0].x, before.x + 100.0);
        assert_eq!(prism.positions[0].y, before.y);
        assert_eq!(prism.positions[0].z, before.z - 50.0);
    }

    #[test]
    fn test_invalid_heights() {
        let mesh = square();
        let projection = PlanarProjection::new(Point2::new(5.0, 5.0));
        let result = extrude_with(&mesh, &projection, f64::NAN, 3.0, &ExtrudeOptions::default());
        assert!(matches!(result, Err(Error::InvalidExtrusion(_))));
        let result = extrude_with(&mesh, &projection, 0.0, f64::INFINITY, &ExtrudeOptions::default());
        assert!(matches!(result, Err(Error::InvalidExtrusion(_))));
    }

    #[test]
    fn test_out_of_range_triangle_rejected() {
        let mut mesh = square();
        mesh.triangles.push([0, 2, 9]);
        let projection = PlanarProjection::new(Point2::new(5.0, 5.0));
        for caps in [CapWinding::Shared, CapWinding::Outward] {
            let options = ExtrudeOptions {
                caps,
                ..Default::default()
            };
            let err = extrude_with(&mesh, &projection, 0.0, 3.0, &options).unwrap_err();
            assert!(matches!(err, Error::InvalidExtrusion(_)), "{:?}", err);
        }
    }
}
