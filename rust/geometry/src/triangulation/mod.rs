// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Footprint triangulation
//!
//! Rings are turned into a planar straight-line graph (vertices, boundary
//! segments and one seed point per hole) and handed to a
//! [`TriangulationEngine`]. The default engine is [`ConstrainedDelaunay`].
//!
//! Output vertices are the input ring vertices in input order (exterior first,
//! then every hole), which lets the extruder pair bottom and top vertices by
//! index offset.

mod cdt;

pub use cdt::ConstrainedDelaunay;

use crate::error::{Error, Result};
use geo::{Centroid, Coord, InteriorPoint, LineString, Polygon};
use nalgebra::Point2;
use rustc_hash::{FxHashMap, FxHashSet};
use std::ops::Range;

/// Narrow seam around the triangulation algorithm
pub trait TriangulationEngine: Send + Sync {
    /// Triangulate `input`, keeping every segment as a triangle edge,
    /// dropping the hole regions and inserting no extra vertices
    fn triangulate(&self, input: &Pslg) -> Result<PlanarMesh>;
}

/// Planar straight-line graph handed to an engine
#[derive(Debug, Clone, Default)]
pub struct Pslg {
    /// Exterior ring vertices followed by each hole's vertices
    pub vertices: Vec<Point2<f64>>,
    /// Constraint edges: consecutive pairs plus the closing edge of every ring
    pub segments: Vec<[usize; 2]>,
    /// One point strictly inside each hole
    pub holes: Vec<Point2<f64>>,
    /// Index range of each ring in `vertices` (exterior first)
    pub rings: Vec<Range<usize>>,
}

impl Pslg {
    /// Build and validate the graph for an exterior ring and its holes
    ///
    /// Rings may be passed open or closed; a repeated closing point and
    /// consecutive duplicates are dropped.
    pub fn from_rings(exterior: &[Point2<f64>], holes: &[Vec<Point2<f64>>]) -> Result<Self> {
        let exterior = clean_ring(exterior, "exterior ring")?;
        let mut cleaned_holes = Vec::with_capacity(holes.len());
        for (i, hole) in holes.iter().enumerate() {
            cleaned_holes.push(clean_ring(hole, &format!("hole {}", i))?);
        }

        let total = exterior.len() + cleaned_holes.iter().map(|h| h.len()).sum::<usize>();
        let mut pslg = Pslg {
            vertices: Vec::with_capacity(total),
            segments: Vec::with_capacity(total),
            holes: Vec::with_capacity(cleaned_holes.len()),
            rings: Vec::with_capacity(cleaned_holes.len() + 1),
        };

        pslg.push_ring(&exterior);
        for hole in &cleaned_holes {
            pslg.push_ring(hole);
        }

        pslg.check_simple()?;
        pslg.check_holes_enclosed()?;

        for (i, hole) in cleaned_holes.iter().enumerate() {
            pslg.holes.push(hole_seed(hole, i)?);
        }

        Ok(pslg)
    }

    /// Append a ring: its vertices plus `(i, i + 1)` pairs and the closing edge
    fn push_ring(&mut self, ring: &[Point2<f64>]) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(ring);
        for i in 0..ring.len() - 1 {
            self.segments.push([offset + i, offset + i + 1]);
        }
        self.segments.push([offset + ring.len() - 1, offset]);
        self.rings.push(offset..offset + ring.len());
    }

    fn ring_points(&self, ring: usize) -> &[Point2<f64>] {
        &self.vertices[self.rings[ring].clone()]
    }

    /// Reject touching or crossing boundary segments
    fn check_simple(&self) -> Result<()> {
        let boxes: Vec<[f64; 4]> = self
            .segments
            .iter()
            .map(|&[a, b]| {
                let (p, q) = (self.vertices[a], self.vertices[b]);
                [p.x.min(q.x), p.y.min(q.y), p.x.max(q.x), p.y.max(q.y)]
            })
            .collect();

        for i in 0..self.segments.len() {
            let [a, b] = self.segments[i];
            for j in (i + 1)..self.segments.len() {
                let [c, d] = self.segments[j];
                let (bi, bj) = (&boxes[i], &boxes[j]);
                if bi[0] > bj[2] || bj[0] > bi[2] || bi[1] > bj[3] || bj[1] > bi[3] {
                    continue;
                }

                let shared = if a == c || a == d {
                    Some(a)
                } else if b == c || b == d {
                    Some(b)
                } else {
                    None
                };

                let (p, q, r, s) = (
                    self.vertices[a],
                    self.vertices[b],
                    self.vertices[c],
                    self.vertices[d],
                );

                match shared {
                    Some(v) => {
                        // Neighbouring segments may only meet at their common vertex
                        let mid = self.vertices[v];
                        let other1 = if a == v { q } else { p };
                        let other2 = if c == v { s } else { r };
                        if orient(mid, other1, other2) == 0.0 && folds_back(mid, other1, other2) {
                            return Err(Error::TriangulationError(format!(
                                "boundary folds back on itself at vertex {}",
                                v
                            )));
                        }
                    }
                    None => {
                        if segments_intersect(p, q, r, s) {
                            return Err(Error::TriangulationError(format!(
                                "self-intersecting boundary: segment {}-{} meets segment {}-{}",
                                a, b, c, d
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Every hole must sit inside the exterior and outside the other holes
    fn check_holes_enclosed(&self) -> Result<()> {
        let exterior = self.ring_points(0);
        for hole in 1..self.rings.len() {
            // Boundaries do not touch, so one vertex decides the whole ring
            let corner = self.vertices[self.rings[hole].start];
            if !point_in_ring(corner, exterior) {
                return Err(Error::TriangulationError(format!(
                    "hole {} is not enclosed by the exterior ring",
                    hole - 1
                )));
            }
            for other in 1..self.rings.len() {
                if other != hole && point_in_ring(corner, self.ring_points(other)) {
                    return Err(Error::TriangulationError(format!(
                        "hole {} lies inside hole {}",
                        hole - 1,
                        other - 1
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Planar triangle mesh of one footprint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanarMesh {
    /// Input vertices, in input order
    pub vertices: Vec<Point2<f64>>,
    /// Counter-clockwise vertex index triples
    pub triangles: Vec<[usize; 3]>,
    /// Every distinct triangle edge, lower index first, in first-use order
    pub edges: Vec<[usize; 2]>,
    /// Constraint segments the mesh was built with
    pub segments: Vec<[usize; 2]>,
}

impl PlanarMesh {
    /// Assemble a mesh from engine output and derive its edge list
    pub fn from_triangles(
        vertices: Vec<Point2<f64>>,
        triangles: Vec<[usize; 3]>,
        segments: Vec<[usize; 2]>,
    ) -> Self {
        let mut seen: FxHashSet<[usize; 2]> = FxHashSet::default();
        let mut edges = Vec::with_capacity(triangles.len() * 3 / 2 + 2);
        for tri in &triangles {
            for k in 0..3 {
                let edge = undirected(tri[k], tri[(k + 1) % 3]);
                if seen.insert(edge) {
                    edges.push(edge);
                }
            }
        }
        Self {
            vertices,
            triangles,
            edges,
            segments,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Coordinate of a single vertex index
    pub fn vertex(&self, index: usize) -> Result<Point2<f64>> {
        self.vertices.get(index).copied().ok_or_else(|| {
            Error::TriangulationError(format!(
                "vertex index {} out of range ({} vertices)",
                index,
                self.vertices.len()
            ))
        })
    }

    /// Coordinates of a batch of vertex indices, in the given order
    pub fn vertices_at(&self, indices: &[usize]) -> Result<Vec<Point2<f64>>> {
        indices.iter().map(|&i| self.vertex(i)).collect()
    }

    /// Corner coordinates of one triangle
    pub fn triangle_corners(&self, triangle: usize) -> Result<[Point2<f64>; 3]> {
        let tri = self.triangles.get(triangle).ok_or_else(|| {
            Error::TriangulationError(format!("triangle index {} out of range", triangle))
        })?;
        Ok([
            self.vertex(tri[0])?,
            self.vertex(tri[1])?,
            self.vertex(tri[2])?,
        ])
    }

    /// Edge endpoints as coordinates, for plotting and diagnostics
    pub fn edge_segments(&self) -> Result<Vec<[Point2<f64>; 2]>> {
        self.edges
            .iter()
            .map(|edge| {
                let pts = self.vertices_at(edge)?;
                Ok([pts[0], pts[1]])
            })
            .collect()
    }

    /// Edges used by exactly one triangle
    pub fn boundary_edges(&self) -> Vec<[usize; 2]> {
        let mut uses: FxHashMap<[usize; 2], u32> = FxHashMap::default();
        for tri in &self.triangles {
            for k in 0..3 {
                *uses.entry(undirected(tri[k], tri[(k + 1) % 3])).or_insert(0) += 1;
            }
        }
        self.edges
            .iter()
            .copied()
            .filter(|e| uses.get(e) == Some(&1))
            .collect()
    }
}

/// Triangulate a footprint with the default engine
///
/// With no holes this is the plain constrained triangulation of the exterior;
/// with holes the hole regions are seeded and removed in the same run.
pub fn triangulate(exterior: &[Point2<f64>], holes: &[Vec<Point2<f64>>]) -> Result<PlanarMesh> {
    triangulate_with(&ConstrainedDelaunay, exterior, holes)
}

/// Triangulate a footprint with a caller-chosen engine
pub fn triangulate_with<E: TriangulationEngine + ?Sized>(
    engine: &E,
    exterior: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<PlanarMesh> {
    let pslg = Pslg::from_rings(exterior, holes)?;
    let mesh = engine.triangulate(&pslg)?;

    if mesh.is_empty() {
        return Err(Error::TriangulationError(
            "triangulation produced no triangles".to_string(),
        ));
    }

    tracing::trace!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        edges = ?mesh.edge_segments().unwrap_or_default(),
        "triangulated footprint"
    );

    Ok(mesh)
}

/// Drop closing and consecutive duplicate points, then reject degenerate rings
fn clean_ring(ring: &[Point2<f64>], label: &str) -> Result<Vec<Point2<f64>>> {
    let mut cleaned: Vec<Point2<f64>> = Vec::with_capacity(ring.len());
    for p in ring {
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(Error::TriangulationError(format!(
                "{} has a non-finite coordinate",
                label
            )));
        }
        if cleaned.last() != Some(p) {
            cleaned.push(*p);
        }
    }
    while cleaned.len() > 1 && cleaned.first() == cleaned.last() {
        cleaned.pop();
    }

    if cleaned.len() < 3 {
        return Err(Error::TriangulationError(format!(
            "{} has {} distinct points, need at least 3",
            label,
            cleaned.len()
        )));
    }
    if signed_area(&cleaned) == 0.0 {
        return Err(Error::TriangulationError(format!("{} has zero area", label)));
    }

    Ok(cleaned)
}

/// Seed point for a hole: the ring centroid, or an interior point when the
/// centroid falls outside a concave hole
fn hole_seed(ring: &[Point2<f64>], hole: usize) -> Result<Point2<f64>> {
    let mut coords: Vec<Coord<f64>> = ring.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    coords.push(coords[0]);
    let line = LineString::new(coords);

    if let Some(c) = line.centroid() {
        let seed = Point2::new(c.x(), c.y());
        if point_in_ring(seed, ring) {
            return Ok(seed);
        }
    }

    let polygon = Polygon::new(line, Vec::new());
    match polygon.interior_point() {
        Some(p) if point_in_ring(Point2::new(p.x(), p.y()), ring) => Ok(Point2::new(p.x(), p.y())),
        _ => Err(Error::TriangulationError(format!(
            "no interior seed point found for hole {}",
            hole
        ))),
    }
}

#[inline]
pub(crate) fn undirected(a: usize, b: usize) -> [usize; 2] {
    if a < b {
        [a, b]
    } else {
        [b, a]
    }
}

/// Exact orientation: positive when `a`, `b`, `c` turn counter-clockwise
#[inline]
pub(crate) fn orient(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
    robust::orient2d(
        robust::Coord { x: a.x, y: a.y },
        robust::Coord { x: b.x, y: b.y },
        robust::Coord { x: c.x, y: c.y },
    )
}

/// Exact in-circle test: positive when `d` is inside the circle through the
/// counter-clockwise triangle `a`, `b`, `c`
#[inline]
pub(crate) fn incircle(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>, d: Point2<f64>) -> f64 {
    robust::incircle(
        robust::Coord { x: a.x, y: a.y },
        robust::Coord { x: b.x, y: b.y },
        robust::Coord { x: c.x, y: c.y },
        robust::Coord { x: d.x, y: d.y },
    )
}

#[inline]
fn opposite_signs(a: f64, b: f64) -> bool {
    (a > 0.0 && b < 0.0) || (a < 0.0 && b > 0.0)
}

/// Collinear point `p` lies within the bounding box of `a`-`b`
#[inline]
fn within_span(a: Point2<f64>, b: Point2<f64>, p: Point2<f64>) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Two collinear segments sharing `mid` overlap when they leave it the same way
#[inline]
fn folds_back(mid: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> bool {
    (a - mid).dot(&(b - mid)) > 0.0
}

/// Closed segment intersection, touching included
pub(crate) fn segments_intersect(
    p: Point2<f64>,
    q: Point2<f64>,
    r: Point2<f64>,
    s: Point2<f64>,
) -> bool {
    let d1 = orient(r, s, p);
    let d2 = orient(r, s, q);
    let d3 = orient(p, q, r);
    let d4 = orient(p, q, s);

    if opposite_signs(d1, d2) && opposite_signs(d3, d4) {
        return true;
    }

    (d1 == 0.0 && within_span(r, s, p))
        || (d2 == 0.0 && within_span(r, s, q))
        || (d3 == 0.0 && within_span(p, q, r))
        || (d4 == 0.0 && within_span(p, q, s))
}

/// Winding-number containment; points on the boundary are unspecified
pub(crate) fn point_in_ring(p: Point2<f64>, ring: &[Point2<f64>]) -> bool {
    let n = ring.len();
    let mut winding = 0i32;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        if a.y <= p.y {
            if b.y > p.y && orient(a, b, p) > 0.0 {
                winding += 1;
            }
        } else if b.y <= p.y && orient(a, b, p) < 0.0 {
            winding -= 1;
        }
    }
    winding != 0
}

/// Shoelace area, positive for counter-clockwise rings
pub(crate) fn signed_area(ring: &[Point2<f64>]) -> f64 {
    let n = ring.len();
    let mut twice = 0.0;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        twice += a.x * b.y - b.x * a.y;
    }
    twice / 2.0
}
