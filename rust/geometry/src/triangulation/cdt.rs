// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Constrained Delaunay triangulation
//!
//! Incremental Lawson insertion inside a bounding super-triangle, followed by
//! constraint recovery through edge flips and re-legalisation of every edge
//! that is not a constraint. Triangles outside the segment-bounded region and
//! inside seeded holes are then removed by flood fill. All geometric decisions
//! use exact `robust` predicates.

use super::{incircle, orient, undirected, PlanarMesh, Pslg, TriangulationEngine};
use crate::error::{Error, Result};
use nalgebra::Point2;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Scale of the super-triangle relative to the input extent
const SUPER_TRIANGLE_SCALE: f64 = 20.0;

/// Constrained Delaunay engine; output vertices are exactly the input vertices
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstrainedDelaunay;

impl TriangulationEngine for ConstrainedDelaunay {
    fn triangulate(&self, input: &Pslg) -> Result<PlanarMesh> {
        let input_len = input.vertices.len();
        if input_len < 3 {
            return Err(Error::TriangulationError(
                "Need at least 3 points to triangulate".to_string(),
            ));
        }

        let mut tri = Triangulation::new(&input.vertices);
        for vertex in 0..input_len {
            tri.insert_vertex(vertex)?;
        }
        for &[a, b] in &input.segments {
            if a >= input_len || b >= input_len {
                return Err(Error::TriangulationError(format!(
                    "segment {}-{} references a missing vertex",
                    a, b
                )));
            }
            tri.insert_constraint(a, b)?;
        }
        tri.carve(&input.holes);

        let triangles = tri.into_triangles();
        if triangles.is_empty() {
            return Err(Error::TriangulationError(
                "no triangles left inside the boundary".to_string(),
            ));
        }

        Ok(PlanarMesh::from_triangles(
            input.vertices.clone(),
            triangles,
            input.segments.clone(),
        ))
    }
}

/// Where a vertex falls in the current triangulation
enum Location {
    Inside(usize),
    /// Triangle and its directed edge the point lies on
    OnEdge(usize, usize, usize),
    Coincident(usize),
}

/// Working triangulation over the input points plus three super vertices
struct Triangulation {
    points: Vec<Point2<f64>>,
    input_len: usize,
    /// Counter-clockwise triangles; dead slots are kept and skipped
    triangles: Vec<[usize; 3]>,
    alive: Vec<bool>,
    /// Directed edge -> triangle owning it
    half_edges: FxHashMap<(usize, usize), usize>,
    /// Most recent triangle created around each vertex
    vertex_triangle: Vec<usize>,
    /// Undirected constraint edges
    constrained: FxHashSet<[usize; 2]>,
    /// Walk start hint
    last: usize,
}

impl Triangulation {
    fn new(input: &[Point2<f64>]) -> Self {
        let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
        let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
        for p in input {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let cx = (min_x + max_x) / 2.0;
        let cy = (min_y + max_y) / 2.0;
        let span = (max_x - min_x).max(max_y - min_y);
        let d = if span > 0.0 { span } else { 1.0 };

        let input_len = input.len();
        let mut points = Vec::with_capacity(input_len + 3);
        points.extend_from_slice(input);
        points.push(Point2::new(cx - SUPER_TRIANGLE_SCALE * d, cy - d));
        points.push(Point2::new(cx + SUPER_TRIANGLE_SCALE * d, cy - d));
        points.push(Point2::new(cx, cy + SUPER_TRIANGLE_SCALE * d));

        let mut tri = Self {
            points,
            input_len,
            triangles: Vec::with_capacity(input_len * 4),
            alive: Vec::with_capacity(input_len * 4),
            half_edges: FxHashMap::default(),
            vertex_triangle: vec![0; input_len + 3],
            constrained: FxHashSet::default(),
            last: 0,
        };
        tri.push_triangle([input_len, input_len + 1, input_len + 2]);
        tri
    }

    #[inline]
    fn orient(&self, a: usize, b: usize, c: usize) -> f64 {
        orient(self.points[a], self.points[b], self.points[c])
    }

    #[inline]
    fn is_super(&self, v: usize) -> bool {
        v >= self.input_len
    }

    #[inline]
    fn is_constrained(&self, a: usize, b: usize) -> bool {
        self.constrained.contains(&undirected(a, b))
    }

    fn push_triangle(&mut self, v: [usize; 3]) -> usize {
        let t = self.triangles.len();
        self.triangles.push(v);
        self.alive.push(true);
        for k in 0..3 {
            self.half_edges.insert((v[k], v[(k + 1) % 3]), t);
            self.vertex_triangle[v[k]] = t;
        }
        t
    }

    fn kill_triangle(&mut self, t: usize) {
        if !self.alive[t] {
            return;
        }
        self.alive[t] = false;
        let v = self.triangles[t];
        for k in 0..3 {
            let edge = (v[k], v[(k + 1) % 3]);
            if self.half_edges.get(&edge) == Some(&t) {
                self.half_edges.remove(&edge);
            }
        }
    }

    /// Third vertex of `t` besides `a` and `b`
    #[inline]
    fn apex(&self, t: usize, a: usize, b: usize) -> usize {
        let v = self.triangles[t];
        if v[0] != a && v[0] != b {
            v[0]
        } else if v[1] != a && v[1] != b {
            v[1]
        } else {
            v[2]
        }
    }

    fn any_alive(&self) -> Option<usize> {
        if self.alive.get(self.last).copied().unwrap_or(false) {
            return Some(self.last);
        }
        (0..self.triangles.len()).rev().find(|&t| self.alive[t])
    }

    /// Visibility walk from the last touched triangle
    fn locate(&self, p: usize) -> Result<Location> {
        let mut t = self.any_alive().ok_or_else(|| {
            Error::TriangulationError("triangulation has no live triangles".to_string())
        })?;
        let max_steps = self.triangles.len() + 16;

        for _ in 0..max_steps {
            let v = self.triangles[t];
            let mut next = None;
            let mut on_edge = None;
            for k in 0..3 {
                let (a, b) = (v[k], v[(k + 1) % 3]);
                let o = self.orient(a, b, p);
                if o < 0.0 {
                    next = self.half_edges.get(&(b, a)).copied();
                    if next.is_none() {
                        return Err(Error::TriangulationError(format!(
                            "vertex {} lies outside the working triangulation",
                            p
                        )));
                    }
                    break;
                } else if o == 0.0 {
                    on_edge = Some((a, b));
                }
            }

            match next {
                Some(n) => t = n,
                None => return Ok(self.classify(t, p, on_edge)),
            }
        }

        self.locate_by_scan(p)
    }

    fn locate_by_scan(&self, p: usize) -> Result<Location> {
        for t in 0..self.triangles.len() {
            if !self.alive[t] {
                continue;
            }
            let v = self.triangles[t];
            let mut on_edge = None;
            let mut inside = true;
            for k in 0..3 {
                let (a, b) = (v[k], v[(k + 1) % 3]);
                let o = self.orient(a, b, p);
                if o < 0.0 {
                    inside = false;
                    break;
                } else if o == 0.0 {
                    on_edge = Some((a, b));
                }
            }
            if inside {
                return Ok(self.classify(t, p, on_edge));
            }
        }
        Err(Error::TriangulationError(format!(
            "vertex {} could not be located",
            p
        )))
    }

    fn classify(&self, t: usize, p: usize, on_edge: Option<(usize, usize)>) -> Location {
        let point = self.points[p];
        if let Some(&q) = self.triangles[t].iter().find(|&&q| self.points[q] == point) {
            return Location::Coincident(q);
        }
        match on_edge {
            Some((a, b)) => Location::OnEdge(t, a, b),
            None => Location::Inside(t),
        }
    }

    fn insert_vertex(&mut self, p: usize) -> Result<()> {
        match self.locate(p)? {
            Location::Coincident(q) => {
                return Err(Error::TriangulationError(format!(
                    "duplicate vertex: {} coincides with {}",
                    p, q
                )));
            }
            Location::Inside(t) => {
                let [a, b, c] = self.triangles[t];
                self.kill_triangle(t);
                self.last = self.push_triangle([a, b, p]);
                self.push_triangle([b, c, p]);
                self.push_triangle([c, a, p]);
                self.legalize(vec![(a, b), (b, c), (c, a)]);
            }
            Location::OnEdge(t, a, b) => {
                let c = self.apex(t, a, b);
                let neighbour = self.half_edges.get(&(b, a)).copied();
                self.kill_triangle(t);
                self.last = self.push_triangle([b, c, p]);
                self.push_triangle([c, a, p]);
                let mut pending = vec![(b, c), (c, a)];
                if let Some(u) = neighbour {
                    let d = self.apex(u, a, b);
                    self.kill_triangle(u);
                    self.push_triangle([a, d, p]);
                    self.push_triangle([d, b, p]);
                    pending.push((a, d));
                    pending.push((d, b));
                }
                self.legalize(pending);
            }
        }
        Ok(())
    }

    /// Replace the diagonal `a`-`b` of a convex quad with the other diagonal
    ///
    /// Returns the new edge `(c, d)`.
    fn flip(&mut self, a: usize, b: usize) -> Option<(usize, usize)> {
        let t1 = *self.half_edges.get(&(a, b))?;
        let t2 = *self.half_edges.get(&(b, a))?;
        let c = self.apex(t1, a, b);
        let d = self.apex(t2, a, b);
        self.kill_triangle(t1);
        self.kill_triangle(t2);
        self.last = self.push_triangle([c, a, d]);
        self.push_triangle([d, b, c]);
        Some((c, d))
    }

    /// Lawson flips until every queued non-constraint edge is locally Delaunay
    fn legalize(&mut self, mut pending: Vec<(usize, usize)>) {
        while let Some((a, b)) = pending.pop() {
            if self.is_constrained(a, b) {
                continue;
            }
            let (t1, t2) = match (self.half_edges.get(&(a, b)), self.half_edges.get(&(b, a))) {
                (Some(&t1), Some(&t2)) => (t1, t2),
                _ => continue,
            };
            let c = self.apex(t1, a, b);
            let d = self.apex(t2, a, b);
            let illegal = incircle(self.points[a], self.points[b], self.points[c], self.points[d]) > 0.0;
            if illegal && self.flip(a, b).is_some() {
                pending.push((a, d));
                pending.push((d, b));
                pending.push((b, c));
                pending.push((c, a));
            }
        }
    }

    /// Segments `a`-`b` and `c`-`d` cross at a single interior point
    #[inline]
    fn crosses(&self, a: usize, b: usize, c: usize, d: usize) -> bool {
        if a == c || a == d || b == c || b == d {
            return false;
        }
        let (o1, o2) = (self.orient(a, b, c), self.orient(a, b, d));
        let (o3, o4) = (self.orient(c, d, a), self.orient(c, d, b));
        ((o1 > 0.0 && o2 < 0.0) || (o1 < 0.0 && o2 > 0.0))
            && ((o3 > 0.0 && o4 < 0.0) || (o3 < 0.0 && o4 > 0.0))
    }

    /// A live triangle with corner `v`
    fn triangle_at(&self, v: usize) -> Option<usize> {
        let hint = self.vertex_triangle[v];
        if self.alive[hint] && self.triangles[hint].contains(&v) {
            return Some(hint);
        }
        (0..self.triangles.len()).find(|&t| self.alive[t] && self.triangles[t].contains(&v))
    }

    /// `v` lies on the open segment `a`-`b`
    fn on_segment(&self, a: usize, b: usize, v: usize) -> bool {
        if v == a || v == b || self.orient(a, b, v) != 0.0 {
            return false;
        }
        let (pa, pb, p) = (self.points[a], self.points[b], self.points[v]);
        (p - pa).dot(&(pb - pa)) > 0.0 && (p - pb).dot(&(pa - pb)) > 0.0
    }

    /// Fail when `u`-`w` is a constraint, else queue it
    fn push_crossing(
        &self,
        crossing: &mut VecDeque<(usize, usize)>,
        a: usize,
        b: usize,
        u: usize,
        w: usize,
    ) -> Result<()> {
        if self.is_constrained(u, w) {
            return Err(Error::TriangulationError(format!(
                "segment {}-{} crosses segment {}-{}",
                a, b, u, w
            )));
        }
        crossing.push_back((u, w));
        Ok(())
    }

    /// Every edge properly crossed by `a`-`b`, in order from `a`
    ///
    /// Rotates around `a` to the triangle the segment leaves through, then
    /// walks across neighbouring triangles until it reaches `b`.
    fn crossing_edges(&self, a: usize, b: usize) -> Result<VecDeque<(usize, usize)>> {
        let passes_through = |v: usize| {
            Error::TriangulationError(format!("segment {}-{} passes through vertex {}", a, b, v))
        };
        let lost = || Error::TriangulationError(format!("could not trace segment {}-{}", a, b));
        let max_steps = self.triangles.len() + 3;

        // Fan around `a`: triangles (a, u, w), stepping across edge a-w
        let mut t = self.triangle_at(a).ok_or_else(lost)?;
        let mut exit = None;
        for _ in 0..max_steps {
            let v = self.triangles[t];
            let k = v.iter().position(|&x| x == a).ok_or_else(lost)?;
            let (u, w) = (v[(k + 1) % 3], v[(k + 2) % 3]);
            if self.on_segment(a, b, u) {
                return Err(passes_through(u));
            }
            if self.crosses(a, b, u, w) {
                exit = Some((u, w));
                break;
            }
            t = *self.half_edges.get(&(a, w)).ok_or_else(lost)?;
        }
        let (mut u, mut w) = exit.ok_or_else(lost)?;

        let mut crossing = VecDeque::new();
        self.push_crossing(&mut crossing, a, b, u, w)?;

        // `u`-`w` is owned by the triangle behind; step into the one ahead
        for _ in 0..max_steps {
            let ahead = *self.half_edges.get(&(w, u)).ok_or_else(lost)?;
            let x = self.apex(ahead, u, w);
            if x == b {
                return Ok(crossing);
            }
            if self.orient(a, b, x) == 0.0 {
                return Err(passes_through(x));
            }
            let same_side_as_u = (self.orient(a, b, x) > 0.0) == (self.orient(a, b, u) > 0.0);
            // Ahead is (w, u, x): leave through x-w or u-x
            (u, w) = if same_side_as_u { (x, w) } else { (u, x) };
            self.push_crossing(&mut crossing, a, b, u, w)?;
        }
        Err(lost())
    }

    /// Force `a`-`b` into the triangulation by flipping the edges it crosses
    fn insert_constraint(&mut self, a: usize, b: usize) -> Result<()> {
        if a == b {
            return Err(Error::TriangulationError(format!(
                "segment {}-{} has zero length",
                a, b
            )));
        }
        if self.half_edges.contains_key(&(a, b)) || self.half_edges.contains_key(&(b, a)) {
            self.constrained.insert(undirected(a, b));
            return Ok(());
        }

        let mut crossing = self.crossing_edges(a, b)?;
        let budget = 64 + 16 * crossing.len() * crossing.len();
        let mut created: Vec<(usize, usize)> = Vec::with_capacity(crossing.len());
        let mut steps = 0usize;

        while let Some((u, w)) = crossing.pop_front() {
            steps += 1;
            if steps > budget {
                return Err(Error::TriangulationError(format!(
                    "could not recover segment {}-{}",
                    a, b
                )));
            }

            let (t1, t2) = match (self.half_edges.get(&(u, w)), self.half_edges.get(&(w, u))) {
                (Some(&t1), Some(&t2)) => (t1, t2),
                _ => {
                    return Err(Error::TriangulationError(format!(
                        "segment {}-{} crosses the outer hull",
                        a, b
                    )))
                }
            };
            let c = self.apex(t1, u, w);
            let d = self.apex(t2, u, w);

            // Only a strictly convex quad can be flipped
            let (ou, ow) = (self.orient(c, d, u), self.orient(c, d, w));
            let convex = (ou > 0.0 && ow < 0.0) || (ou < 0.0 && ow > 0.0);
            if !convex {
                crossing.push_back((u, w));
                continue;
            }

            match self.flip(u, w) {
                Some((c, d)) if self.crosses(a, b, c, d) => crossing.push_back((c, d)),
                Some(edge) => created.push(edge),
                None => {
                    return Err(Error::TriangulationError(format!(
                        "lost edge {}-{} while recovering segment {}-{}",
                        u, w, a, b
                    )))
                }
            }
        }

        self.constrained.insert(undirected(a, b));
        created.retain(|&(c, d)| undirected(c, d) != undirected(a, b));
        self.legalize(created);
        Ok(())
    }

    fn containing_triangle(&self, p: Point2<f64>) -> Option<usize> {
        (0..self.triangles.len()).find(|&t| {
            if !self.alive[t] {
                return false;
            }
            let [a, b, c] = self.triangles[t];
            let (pa, pb, pc) = (self.points[a], self.points[b], self.points[c]);
            orient(pa, pb, p) >= 0.0 && orient(pb, pc, p) >= 0.0 && orient(pc, pa, p) >= 0.0
        })
    }

    /// Remove every triangle reachable from `start` without crossing a constraint
    fn flood_remove(&mut self, start: Vec<usize>) {
        let mut stack = start;
        while let Some(t) = stack.pop() {
            if !self.alive[t] {
                continue;
            }
            let v = self.triangles[t];
            self.kill_triangle(t);
            let neighbours: SmallVec<[usize; 3]> = (0..3)
                .filter_map(|k| {
                    let (a, b) = (v[k], v[(k + 1) % 3]);
                    if self.is_constrained(a, b) {
                        None
                    } else {
                        self.half_edges.get(&(b, a)).copied()
                    }
                })
                .collect();
            stack.extend(neighbours);
        }
    }

    /// Drop the region outside the boundary, then every seeded hole
    fn carve(&mut self, holes: &[Point2<f64>]) {
        let outside: Vec<usize> = (0..self.triangles.len())
            .filter(|&t| self.alive[t] && self.triangles[t].iter().any(|&v| self.is_super(v)))
            .collect();
        self.flood_remove(outside);

        for (i, seed) in holes.iter().enumerate() {
            match self.containing_triangle(*seed) {
                Some(t) => self.flood_remove(vec![t]),
                None => tracing::debug!(hole = i, "hole seed is not inside any remaining triangle"),
            }
        }
    }

    fn into_triangles(self) -> Vec<[usize; 3]> {
        let input_len = self.input_len;
        self.triangles
            .into_iter()
            .zip(self.alive)
            .filter(|(v, alive)| *alive && v.iter().all(|&i| i < input_len))
            .map(|(v, _)| v)
            .collect()
    }
}
