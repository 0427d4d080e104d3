// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model assembly
//!
//! Every footprint is triangulated and extruded on its own, in a local frame
//! centred on its centroid, then moved into the collection frame. Per-footprint
//! work has no shared state so it runs in parallel; the merge that assigns
//! global vertex indices is sequential and follows input order.

use crate::error::{Error, Result};
use crate::extrusion::{extrude_with, ExtrudeOptions, Prism};
use crate::footprint::{polygon_centroid, Footprint, Profile2D};
use crate::geodesy::{GeoPoint, GeodesicProjection, PlanarProjection, Projection};
use crate::mesh::SolidMesh;
use rayon::prelude::*;
use std::fmt::Write as _;

/// How footprint coordinates are mapped to metres
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoordinateMode {
    /// Longitude/latitude, projected geodesically
    #[default]
    Geographic,
    /// Already metric; only offset
    Planar,
}

/// Assembly options
#[derive(Debug, Clone, PartialEq)]
pub struct AssembleOptions {
    /// Base height when no height field is configured
    pub default_height: f64,
    /// Wall height of every prism
    pub default_wall_height: f64,
    /// Attribute holding each footprint's base height
    pub height_field: Option<String>,
    /// Compute prisms on the rayon pool
    pub parallel: bool,
    pub coordinates: CoordinateMode,
    pub extrude: ExtrudeOptions,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            default_height: 3.0,
            default_wall_height: 3.0,
            height_field: None,
            parallel: true,
            coordinates: CoordinateMode::Geographic,
            extrude: ExtrudeOptions::default(),
        }
    }
}

/// A footprint that was left out of the mesh
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonFailure {
    /// Position in the input collection
    pub index: usize,
    pub error: Error,
}

/// Assembled mesh plus the footprints it could not include
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub mesh: SolidMesh,
    pub failures: Vec<PolygonFailure>,
    /// Number of footprints merged into `mesh`
    pub built: usize,
}

impl Assembly {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// One line per dropped footprint: index, error kind, message
    pub fn failure_report(&self) -> String {
        let mut report = String::new();
        for failure in &self.failures {
            let _ = writeln!(
                report,
                "polygon {}: {}: {}",
                failure.index,
                failure.error.kind(),
                failure.error
            );
        }
        report
    }
}

/// Build one solid mesh from a footprint collection
///
/// `center` is the collection-wide reference point; every prism is placed
/// relative to it. Footprints that fail are recorded and skipped.
pub fn assemble(footprints: &[Footprint], center: GeoPoint, options: &AssembleOptions) -> Result<Assembly> {
    if options.coordinates == CoordinateMode::Geographic {
        center.validate()?;
    }
    for (name, value) in [
        ("default height", options.default_height),
        ("wall height", options.default_wall_height),
    ] {
        if !value.is_finite() {
            return Err(Error::InvalidExtrusion(format!("{} must be finite, got {}", name, value)));
        }
    }

    let start = std::time::Instant::now();
    tracing::info!(
        footprints = footprints.len(),
        center_lon = center.lon,
        center_lat = center.lat,
        parallel = options.parallel,
        "Assembling footprints"
    );

    let build = |(index, footprint): (usize, &Footprint)| {
        let result = build_prism(footprint, center, options);
        match &result {
            Ok(prism) => tracing::debug!(
                index,
                vertices = prism.positions.len(),
                faces = prism.faces.len(),
                "Built prism"
            ),
            Err(e) => tracing::warn!(index, kind = e.kind(), error = %e, "Skipping footprint"),
        }
        result
    };

    // Order-preserving in both branches
    let prisms: Vec<Result<Prism>> = if options.parallel {
        footprints.par_iter().enumerate().map(build).collect()
    } else {
        footprints.iter().enumerate().map(build).collect()
    };

    let (vertex_total, face_total) = prisms
        .iter()
        .flatten()
        .fold((0, 0), |(v, f), p| (v + p.positions.len(), f + p.faces.len()));

    let mut assembly = Assembly {
        mesh: SolidMesh::with_capacity(vertex_total, face_total),
        failures: Vec::new(),
        built: 0,
    };
    for (index, prism) in prisms.into_iter().enumerate() {
        match prism {
            Ok(prism) => {
                assembly.mesh.append(&prism.positions, &prism.faces)?;
                assembly.built += 1;
            }
            Err(error) => assembly.failures.push(PolygonFailure { index, error }),
        }
    }

    tracing::info!(
        built = assembly.built,
        failed = assembly.failures.len(),
        vertices = assembly.mesh.vertex_count(),
        faces = assembly.mesh.face_count(),
        time_ms = start.elapsed().as_millis(),
        "Assembly complete"
    );

    Ok(assembly)
}

/// Triangulate, extrude and place a single footprint
pub fn build_prism(footprint: &Footprint, center: GeoPoint, options: &AssembleOptions) -> Result<Prism> {
    let polygon = footprint.polygon()?;
    let planar = Profile2D::from_polygon(polygon).triangulate()?;

    let base_height = match &options.height_field {
        Some(field) => footprint.numeric_attribute(field)?,
        None => options.default_height,
    };

    let centroid = polygon_centroid(polygon)?;
    let (mut prism, offset) = match options.coordinates {
        CoordinateMode::Geographic => {
            let local = GeodesicProjection::new(centroid)?;
            let prism = extrude_with(
                &planar,
                &local,
                base_height,
                options.default_wall_height,
                &options.extrude,
            )?;
            (prism, GeodesicProjection::new(center)?.project(centroid.to_planar())?)
        }
        CoordinateMode::Planar => {
            let local = PlanarProjection::new(centroid.to_planar());
            let prism = extrude_with(
                &planar,
                &local,
                base_height,
                options.default_wall_height,
                &options.extrude,
            )?;
            (prism, PlanarProjection::new(center.to_planar()).project(centroid.to_planar())?)
        }
    };

    prism.translate(offset.x, offset.y);
    Ok(prism)
}
