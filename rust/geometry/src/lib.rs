// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Footprint3D Geometry Processing
//!
//! Turns 2D building footprints (longitude/latitude polygons with holes) into
//! extruded triangle meshes: geodesic projection to a local metric frame,
//! constrained Delaunay triangulation, prism extrusion and ordered assembly
//! into one indexed mesh, plus per-face normals.

pub mod assembly;
pub mod error;
pub mod extrusion;
pub mod footprint;
pub mod geodesy;
pub mod mesh;
pub mod normals;
pub mod transform;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use assembly::{assemble, build_prism, AssembleOptions, Assembly, CoordinateMode, PolygonFailure};
pub use error::{Error, Result};
pub use extrusion::{extrude, extrude_with, CapWinding, ExtrudeOptions, Prism, WallMode};
pub use footprint::{collection_center, AttributeValue, Footprint, Profile2D};
pub use geodesy::{project, GeoPoint, GeodesicProjection, PlanarProjection, Projection};
pub use mesh::SolidMesh;
pub use normals::{face_normal, face_normals, FaceNormals};
pub use transform::{rotate_2d, rotation_matrix_2d};
pub use triangulation::{triangulate, triangulate_with, ConstrainedDelaunay, PlanarMesh, Pslg, TriangulationEngine};
