// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-face normals for an assembled mesh

use crate::error::{Error, Result};
use crate::mesh::SolidMesh;
use nalgebra::{Point3, Vector3};

/// Cross products shorter than this are treated as zero
const DEGENERATE_EPSILON: f64 = 1e-12;

/// Decimal places kept in each normal component
const NORMAL_DECIMALS: i32 = 4;

/// One normal per face plus the faces that had none
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceNormals {
    /// Unit normals; zero vector for degenerate faces
    pub normals: Vec<Vector3<f64>>,
    /// 0-based indices of degenerate faces
    pub degenerate: Vec<usize>,
}

impl FaceNormals {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.degenerate.is_empty()
    }
}

/// Unit normal of the triangle `p1 p2 p3`, rounded to four decimals
///
/// Rounding is half-to-even. `face` only labels the error.
pub fn face_normal(
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    p3: &Point3<f64>,
    face: usize,
) -> Result<Vector3<f64>> {
    let normal = (p2 - p1).cross(&(p3 - p1));
    let length = normal.norm();
    if !(length >= DEGENERATE_EPSILON) {
        return Err(Error::DegenerateFaceError { face });
    }
    Ok((normal / length).map(round_component))
}

#[inline]
fn round_component(value: f64) -> f64 {
    let scale = 10f64.powi(NORMAL_DECIMALS);
    (value * scale).round_ties_even() / scale
}

/// Normals for every face of `mesh`
///
/// Degenerate faces do not abort the pass: they get a zero normal and are
/// reported with a warning.
pub fn face_normals(mesh: &SolidMesh) -> Result<FaceNormals> {
    let mut out = FaceNormals {
        normals: Vec::with_capacity(mesh.face_count()),
        degenerate: Vec::new(),
    };

    for face in 0..mesh.face_count() {
        let [p1, p2, p3] = mesh.face_corners(face)?;
        match face_normal(&p1, &p2, &p3, face) {
            Ok(n) => out.normals.push(n),
            Err(Error::DegenerateFaceError { face }) => {
                tracing::warn!(face, "degenerate face has no normal");
                out.normals.push(Vector3::zeros());
                out.degenerate.push(face);
            }
            Err(e) => return Err(e),
        }
    }

    if !out.is_clean() {
        tracing::warn!(
            degenerate = out.degenerate.len(),
            faces = mesh.face_count(),
            "normals computed with degenerate faces"
        );
    }

    Ok(out)
}
