// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use crate::error::{Error, Result};
use nalgebra::Point3;

/// Assembled triangle mesh for a whole footprint collection
///
/// Face indices are 1-based and global, ready to be written as OBJ records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolidMesh {
    /// Vertex positions (x, height, z)
    pub positions: Vec<Point3<f64>>,
    /// Triangle indices, 1-based
    pub faces: Vec<[u32; 3]>,
}

impl SolidMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Append a block of positions whose faces use 1-based indices local to
    /// the block
    ///
    /// The current vertex count is the offset applied to the incoming faces,
    /// so blocks appended in order never alias each other's vertices.
    #[inline]
    pub fn append(&mut self, positions: &[Point3<f64>], faces: &[[u32; 3]]) -> Result<()> {
        if positions.is_empty() {
            return Ok(());
        }

        if u32::try_from(self.positions.len() + positions.len()).is_err() {
            return Err(Error::InvalidExtrusion(
                "mesh exceeds the u32 index range".to_string(),
            ));
        }
        let vertex_offset = self.positions.len() as u32;

        self.positions.reserve(positions.len());
        self.faces.reserve(faces.len());

        self.positions.extend_from_slice(positions);
        self.faces.extend(
            faces
                .iter()
                .map(|f| [f[0] + vertex_offset, f[1] + vertex_offset, f[2] + vertex_offset]),
        );
        Ok(())
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get face count
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Corner positions of a face
    pub fn face_corners(&self, face: usize) -> Result<[Point3<f64>; 3]> {
        let f = self.faces.get(face).ok_or_else(|| {
            Error::InvalidExtrusion(format!("face {} out of range", face))
        })?;
        let corner = |index: u32| {
            (index as usize)
                .checked_sub(1)
                .and_then(|i| self.positions.get(i))
                .copied()
                .ok_or_else(|| {
                    Error::InvalidExtrusion(format!(
                        "face {} references missing vertex {}",
                        face, index
                    ))
                })
        };
        Ok([corner(f[0])?, corner(f[1])?, corner(f[2])?])
    }

    /// Check every face index lies in `1..=vertex_count`
    pub fn validate_indices(&self) -> Result<()> {
        let count = self.positions.len();
        for (i, f) in self.faces.iter().enumerate() {
            if f.iter().any(|&index| index == 0 || index as usize > count) {
                return Err(Error::InvalidExtrusion(format!(
                    "face {} has index outside 1..={}: {:?}",
                    i, count, f
                )));
            }
        }
        Ok(())
    }

    /// Calculate bounds (min, max)
    #[inline]
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        if self.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = Point3::new(f64::MAX, f64::MAX, f64::MAX);
        let mut max = Point3::new(f64::MIN, f64::MIN, f64::MIN);

        self.positions.iter().for_each(|p| {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        });

        (min, max)
    }
}
