// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning footprints into solids
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Geodesy error: {0}")]
    GeodesyError(String),

    #[error("Triangulation failed: {0}")]
    TriangulationError(String),

    #[error("Degenerate face {face}: cross product has zero length")]
    DegenerateFaceError { face: usize },

    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("Invalid footprint: {0}")]
    InvalidFootprint(String),

    #[error("Invalid extrusion parameters: {0}")]
    InvalidExtrusion(String),
}

impl Error {
    /// Short machine-readable kind, used in failure reports
    pub fn kind(&self) -> &'static str {
        match self {
            Error::GeodesyError(_) => "geodesy",
            Error::TriangulationError(_) => "triangulation",
            Error::DegenerateFaceError { .. } => "degenerate-face",
            Error::UnsupportedGeometry(_) => "unsupported-geometry",
            Error::InvalidFootprint(_) => "invalid-footprint",
            Error::InvalidExtrusion(_) => "invalid-extrusion",
        }
    }
}
