// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for footprint conversion.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Conversion error types.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Write(#[from] std::io::Error),

    #[error("Invalid GeoJSON: {0}")]
    GeoJson(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid OBJ at line {line}: {message}")]
    Obj { line: usize, message: String },

    #[error("Input has no footprints with a usable extent")]
    EmptyInput,

    #[error("Geometry error: {0}")]
    Geometry(#[from] footprint3d_geometry::Error),
}

impl ConvertError {
    /// Attach the file path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn obj(line: usize, message: impl Into<String>) -> Self {
        ConvertError::Obj {
            line,
            message: message.into(),
        }
    }
}
