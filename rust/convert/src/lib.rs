// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Footprint3D Conversion
//!
//! Reads GeoJSON building footprints, assembles them into one extruded mesh
//! with `footprint3d-geometry` and writes Wavefront OBJ output together with
//! the collection centre and a report of skipped footprints.

pub mod config;
pub mod error;
pub mod input;
pub mod obj;
pub mod pipeline;

pub use config::Config;
pub use error::{ConvertError, Result};
pub use input::{parse_footprints, read_footprints};
pub use obj::{parse_center, read_obj, write_center, write_obj, OBJ_HEADER};
pub use pipeline::{run_convert, run_normals, ConvertOptions, ConvertSummary, NormalsSummary};
