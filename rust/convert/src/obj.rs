// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wavefront OBJ reading and writing, plus the collection centre dump

use crate::error::{ConvertError, Result};
use footprint3d_geometry::{GeoPoint, Point3, SolidMesh, Vector3};
use std::io::{BufRead, Write};

/// First line of every written OBJ file
pub const OBJ_HEADER: &str = "# Generated OBJ file";

/// Write `mesh` as OBJ text
///
/// With `normals`, one `vn` record is written per face and each face refers to
/// its own normal (`f a//n b//n c//n`).
pub fn write_obj<W: Write>(out: &mut W, mesh: &SolidMesh, normals: Option<&[Vector3<f64>]>) -> Result<()> {
    if let Some(normals) = normals {
        if normals.len() != mesh.face_count() {
            return Err(ConvertError::obj(
                0,
                format!(
                    "{} normals for {} faces",
                    normals.len(),
                    mesh.face_count()
                ),
            ));
        }
    }

    writeln!(out, "{}", OBJ_HEADER)?;
    for p in &mesh.positions {
        writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
    }

    match normals {
        Some(normals) => {
            for n in normals {
                writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
            }
            for (i, f) in mesh.faces.iter().enumerate() {
                let n = i + 1;
                writeln!(out, "f {}//{} {}//{} {}//{}", f[0], n, f[1], n, f[2], n)?;
            }
        }
        None => {
            for f in &mesh.faces {
                writeln!(out, "f {} {} {}", f[0], f[1], f[2])?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

/// Read vertex positions and triangular faces from OBJ text
///
/// Texture and normal references in face tokens are ignored, as are all
/// records other than `v` and `f`. Negative (relative) indices are resolved
/// against the vertices read so far.
pub fn read_obj<R: BufRead>(input: R) -> Result<SolidMesh> {
    let mut mesh = SolidMesh::new();

    for (number, line) in input.lines().enumerate() {
        let line = line?;
        let number = number + 1;
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("v") => {
                let mut coords = [0.0f64; 3];
                for c in &mut coords {
                    let token = tokens
                        .next()
                        .ok_or_else(|| ConvertError::obj(number, "vertex needs 3 coordinates"))?;
                    *c = token.parse().map_err(|_| {
                        ConvertError::obj(number, format!("invalid coordinate '{}'", token))
                    })?;
                }
                mesh.positions.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                let refs: Vec<&str> = tokens.collect();
                if refs.len() != 3 {
                    return Err(ConvertError::obj(
                        number,
                        format!("only triangles are supported, face has {} vertices", refs.len()),
                    ));
                }
                let mut face = [0u32; 3];
                for (slot, token) in face.iter_mut().zip(&refs) {
                    *slot = resolve_index(token, mesh.vertex_count(), number)?;
                }
                mesh.faces.push(face);
            }
            _ => {}
        }
    }

    let count = mesh.vertex_count();
    if let Some(face) = mesh
        .faces
        .iter()
        .position(|f| f.iter().any(|&i| i as usize > count))
    {
        return Err(ConvertError::obj(
            0,
            format!("face {} references a vertex beyond {}", face + 1, count),
        ));
    }

    Ok(mesh)
}

/// Vertex part of a face token (`a`, `a/t`, `a//n`, `a/t/n`) as a 1-based index
fn resolve_index(token: &str, seen: usize, line: usize) -> Result<u32> {
    let vertex = token.split('/').next().unwrap_or_default();
    let index: i64 = vertex
        .parse()
        .map_err(|_| ConvertError::obj(line, format!("invalid face index '{}'", token)))?;

    let resolved = match index {
        0 => None,
        i if i > 0 => Some(i),
        i => Some(seen as i64 + i + 1).filter(|&r| r >= 1),
    };
    resolved
        .and_then(|r| u32::try_from(r).ok())
        .ok_or_else(|| ConvertError::obj(line, format!("face index {} out of range", index)))
}

/// Write the collection centre as `[lon lat]`
pub fn write_center<W: Write>(out: &mut W, center: GeoPoint) -> Result<()> {
    write!(out, "[{} {}]", center.lon, center.lat)?;
    out.flush()?;
    Ok(())
}

/// Parse a centre dump written by [`write_center`]
pub fn parse_center(content: &str) -> Result<GeoPoint> {
    let inner = content
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| ConvertError::obj(1, "centre must be written as [lon lat]"))?;
    let values: Vec<f64> = inner
        .split_whitespace()
        .map(|v| v.parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| ConvertError::obj(1, format!("invalid centre '{}'", inner)))?;
    match values.as_slice() {
        [lon, lat] => Ok(GeoPoint::new(*lon, *lat)),
        _ => Err(ConvertError::obj(1, format!("centre needs 2 values, got {}", values.len()))),
    }
}
