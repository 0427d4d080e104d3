// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! File-level conversion runs
//!
//! `convert` reads a footprint collection, assembles it and writes the mesh,
//! the centre dump and (when anything was dropped) the failure report next to
//! the output. `normals` re-writes an existing OBJ with per-face normals.

use crate::error::{ConvertError, Result};
use crate::input::read_footprints;
use crate::obj::{read_obj, write_center, write_obj};
use footprint3d_geometry::{
    assemble, collection_center, face_normals, AssembleOptions, Assembly, FaceNormals, GeoPoint,
    SolidMesh,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Options for a conversion run
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub assemble: AssembleOptions,
    /// Also write per-face normals into the OBJ
    pub write_normals: bool,
}

/// What a conversion run produced
#[derive(Debug, Clone)]
pub struct ConvertSummary {
    pub footprints: usize,
    pub built: usize,
    pub failed: usize,
    pub vertices: usize,
    pub faces: usize,
    pub center: GeoPoint,
    pub obj_path: PathBuf,
    pub center_path: PathBuf,
    pub failures_path: Option<PathBuf>,
    /// Faces written with a zero normal
    pub degenerate_faces: usize,
}

/// What a normals run produced
#[derive(Debug, Clone)]
pub struct NormalsSummary {
    pub faces: usize,
    pub degenerate_faces: usize,
    pub output: PathBuf,
}

/// `<output stem>.txt`
pub fn center_path(output: &Path) -> PathBuf {
    output.with_extension("txt")
}

/// `<output stem>.failures.txt`
pub fn failures_path(output: &Path) -> PathBuf {
    output.with_extension("failures.txt")
}

/// `<input stem>.normals.obj`
pub fn normals_path(input: &Path) -> PathBuf {
    input.with_extension("normals.obj")
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| ConvertError::io(path, e))
}

/// Convert a GeoJSON footprint file into an OBJ mesh
pub fn run_convert(input: &Path, output: &Path, options: &ConvertOptions) -> Result<ConvertSummary> {
    let footprints = read_footprints(input)?;
    let center = collection_center(&footprints, options.assemble.coordinates)
        .ok_or(ConvertError::EmptyInput)?;

    let assembly = assemble(&footprints, center, &options.assemble)?;
    let normals = if options.write_normals {
        Some(face_normals(&assembly.mesh)?)
    } else {
        None
    };

    write_mesh_file(output, &assembly.mesh, normals.as_ref())?;

    let center_file = center_path(output);
    let mut writer = create(&center_file)?;
    write_center(&mut writer, center).map_err(|e| with_path(e, &center_file))?;

    let failures_file = write_failure_report(output, &assembly)?;

    let summary = ConvertSummary {
        footprints: footprints.len(),
        built: assembly.built,
        failed: assembly.failures.len(),
        vertices: assembly.mesh.vertex_count(),
        faces: assembly.mesh.face_count(),
        center,
        obj_path: output.to_path_buf(),
        center_path: center_file,
        failures_path: failures_file,
        degenerate_faces: normals.as_ref().map_or(0, |n| n.degenerate.len()),
    };

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        built = summary.built,
        failed = summary.failed,
        vertices = summary.vertices,
        faces = summary.faces,
        "Conversion complete"
    );

    Ok(summary)
}

/// Re-write an OBJ file with one normal per face
pub fn run_normals(input: &Path, output: Option<&Path>) -> Result<NormalsSummary> {
    let file = File::open(input).map_err(|e| ConvertError::io(input, e))?;
    let mesh = read_obj(BufReader::new(file)).map_err(|e| with_path(e, input))?;
    let normals = face_normals(&mesh)?;

    let output = output.map_or_else(|| normals_path(input), Path::to_path_buf);
    write_mesh_file(&output, &mesh, Some(&normals))?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        faces = mesh.face_count(),
        degenerate = normals.degenerate.len(),
        "Normals written"
    );

    Ok(NormalsSummary {
        faces: mesh.face_count(),
        degenerate_faces: normals.degenerate.len(),
        output,
    })
}

fn write_mesh_file(path: &Path, mesh: &SolidMesh, normals: Option<&FaceNormals>) -> Result<()> {
    let mut writer = create(path)?;
    write_obj(&mut writer, mesh, normals.map(|n| n.normals.as_slice()))
        .map_err(|e| with_path(e, path))
}

/// Write `<stem>.failures.txt` when footprints were dropped
///
/// A complete run removes the report left by an earlier run.
fn write_failure_report(output: &Path, assembly: &Assembly) -> Result<Option<PathBuf>> {
    let path = failures_path(output);
    if assembly.is_complete() {
        return match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(report = %path.display(), "Removed stale failure report");
                Ok(None)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConvertError::io(&path, e)),
        };
    }

    let mut writer = create(&path)?;
    writer
        .write_all(assembly.failure_report().as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| ConvertError::io(&path, e))?;

    tracing::warn!(
        failed = assembly.failures.len(),
        report = %path.display(),
        "Some footprints were skipped"
    );
    Ok(Some(path))
}

/// Give bare io errors the file they happened on
fn with_path(error: ConvertError, path: &Path) -> ConvertError {
    match error {
        ConvertError::Write(source) => ConvertError::io(path, source),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_paths() {
        let output = Path::new("out/city.obj");
        assert_eq!(center_path(output), Path::new("out/city.txt"));
        assert_eq!(failures_path(output), Path::new("out/city.failures.txt"));
        assert_eq!(normals_path(output), Path::new("out/city.normals.obj"));
    }

    #[test]
    fn test_unreadable_obj_names_its_path() {
        let dir = std::env::temp_dir().join(format!("footprint3d-pipeline-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("binary.obj");
        std::fs::write(&input, [b'v', b' ', 0xff, 0xfe, b'\n']).unwrap();

        match run_normals(&input, None) {
            Err(ConvertError::Io { path, .. }) => assert_eq!(path, input),
            other => panic!("expected an io error on the input, got {:?}", other),
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_input() {
        let err = run_convert(
            Path::new("does/not/exist.geojson"),
            Path::new("unused.obj"),
            &ConvertOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }));
    }
}
