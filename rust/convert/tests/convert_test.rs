// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Full conversion runs against files in a scratch directory.

use approx::assert_relative_eq;
use footprint3d_convert::{parse_center, read_obj, run_convert, run_normals, ConvertOptions};
use footprint3d_geometry::AssembleOptions;
use std::fs;
use std::io::BufReader;
use std::path::PathBuf;

const CITY: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "properties": { "height": 10 },
            "geometry": {
                "type": "Polygon",
                "coordinates": [
                    [[116.3900, 39.9000], [116.3902, 39.9000], [116.3902, 39.9002], [116.3900, 39.9002], [116.3900, 39.9000]],
                    [[116.39008, 39.90008], [116.39012, 39.90008], [116.39012, 39.90012], [116.39008, 39.90012], [116.39008, 39.90008]]
                ]
            }
        },
        {
            "type": "Feature",
            "properties": { "height": "4.5" },
            "geometry": {
                "type": "Polygon",
                "coordinates": [
                    [[116.3905, 39.9001], [116.3906, 39.9001], [116.3906, 39.9003], [116.3905, 39.9003], [116.3905, 39.9001]]
                ]
            }
        },
        {
            "type": "Feature",
            "properties": { "height": 2 },
            "geometry": { "type": "Point", "coordinates": [116.3903, 39.9004] }
        },
        {
            "type": "Feature",
            "properties": { "height": 1 },
            "geometry": {
                "type": "Polygon",
                "coordinates": [
                    [[116.3900, 39.9000], [116.3901, 39.9001], [116.3901, 39.9000], [116.3900, 39.90005], [116.3900, 39.9000]]
                ]
            }
        }
    ]
}"#;

/// Fresh scratch directory for one test
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("footprint3d-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn options(write_normals: bool) -> ConvertOptions {
    ConvertOptions {
        assemble: AssembleOptions {
            height_field: Some("height".to_string()),
            ..Default::default()
        },
        write_normals,
    }
}

#[test]
fn test_convert_writes_mesh_center_and_report() {
    let dir = scratch("convert");
    let input = dir.join("city.geojson");
    let output = dir.join("city.obj");
    fs::write(&input, CITY).unwrap();

    let summary = run_convert(&input, &output, &options(false)).unwrap();
    assert_eq!(summary.footprints, 4);
    assert_eq!(summary.built, 2);
    assert_eq!(summary.failed, 2);
    // Square with a square hole: 8 vertices, 8 triangles. Plain rectangle: 4 and 2.
    assert_eq!(summary.vertices, 16 + 8);
    assert_eq!(summary.faces, 64 + 16);

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("# Generated OBJ file\n"));
    assert!(!text.contains("vn "));

    let mesh = read_obj(BufReader::new(fs::File::open(&output).unwrap())).unwrap();
    assert_eq!(mesh.vertex_count(), 24);
    assert_eq!(mesh.face_count(), 80);
    mesh.validate_indices().unwrap();
    let (min, max) = mesh.bounds();
    assert_eq!(min.y, 4.5);
    assert_eq!(max.y, 13.0);

    let center = parse_center(&fs::read_to_string(dir.join("city.txt")).unwrap()).unwrap();
    assert_relative_eq!(center.lon, 116.3903, epsilon = 1e-9);
    assert_relative_eq!(center.lat, 39.9002, epsilon = 1e-9);

    let report_path = summary.failures_path.clone().unwrap();
    assert_eq!(report_path, dir.join("city.failures.txt"));
    let report = fs::read_to_string(report_path).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("polygon 2: unsupported-geometry"));
    assert!(lines[1].starts_with("polygon 3: triangulation"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_convert_with_normals() {
    let dir = scratch("normals-inline");
    let input = dir.join("city.geojson");
    let output = dir.join("city.obj");
    fs::write(&input, CITY).unwrap();

    let summary = run_convert(&input, &output, &options(true)).unwrap();
    assert_eq!(summary.degenerate_faces, 0);

    let text = fs::read_to_string(&output).unwrap();
    assert_eq!(text.lines().filter(|l| l.starts_with("vn ")).count(), summary.faces);
    let first_face = text.lines().find(|l| l.starts_with("f ")).unwrap();
    assert!(first_face.ends_with("//1"));
    assert_eq!(first_face.matches("//1").count(), 3);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_normals_command_rewrites_obj() {
    let dir = scratch("normals-command");
    let input = dir.join("city.geojson");
    let output = dir.join("city.obj");
    fs::write(&input, CITY).unwrap();
    run_convert(&input, &output, &options(false)).unwrap();

    let summary = run_normals(&output, None).unwrap();
    assert_eq!(summary.output, dir.join("city.normals.obj"));
    assert_eq!(summary.faces, 80);

    let plain = read_obj(BufReader::new(fs::File::open(&output).unwrap())).unwrap();
    let with_normals = read_obj(BufReader::new(fs::File::open(&summary.output).unwrap())).unwrap();
    assert_eq!(plain, with_normals);

    let text = fs::read_to_string(&summary.output).unwrap();
    assert_eq!(text.lines().filter(|l| l.starts_with("vn ")).count(), 80);
    let last_face = text.lines().last().unwrap();
    assert_eq!(last_face.matches("//80").count(), 3);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_complete_run_writes_no_report() {
    let dir = scratch("complete");
    let input = dir.join("one.geojson");
    let output = dir.join("one.obj");
    fs::write(
        &input,
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"height": 0},
             "geometry": {"type": "Polygon", "coordinates": [[[8.54, 47.37], [8.5401, 47.37], [8.5401, 47.3701], [8.54, 47.37]]]}}
        ]}"#,
    )
    .unwrap();

    let summary = run_convert(&input, &output, &options(false)).unwrap();
    assert_eq!(summary.built, 1);
    assert_eq!(summary.vertices, 6);
    assert_eq!(summary.faces, 8);
    assert!(summary.failures_path.is_none());
    assert!(!dir.join("one.failures.txt").exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_complete_rerun_removes_old_report() {
    let dir = scratch("rerun");
    let input = dir.join("city.geojson");
    let output = dir.join("city.obj");
    fs::write(&input, CITY).unwrap();
    let first = run_convert(&input, &output, &options(false)).unwrap();
    assert!(first.failures_path.unwrap().exists());

    fs::write(
        &input,
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"height": 10},
             "geometry": {"type": "Polygon", "coordinates": [[[116.3900, 39.9000], [116.3902, 39.9000], [116.3902, 39.9002], [116.3900, 39.9000]]]}}
        ]}"#,
    )
    .unwrap();
    let second = run_convert(&input, &output, &options(false)).unwrap();
    assert_eq!(second.failed, 0);
    assert!(second.failures_path.is_none());
    assert!(!dir.join("city.failures.txt").exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_footprint_off_the_globe_does_not_stop_the_run() {
    let dir = scratch("off-globe");
    let input = dir.join("edge.geojson");
    let output = dir.join("edge.obj");
    fs::write(
        &input,
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"height": 5},
             "geometry": {"type": "Polygon", "coordinates": [[[179.9, 10.0], [179.9001, 10.0], [179.9001, 10.0001], [179.9, 10.0001], [179.9, 10.0]]]}},
            {"type": "Feature", "properties": {"height": 5},
             "geometry": {"type": "Polygon", "coordinates": [[[250.0, 10.0], [250.0001, 10.0], [250.0001, 10.0001], [250.0, 10.0]]]}}
        ]}"#,
    )
    .unwrap();

    let summary = run_convert(&input, &output, &options(false)).unwrap();
    assert_eq!(summary.built, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.vertices, 8);
    assert!(output.exists());

    let center = parse_center(&fs::read_to_string(dir.join("edge.txt")).unwrap()).unwrap();
    assert_relative_eq!(center.lon, 179.90005, epsilon = 1e-9);

    let report = fs::read_to_string(summary.failures_path.unwrap()).unwrap();
    assert!(report.starts_with("polygon 1: geodesy:"));

    let _ = fs::remove_dir_all(&dir);
}
