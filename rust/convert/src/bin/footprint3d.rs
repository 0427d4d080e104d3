// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! footprint3d - extrude building footprints into OBJ meshes
//!
//! # Commands
//!
//! - `footprint3d convert <input.geojson> <output.obj>` - assemble footprints
//!   into one mesh, writing `<output>.txt` (collection centre) and
//!   `<output>.failures.txt` when footprints were skipped
//! - `footprint3d normals <input.obj>` - re-write an OBJ with per-face normals

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use footprint3d_convert::{run_convert, run_normals, Config, ConvertOptions};
use footprint3d_geometry::{AssembleOptions, CapWinding, CoordinateMode, ExtrudeOptions, WallMode};
use std::path::PathBuf;

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "info,footprint3d_convert=debug,footprint3d_geometry=debug";

#[derive(Parser, Debug)]
#[command(name = "footprint3d", version, about = "Extrude building footprints into OBJ meshes")]
struct Cli {
    /// Worker threads for parallel extrusion [default: FOOTPRINT3D_WORKER_THREADS or CPU count]
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a GeoJSON FeatureCollection of footprints into an OBJ mesh
    Convert(ConvertArgs),
    /// Re-write an OBJ file with one normal per face
    Normals(NormalsArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Input GeoJSON file
    input: PathBuf,

    /// Output OBJ file
    output: PathBuf,

    /// Attribute holding each footprint's base height
    #[arg(long)]
    height_field: Option<String>,

    /// Base height when no height field is given
    #[arg(long)]
    default_height: Option<f64>,

    /// Wall height of every footprint
    #[arg(long)]
    wall_height: Option<f64>,

    /// Write per-face normals into the OBJ
    #[arg(long)]
    normals: bool,

    /// Extrude footprints one after another on the main thread
    #[arg(long)]
    sequential: bool,

    /// Only wall the footprint outline and holes, not interior triangle edges
    #[arg(long)]
    boundary_walls: bool,

    /// Orient cap triangles so bottom faces point down and top faces point up
    #[arg(long)]
    outward_caps: bool,

    /// Coordinates are already metric; skip geodesic projection
    #[arg(long)]
    planar: bool,
}

#[derive(Args, Debug)]
struct NormalsArgs {
    /// Input OBJ file
    input: PathBuf,

    /// Output OBJ file [default: <input stem>.normals.obj]
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let worker_threads = cli.threads.filter(|&n| n > 0).unwrap_or(config.worker_threads);

    // Initialize rayon thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(worker_threads)
        .build_global()
        .context("Failed to initialize thread pool")?;

    match cli.command {
        Command::Convert(args) => convert(args, &config, worker_threads),
        Command::Normals(args) => {
            let summary = run_normals(&args.input, args.output.as_deref())
                .with_context(|| format!("Failed to add normals to {}", args.input.display()))?;
            println!(
                "Wrote {} face normals to {} ({} degenerate)",
                summary.faces,
                summary.output.display(),
                summary.degenerate_faces
            );
            Ok(())
        }
    }
}

fn convert(args: ConvertArgs, config: &Config, worker_threads: usize) -> Result<()> {
    let options = ConvertOptions {
        assemble: AssembleOptions {
            default_height: args.default_height.unwrap_or(config.default_height),
            default_wall_height: args.wall_height.unwrap_or(config.wall_height),
            height_field: args.height_field.or_else(|| config.height_field.clone()),
            parallel: !args.sequential,
            coordinates: if args.planar {
                CoordinateMode::Planar
            } else {
                CoordinateMode::Geographic
            },
            extrude: ExtrudeOptions {
                walls: if args.boundary_walls {
                    WallMode::BoundaryEdges
                } else {
                    WallMode::AllEdges
                },
                caps: if args.outward_caps {
                    CapWinding::Outward
                } else {
                    CapWinding::Shared
                },
            },
        },
        write_normals: args.normals,
    };

    tracing::info!(
        input = %args.input.display(),
        output = %args.output.display(),
        default_height = options.assemble.default_height,
        wall_height = options.assemble.default_wall_height,
        height_field = ?options.assemble.height_field,
        worker_threads,
        "Starting conversion"
    );

    let summary = run_convert(&args.input, &args.output, &options)
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    println!(
        "Wrote {} ({} of {} footprints, {} vertices, {} faces)",
        summary.obj_path.display(),
        summary.built,
        summary.footprints,
        summary.vertices,
        summary.faces
    );
    println!(
        "Centre [{} {}] written to {}",
        summary.center.lon,
        summary.center.lat,
        summary.center_path.display()
    );
    if let Some(path) = &summary.failures_path {
        println!("{} footprints skipped, see {}", summary.failed, path.display());
    }
    if summary.degenerate_faces > 0 {
        println!("{} degenerate faces written with zero normals", summary.degenerate_faces);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_filter_covers_both_crates() {
        for target in ["footprint3d_convert=debug", "footprint3d_geometry=debug"] {
            assert!(DEFAULT_LOG_FILTER.split(',').any(|d| d == target));
        }
        assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }
}
