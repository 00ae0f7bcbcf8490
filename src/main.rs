//! EuroLand exporter CLI
//!
//! Command-line interface for exporting scene descriptions to EIF, ESE and RTG.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use euroland_export::logging::{init_with_config, TracingConfig};
use euroland_export::{CoordinateSystem, ExportOptions, ExportSummary, Exporter, GLOBAL_REGISTRY};
use euroland_scene::{load_scene, Scene};

/// EuroLand - scene exporter for the EuroLand engine toolchain
#[derive(Parser)]
#[command(name = "euroland")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for structured data
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene description
    Export(ExportArgs),

    /// Show scene statistics
    Info(InfoArgs),

    /// Load and validate a scene description
    Validate(ValidateArgs),

    /// List available exporters
    Formats,
}

#[derive(Args)]
struct ExportArgs {
    /// Scene description (.json, .yaml, .yml)
    input: PathBuf,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// Exporter id (defaults to the output extension)
    #[arg(short, long)]
    exporter: Option<String>,

    /// Export options file (.yaml, .yml, .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target coordinate system: yup-lh, yup-rh, zup-rh
    #[arg(long)]
    coords: Option<CoordinateSystem>,

    /// Global scale factor
    #[arg(long)]
    scale: Option<f32>,

    /// Export only selected objects
    #[arg(long)]
    selected_only: bool,

    /// Include hidden objects
    #[arg(long)]
    include_hidden: bool,

    /// Bake object transforms into vertices
    #[arg(long)]
    apply_transform: bool,

    /// Keep coincident vertices separate
    #[arg(long)]
    no_merge: bool,

    /// Skip texture coordinates
    #[arg(long)]
    no_uvs: bool,

    /// Skip vertex colours
    #[arg(long)]
    no_colors: bool,

    /// Skip normals
    #[arg(long)]
    no_normals: bool,

    /// Skip baked animation
    #[arg(long)]
    no_animation: bool,

    /// Decimal places for floats
    #[arg(long)]
    precision: Option<usize>,

    /// Write a timestamp comment where the format supports it
    #[arg(long)]
    timestamp: bool,

    /// Render without writing the output file
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Scene description
    input: PathBuf,
}

#[derive(Args)]
struct ValidateArgs {
    /// Scene description
    input: PathBuf,

    /// Also validate an export options file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    init_with_config(TracingConfig {
        show_target: verbosity >= 2,
        show_thread_ids: verbosity >= 3,
        show_file: verbosity >= 3,
        show_line_number: verbosity >= 3,
        ..TracingConfig::with_level(level)
    });
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Export(args) => cmd_export(args, cli.format),
        Commands::Info(args) => cmd_info(args, cli.format),
        Commands::Validate(args) => cmd_validate(args, cli.format),
        Commands::Formats => cmd_formats(cli.format),
    }
}

fn load(path: &Path) -> Result<Scene> {
    info!("Loading scene: {:?}", path);
    load_scene(path).with_context(|| format!("Failed to load scene {}", path.display()))
}

fn build_options(args: &ExportArgs) -> Result<ExportOptions> {
    let mut options = match &args.config {
        Some(path) => ExportOptions::from_file(path)
            .with_context(|| format!("Failed to read options {}", path.display()))?,
        None => ExportOptions::default(),
    };

    if let Some(coords) = args.coords {
        options.coordinate_system = coords;
    }
    if let Some(scale) = args.scale {
        options.global_scale = scale;
    }
    if args.precision.is_some() {
        options.precision = args.precision;
    }
    options.selected_only |= args.selected_only;
    options.apply_transform |= args.apply_transform;
    options.write_timestamp |= args.timestamp;
    if args.include_hidden {
        options.visible_only = false;
    }
    if args.no_merge {
        options.merge_vertices = false;
    }
    if args.no_uvs {
        options.export_uvs = false;
    }
    if args.no_colors {
        options.export_colors = false;
    }
    if args.no_normals {
        options.export_normals = false;
    }
    if args.no_animation {
        options.export_animation = false;
    }

    options.validate().context("Invalid export options")?;
    Ok(options)
}

fn select_exporter(args: &ExportArgs) -> Result<Arc<dyn Exporter>> {
    let exporter = match &args.exporter {
        Some(id) => GLOBAL_REGISTRY.get(&id.to_lowercase())?,
        None => GLOBAL_REGISTRY
            .get_for_path(&args.output)
            .context("Cannot infer the exporter from the output path; pass --exporter")?,
    };
    Ok(exporter)
}

fn cmd_export(args: ExportArgs, format: OutputFormat) -> Result<()> {
    let scene = load(&args.input)?;
    let options = build_options(&args)?;
    let exporter = select_exporter(&args)?;

    debug!(exporter = exporter.id(), ?options, "Resolved export settings");

    let start = Instant::now();
    let summary = if args.dry_run {
        exporter.render(&scene, &options)?.summary
    } else {
        if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create output directory")?;
        }
        exporter
            .export_file(&scene, &options, &args.output)
            .with_context(|| format!("Failed to export {}", args.output.display()))?
    };
    let elapsed = start.elapsed();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => {
            if args.dry_run {
                println!("Dry run - nothing written");
            } else {
                println!("Exported {} -> {}", args.input.display(), args.output.display());
            }
            print_summary(exporter.name(), &summary);
            println!("  {:<16} {:.1} ms", "Time", elapsed.as_secs_f64() * 1000.0);
        }
    }

    Ok(())
}

fn print_summary(name: &str, summary: &ExportSummary) {
    println!("  {:<16} {} ({})", "Format", name, summary.format);
    println!("  {:<16} {}", "Nodes", summary.nodes);
    println!("  {:<16} {}", "Meshes", summary.meshes);
    println!("  {:<16} {}", "Materials", summary.materials);
    println!("  {:<16} {}", "Positions", summary.positions);
    println!("  {:<16} {}", "Faces", summary.faces);
    println!("  {:<16} {}", "Triangles", summary.triangles);
    println!("  {:<16} {}", "Cameras", summary.cameras);
    println!("  {:<16} {}", "Lights", summary.lights);
    println!("  {:<16} {}", "Bones", summary.bones);
    println!("  {:<16} {}", "Animation keys", summary.animation_keys);
    println!("  {:<16} {}", "Size", format_size(summary.bytes as u64));
}

fn cmd_info(args: InfoArgs, format: OutputFormat) -> Result<()> {
    let scene = load(&args.input)?;
    let stats = scene.statistics();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "name": scene.name,
                "source_file": scene.source_file,
                "frame_start": scene.frame_start,
                "frame_end": scene.frame_end,
                "fps": scene.fps,
                "statistics": stats,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Scene: {}", scene.name);
            if !scene.source_file.is_empty() {
                println!("  {:<12} {}", "Source", scene.source_file);
            }
            println!(
                "  {:<12} {}-{} @ {} fps",
                "Frames", scene.frame_start, scene.frame_end, scene.fps
            );
            println!("  {:<12} {}", "Objects", stats.objects);
            println!("  {:<12} {}", "Meshes", stats.mesh_objects);
            println!("  {:<12} {}", "Cameras", stats.cameras);
            println!("  {:<12} {}", "Lights", stats.lights);
            println!("  {:<12} {}", "Armatures", stats.armatures);
            println!("  {:<12} {}", "Empties", stats.empties);
            println!("  {:<12} {}", "Materials", stats.materials);
            println!("  {:<12} {}", "Bones", stats.bones);
            println!("  {:<12} {}", "Vertices", stats.vertices);
            println!("  {:<12} {}", "Polygons", stats.polygons);
            println!("  {:<12} {}", "Triangles", stats.triangles);
        }
    }

    Ok(())
}

fn cmd_validate(args: ValidateArgs, format: OutputFormat) -> Result<()> {
    let scene = load(&args.input)?;
    if let Some(config) = &args.config {
        ExportOptions::from_file(config)
            .with_context(|| format!("Invalid options {}", config.display()))?;
    }

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "path": args.input,
                "valid": true,
                "objects": scene.objects.len(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => println!("{}: OK ({} objects)", args.input.display(), scene.objects.len()),
    }

    Ok(())
}

fn cmd_formats(format: OutputFormat) -> Result<()> {
    let exporters = GLOBAL_REGISTRY.list();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&exporters)?),
        OutputFormat::Text => {
            println!("{:<6} {:<12} {}", "ID", "Extensions", "Name");
            println!("{:-<6} {:-<12} {:-<40}", "", "", "");
            for exporter in &exporters {
                println!(
                    "{:<6} {:<12} {}",
                    exporter.id,
                    exporter.extensions.join(", "),
                    exporter.name
                );
                if !exporter.description.is_empty() {
                    println!("{:<6} {:<12} {}", "", "", exporter.description);
                }
            }
        }
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
