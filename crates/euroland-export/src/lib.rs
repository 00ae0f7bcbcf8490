//! euroland-export
//!
//! Text exporters turning a [`euroland_scene::Scene`] into the EuroLand
//! engine's interchange formats.
//!
//! # Supported Formats
//!
//! | Format | Extension | Description |
//! |--------|-----------|-------------|
//! | EIF    | `.eif`    | Static scene, shared meshes, world-space nodes |
//! | ESE    | `.ese`    | ASE-style dump with triangulated world-space geometry |
//! | RTG    | `.rtg`    | Runtime hierarchy, skeletons, baked animation keys |
//!
//! # Example
//!
//! ```rust,ignore
//! use euroland_export::{ExportOptions, GLOBAL_REGISTRY};
//! use euroland_scene::load_scene;
//!
//! let scene = load_scene("level.yaml")?;
//! let exporter = GLOBAL_REGISTRY.get_for_path(Path::new("level.eif"))?;
//! let summary = exporter.export_file(&scene, &ExportOptions::default(), Path::new("level.eif"))?;
//! println!("{} triangles", summary.triangles);
//! ```

pub mod basis;
pub mod context;
pub mod indexing;
pub mod logging;
pub mod materials;
pub mod options;
pub mod registry;
pub mod traits;
pub mod walk;
pub mod writer;

pub mod eif;
pub mod ese;
pub mod rtg;

// Re-export main types
pub use basis::{BasisConversion, CoordinateSystem, NodeTransform};
pub use context::ExportContext;
pub use indexing::{dedup, IndexedMesh, MeshContext, Triangle, UniqueList};
pub use materials::{MaterialTable, DEFAULT_MATERIAL_NAME};
pub use options::{ExportOptions, MAX_PRECISION};
pub use traits::{ExportError, ExportResult, ExportSummary, Exporter, RenderedExport};
pub use walk::{ExportNode, SceneWalker};
pub use writer::TagWriter;

pub use registry::{
    ExporterInfo, ExporterRegistration, ExporterRegistrationBuilder, ExporterRegistry,
    RegistryError, GLOBAL_REGISTRY,
};

pub use eif::EifExporter;
pub use ese::EseExporter;
pub use rtg::RtgExporter;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
