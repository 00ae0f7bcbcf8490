//! EuroLand Interchange Format (EIF)
//!
//! Static scene description: one material table, mesh definitions shared by
//! the nodes that place them, and a flat node list carrying world
//! transforms. N-gons are kept as-is.

mod exporter;

pub use exporter::EifExporter;

/// Format version written after `*EIF`
pub const EIF_VERSION: u32 = 1;

/// Decimal places unless overridden
pub const DEFAULT_PRECISION: usize = 6;

/// `*FACE` flag bit for smooth shaded polygons
pub const FACE_FLAG_SMOOTH: u32 = 1;
