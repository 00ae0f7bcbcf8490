//! EuroLand Scene Export (ESE)
//!
//! ASE-style scene dump: triangulated geometry with world-space vertices,
//! cameras, lights and helper objects, each carrying its node transform.

mod exporter;

pub use exporter::EseExporter;

/// Version written after `*3DSMAX_EUROEXPORT`
pub const ESE_VERSION: u32 = 300;

/// Decimal places unless overridden
pub const DEFAULT_PRECISION: usize = 4;

/// Animation ticks per frame
pub const TICKS_PER_FRAME: i64 = 160;
