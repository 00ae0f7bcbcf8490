//! Runtime geometry (RTG)
//!
//! Hierarchical export for the runtime: transforms are parent-relative,
//! geometry is triangulated and baked animation is written as keys.

mod exporter;

pub use exporter::RtgExporter;

/// Version written after `*RTG_EXPORT`
pub const RTG_VERSION: u32 = 100;

/// Decimal places unless overridden
pub const DEFAULT_PRECISION: usize = 6;
