//! Export options shared by every format

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::basis::{BasisConversion, CoordinateSystem};
use crate::traits::{ExportError, ExportResult};

/// Largest supported number of decimals
pub const MAX_PRECISION: usize = 9;

/// Export options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Target basis
    pub coordinate_system: CoordinateSystem,
    /// Multiplies translations and positions
    pub global_scale: f32,
    /// Export only selected objects
    pub selected_only: bool,
    /// Skip hidden objects
    pub visible_only: bool,
    /// Bake object transforms into vertices (EIF world, RTG parent-relative)
    pub apply_transform: bool,
    /// Deduplicate vertex positions
    pub merge_vertices: bool,
    /// Flip texture V (`v' = 1 - v`)
    pub flip_v: bool,
    /// Reverse face corner order
    pub flip_winding: bool,
    pub export_uvs: bool,
    pub export_colors: bool,
    pub export_normals: bool,
    pub export_shape_keys: bool,
    pub export_skin_weights: bool,
    pub export_cameras: bool,
    pub export_lights: bool,
    pub export_empties: bool,
    pub export_armatures: bool,
    /// Write baked animation keys
    pub export_animation: bool,
    /// Decimal places; the format default when unset
    pub precision: Option<usize>,
    /// Write a timestamp comment where the format has one
    pub write_timestamp: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            coordinate_system: CoordinateSystem::YUpLeftHanded,
            global_scale: 1.0,
            selected_only: false,
            visible_only: true,
            apply_transform: false,
            merge_vertices: true,
            flip_v: true,
            flip_winding: false,
            export_uvs: true,
            export_colors: true,
            export_normals: true,
            export_shape_keys: true,
            export_skin_weights: true,
            export_cameras: true,
            export_lights: true,
            export_empties: true,
            export_armatures: true,
            export_animation: true,
            precision: None,
            write_timestamp: false,
        }
    }
}

impl ExportOptions {
    /// Load options from a YAML or JSON file
    pub fn from_file(path: impl AsRef<Path>) -> ExportResult<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let text = std::fs::read_to_string(path)?;
        let options: ExportOptions = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&text)?,
            "json" => serde_json::from_str(&text)?,
            _ => {
                return Err(ExportError::Config(format!(
                    "unsupported config file '{}' (expected .yaml, .yml or .json)",
                    path.display()
                )))
            }
        };

        options.validate()?;
        Ok(options)
    }

    /// Reject values no exporter can honour
    pub fn validate(&self) -> ExportResult<()> {
        if !self.global_scale.is_finite() || self.global_scale <= 0.0 {
            return Err(ExportError::Config(format!(
                "global_scale must be positive, got {}",
                self.global_scale
            )));
        }
        if let Some(precision) = self.precision {
            if precision > MAX_PRECISION {
                return Err(ExportError::Config(format!(
                    "precision must be at most {}, got {}",
                    MAX_PRECISION, precision
                )));
            }
        }
        Ok(())
    }

    /// Conversion into the configured target basis
    pub fn conversion(&self) -> BasisConversion {
        BasisConversion::new(self.coordinate_system, self.global_scale)
    }

    /// Precision for a format, honouring the override
    pub fn precision_or(&self, default: usize) -> usize {
        self.precision.unwrap_or(default)
    }
}
