//! Camera data

use serde::{Deserialize, Serialize};

/// Projection type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

/// Camera datablock. The camera looks down its local -Z axis with +Y up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub name: String,
    pub projection: Projection,
    /// Horizontal field of view (radians)
    pub fov: f32,
    /// Orthographic view width
    pub ortho_scale: f32,
    pub clip_start: f32,
    pub clip_end: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            name: String::new(),
            projection: Projection::Perspective,
            fov: 0.857_556,
            ortho_scale: 7.314_286,
            clip_start: 0.1,
            clip_end: 100.0,
        }
    }
}

impl Camera {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_orthographic(&self) -> bool {
        self.projection == Projection::Orthographic
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov.to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fov_is_fifty_mm_lens() {
        let camera = Camera::new("Camera");
        assert!((camera.fov_degrees() - 49.134).abs() < 0.01);
        assert!(!camera.is_orthographic());
    }
}
