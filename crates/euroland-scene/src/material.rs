//! Material definitions
//!
//! Materials carry the values a principled-shader wrapper exposes; node
//! graphs are resolved by whoever produces the scene description.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Surface material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Material name
    pub name: String,
    /// Base colour (RGBA)
    pub base_color: [f32; 4],
    /// Specular tint
    pub specular: [f32; 3],
    /// Specular intensity (0-1)
    pub specular_intensity: f32,
    /// Roughness (0-1)
    pub roughness: f32,
    /// Metallic (0-1)
    pub metallic: f32,
    /// Emission colour
    pub emission: [f32; 3],
    /// Emission strength
    pub emission_strength: f32,
    /// Alpha (0-1)
    pub alpha: f32,
    /// Backface culling disabled
    pub two_sided: bool,
    /// Image feeding the base colour, if any
    pub base_color_texture: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_color: [0.8, 0.8, 0.8, 1.0],
            specular: [1.0, 1.0, 1.0],
            specular_intensity: 0.5,
            roughness: 0.5,
            metallic: 0.0,
            emission: [0.0, 0.0, 0.0],
            emission_strength: 0.0,
            alpha: 1.0,
            two_sided: false,
            base_color_texture: None,
        }
    }
}

impl Material {
    /// Create a material with default shading values
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Diffuse RGB
    pub fn diffuse(&self) -> [f32; 3] {
        [self.base_color[0], self.base_color[1], self.base_color[2]]
    }

    /// Specular tint scaled by intensity
    pub fn specular_color(&self) -> [f32; 3] {
        self.specular.map(|c| c * self.specular_intensity)
    }

    /// Emission scaled by strength
    pub fn emissive_color(&self) -> [f32; 3] {
        self.emission.map(|c| c * self.emission_strength)
    }

    pub fn shininess(&self) -> f32 {
        (1.0 - self.roughness).clamp(0.0, 1.0)
    }

    /// Combined opacity of alpha and base colour alpha
    pub fn opacity(&self) -> f32 {
        (self.alpha * self.base_color[3]).clamp(0.0, 1.0)
    }

    pub fn transparency(&self) -> f32 {
        1.0 - self.opacity()
    }

    /// Texture file stem, used as the map name
    pub fn texture_name(&self) -> Option<&str> {
        self.base_color_texture
            .as_deref()
            .map(|path| Path::new(path).file_stem().and_then(|s| s.to_str()).unwrap_or(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_values() {
        let mut material = Material::new("Glass");
        material.alpha = 0.5;
        material.base_color[3] = 0.5;
        material.roughness = 0.2;

        assert!((material.opacity() - 0.25).abs() < 1e-6);
        assert!((material.transparency() - 0.75).abs() < 1e-6);
        assert!((material.shininess() - 0.8).abs() < 1e-6);
        assert_eq!(material.specular_color(), [0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_texture_name() {
        let mut material = Material::new("Brick");
        assert_eq!(material.texture_name(), None);

        material.base_color_texture = Some("textures/brick_wall.png".into());
        assert_eq!(material.texture_name(), Some("brick_wall"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let material: Material = serde_yaml::from_str("name: Red\nbase_color: [1.0, 0.0, 0.0, 1.0]\n").unwrap();
        assert_eq!(material.name, "Red");
        assert_eq!(material.roughness, 0.5);
        assert!(!material.two_sided);
    }
}
