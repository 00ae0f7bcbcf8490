//! Light data

use serde::{Deserialize, Serialize};

/// Light type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    #[default]
    Point,
    Sun,
    Spot,
    Area,
}

impl LightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LightKind::Point => "POINT",
            LightKind::Sun => "SUN",
            LightKind::Spot => "SPOT",
            LightKind::Area => "AREA",
        }
    }

    /// Whether the light has a direction (local -Z)
    pub fn is_directional(&self) -> bool {
        matches!(self, LightKind::Sun | LightKind::Spot | LightKind::Area)
    }
}

/// Light datablock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Light {
    pub name: String,
    pub kind: LightKind,
    pub color: [f32; 3],
    /// Power / strength
    pub energy: f32,
    /// Attenuation end distance
    pub distance: f32,
    /// Spot cone angle (radians)
    pub spot_size: f32,
    /// Spot edge softness (0-1)
    pub spot_blend: f32,
    pub cast_shadows: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: LightKind::Point,
            color: [1.0, 1.0, 1.0],
            energy: 10.0,
            distance: 25.0,
            spot_size: std::f32::consts::FRAC_PI_4,
            spot_blend: 0.15,
            cast_shadows: true,
        }
    }
}

impl Light {
    pub fn new(name: impl Into<String>, kind: LightKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    /// Inner (full intensity) cone angle in radians
    pub fn hotspot(&self) -> f32 {
        self.spot_size * (1.0 - self.spot_blend.clamp(0.0, 1.0))
    }

    /// Outer cone angle in radians
    pub fn falloff(&self) -> f32 {
        self.spot_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spot_cone() {
        let mut light = Light::new("Spot", LightKind::Spot);
        light.spot_size = 1.0;
        light.spot_blend = 0.25;

        assert!((light.hotspot() - 0.75).abs() < 1e-6);
        assert_eq!(light.falloff(), 1.0);
        assert!(light.kind.is_directional());
        assert!(!LightKind::Point.is_directional());
    }
}
