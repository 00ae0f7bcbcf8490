//! Scene description loading
//!
//! Scenes arrive as JSON or YAML documents mirroring [`Scene`]. Every loaded
//! scene is validated before it is handed out.

use std::path::Path;
use std::time::Instant;

use euroland_core::{Error, Result, ResultExt};
use tracing::{debug, info};

use crate::scene::Scene;

/// Supported scene description encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneFormat {
    Json,
    Yaml,
}

impl SceneFormat {
    /// Detect the encoding from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "json" => Ok(SceneFormat::Json),
            "yaml" | "yml" => Ok(SceneFormat::Yaml),
            _ => Err(Error::UnsupportedFormat {
                format: if ext.is_empty() { "<none>".to_string() } else { ext },
            }),
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            SceneFormat::Json => &["json"],
            SceneFormat::Yaml => &["yaml", "yml"],
        }
    }
}

impl Scene {
    /// Parse and validate a JSON scene description
    pub fn from_json_str(text: &str) -> Result<Self> {
        let scene: Scene = serde_json::from_str(text).map_err(|e| Error::Malformed {
            message: e.to_string(),
        })?;
        scene.validate()?;
        Ok(scene)
    }

    /// Parse and validate a YAML scene description
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let scene: Scene = serde_yaml::from_str(text).map_err(|e| Error::Malformed {
            message: e.to_string(),
        })?;
        scene.validate()?;
        Ok(scene)
    }

    /// Serialize back to pretty JSON
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Malformed {
            message: e.to_string(),
        })
    }
}

/// Load a scene description from disk
pub fn load_scene(path: impl AsRef<Path>) -> Result<Scene> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let format = SceneFormat::from_path(path)?;
    let start = Instant::now();
    let text = std::fs::read_to_string(path)?;

    debug!(path = %path.display(), bytes = text.len(), ?format, "Read scene description");

    let scene = match format {
        SceneFormat::Json => Scene::from_json_str(&text),
        SceneFormat::Yaml => Scene::from_yaml_str(&text),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    info!(
        path = %path.display(),
        objects = scene.objects.len(),
        meshes = scene.meshes.len(),
        duration_ms = %start.elapsed().as_millis(),
        "Scene loaded"
    );

    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_detection() {
        assert_eq!(SceneFormat::from_path(Path::new("a.JSON")).unwrap(), SceneFormat::Json);
        assert_eq!(SceneFormat::from_path(Path::new("a.yml")).unwrap(), SceneFormat::Yaml);
        assert!(SceneFormat::from_path(Path::new("a.blend")).is_err());
        assert!(SceneFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_scene(PathBuf::from("/definitely/not/here.json")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_malformed_json() {
        let err = Scene::from_json_str("{ objects: ").unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let scene = Scene::from_json_str(r#"{"name": "Level"}"#).unwrap();
        assert_eq!(scene.name, "Level");
        assert_eq!(scene.fps, 24);
        assert!(scene.objects.is_empty());
    }
}
