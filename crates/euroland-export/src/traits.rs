//! Core traits defining the exporter interface for all text formats.
//!
//! Exporters render a whole document in memory first. The provided file
//! and stream methods only write once rendering succeeded, so a failed
//! export never leaves a partial file behind.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use euroland_scene::Scene;
use serde::Serialize;
use thiserror::Error;

use crate::options::ExportOptions;

/// Errors that can occur during export
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scene error: {0}")]
    Scene(#[from] euroland_core::Error),

    #[error("Invalid mesh data: {0}")]
    InvalidMeshData(String),

    #[error("Missing {kind}: {name}")]
    MissingReference { kind: &'static str, name: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{context}: {source}")]
    Nested {
        context: String,
        #[source]
        source: Box<ExportError>,
    },
}

impl ExportError {
    /// Wrap this error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ExportError::Nested {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn missing(kind: &'static str, name: impl Into<String>) -> Self {
        ExportError::MissingReference {
            kind,
            name: name.into(),
        }
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for ExportError {
    fn from(err: serde_yaml::Error) -> Self {
        ExportError::Serialization(err.to_string())
    }
}

/// Result type alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// What an export produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Exporter id
    pub format: String,
    pub nodes: usize,
    pub meshes: usize,
    pub materials: usize,
    pub positions: usize,
    pub faces: usize,
    pub triangles: usize,
    pub cameras: usize,
    pub lights: usize,
    pub bones: usize,
    pub animation_keys: usize,
    /// Size of the rendered document
    pub bytes: usize,
}

impl ExportSummary {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            ..Default::default()
        }
    }
}

/// Fully rendered document
#[derive(Debug, Clone)]
pub struct RenderedExport {
    pub text: String,
    pub summary: ExportSummary,
}

/// Core trait for all scene exporters
///
/// Implementors render a validated scene into one text document.
pub trait Exporter: Send + Sync {
    /// Short identifier (e.g. `"eif"`)
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// Output file extensions, without the dot
    fn extensions(&self) -> &[&str];

    /// Decimal places used when the options do not override them
    fn default_precision(&self) -> usize;

    /// Render the scene into memory
    fn render(&self, scene: &Scene, options: &ExportOptions) -> ExportResult<RenderedExport>;

    /// Effective precision for these options
    fn precision(&self, options: &ExportOptions) -> usize {
        options.precision_or(self.default_precision())
    }

    /// Render and return only the text
    fn export_string(&self, scene: &Scene, options: &ExportOptions) -> ExportResult<String> {
        Ok(self.render(scene, options)?.text)
    }

    /// Render, then write to a stream
    fn write_scene(
        &self,
        scene: &Scene,
        options: &ExportOptions,
        out: &mut dyn Write,
    ) -> ExportResult<ExportSummary> {
        let rendered = self.render(scene, options)?;
        out.write_all(rendered.text.as_bytes())?;
        out.flush()?;
        Ok(rendered.summary)
    }

    /// Render, then create and write the output file
    fn export_file(
        &self,
        scene: &Scene,
        options: &ExportOptions,
        path: &Path,
    ) -> ExportResult<ExportSummary> {
        let rendered = self.render(scene, options)?;

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(rendered.text.as_bytes())?;
        writer.flush()?;

        Ok(rendered.summary)
    }

    /// Check whether a path carries one of this exporter's extensions
    fn can_export(&self, path: &Path) -> bool {
        match path.extension() {
            Some(ext) => {
                let ext = ext.to_string_lossy().to_lowercase();
                self.extensions().iter().any(|e| e.to_lowercase() == ext)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    impl Exporter for Dummy {
        fn id(&self) -> &str {
            "dummy"
        }

        fn name(&self) -> &str {
            "Dummy"
        }

        fn extensions(&self) -> &[&str] {
            &["dmy"]
        }

        fn default_precision(&self) -> usize {
            3
        }

        fn render(&self, scene: &Scene, _options: &ExportOptions) -> ExportResult<RenderedExport> {
            if scene.name == "broken" {
                return Err(ExportError::InvalidMeshData("broken".into()));
            }
            Ok(RenderedExport {
                text: format!("*SCENE \"{}\"\n", scene.name),
                summary: ExportSummary::new("dummy"),
            })
        }
    }

    #[test]
    fn test_can_export_extension() {
        assert!(Dummy.can_export(Path::new("out/level.DMY")));
        assert!(!Dummy.can_export(Path::new("out/level.eif")));
        assert!(!Dummy.can_export(Path::new("out/level")));
    }

    #[test]
    fn test_precision_override() {
        let options = ExportOptions {
            precision: Some(5),
            ..Default::default()
        };
        assert_eq!(Dummy.precision(&ExportOptions::default()), 3);
        assert_eq!(Dummy.precision(&options), 5);
    }

    #[test]
    fn test_failed_render_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dmy");

        let result = Dummy.export_file(&Scene::new("broken"), &ExportOptions::default(), &path);
        assert!(result.is_err());
        assert!(!path.exists());

        Dummy.export_file(&Scene::new("ok"), &ExportOptions::default(), &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "*SCENE \"ok\"\n");
    }

    #[test]
    fn test_error_context() {
        let err = ExportError::missing("mesh", "Cube").with_context("object 'Box'");
        assert_eq!(err.to_string(), "object 'Box': Missing mesh: Cube");
    }
}
