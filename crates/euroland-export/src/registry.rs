//! Exporter registry for format discovery and lookup.
//!
//! The registry maps exporter ids and output extensions to exporter
//! instances. The three built-in formats are registered in
//! [`GLOBAL_REGISTRY`]; hosts can add their own at runtime.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::eif::EifExporter;
use crate::ese::EseExporter;
use crate::rtg::RtgExporter;
use crate::traits::Exporter;

/// Factory function type for creating exporter instances
pub type ExporterFactory = Box<dyn Fn() -> Arc<dyn Exporter> + Send + Sync>;

/// Registration entry for an exporter
pub struct ExporterRegistration {
    /// Unique identifier for this exporter
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Description of the format
    pub description: String,
    /// File extensions written (lowercase, no dot)
    pub extensions: Vec<String>,
    /// Priority for extension conflicts (higher = preferred)
    pub priority: i32,
    /// Factory function to create the exporter instance
    pub factory: ExporterFactory,
}

/// Exporter registry
pub struct ExporterRegistry {
    /// Map of exporter ID to registration
    exporters: RwLock<HashMap<String, ExporterRegistration>>,
    /// Map of extensions to exporter IDs (sorted by priority)
    extension_map: RwLock<HashMap<String, Vec<String>>>,
    /// Cached exporter instances
    instances: RwLock<HashMap<String, Arc<dyn Exporter>>>,
}

impl ExporterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            exporters: RwLock::new(HashMap::new()),
            extension_map: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with the built-in formats
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        register_builtin_exporters(&registry);
        registry
    }

    /// Register a new exporter
    pub fn register(&self, registration: ExporterRegistration) -> Result<(), RegistryError> {
        let id = registration.id.clone();

        let mut exporters = self.exporters.write();
        if exporters.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }

        let priority = registration.priority;
        let mut ext_map = self.extension_map.write();
        for ext in &registration.extensions {
            let ids = ext_map.entry(normalize_extension(ext)).or_default();
            ids.push(id.clone());

            // Sort by priority (descending)
            ids.sort_by_key(|other| {
                let p = if *other == id {
                    priority
                } else {
                    exporters.get(other).map(|e| e.priority).unwrap_or(0)
                };
                std::cmp::Reverse(p)
            });
        }

        debug!(exporter = %id, extensions = ?registration.extensions, "Registered exporter");
        exporters.insert(id, registration);
        Ok(())
    }

    /// Unregister an exporter by ID
    pub fn unregister(&self, id: &str) -> Result<(), RegistryError> {
        let mut exporters = self.exporters.write();
        let registration = exporters
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        let mut ext_map = self.extension_map.write();
        for ext in &registration.extensions {
            let key = normalize_extension(ext);
            if let Some(ids) = ext_map.get_mut(&key) {
                ids.retain(|i| i != id);
                if ids.is_empty() {
                    ext_map.remove(&key);
                }
            }
        }

        self.instances.write().remove(id);
        Ok(())
    }

    /// Get an exporter instance by ID
    pub fn get(&self, id: &str) -> Result<Arc<dyn Exporter>, RegistryError> {
        if let Some(instance) = self.instances.read().get(id) {
            return Ok(Arc::clone(instance));
        }

        let instance = {
            let exporters = self.exporters.read();
            let registration = exporters
                .get(id)
                .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
            (registration.factory)()
        };

        self.instances
            .write()
            .insert(id.to_string(), Arc::clone(&instance));
        Ok(instance)
    }

    /// Get the preferred exporter for a file extension
    pub fn get_for_extension(&self, ext: &str) -> Result<Arc<dyn Exporter>, RegistryError> {
        let key = normalize_extension(ext);

        let id = self
            .extension_map
            .read()
            .get(&key)
            .and_then(|ids| ids.first())
            .cloned()
            .ok_or(RegistryError::NoExporterForExtension(key))?;

        self.get(&id)
    }

    /// Get the exporter for an output path
    pub fn get_for_path(&self, path: &Path) -> Result<Arc<dyn Exporter>, RegistryError> {
        path.extension()
            .and_then(|ext| self.get_for_extension(&ext.to_string_lossy()).ok())
            .ok_or_else(|| RegistryError::NoExporterForPath(path.to_path_buf()))
    }

    /// List all registered exporters, sorted by id
    pub fn list(&self) -> Vec<ExporterInfo> {
        let mut list: Vec<ExporterInfo> = self
            .exporters
            .read()
            .values()
            .map(|e| ExporterInfo {
                id: e.id.clone(),
                name: e.name.clone(),
                description: e.description.clone(),
                extensions: e.extensions.clone(),
                priority: e.priority,
            })
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    /// Number of registered exporters
    pub fn len(&self) -> usize {
        self.exporters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.exporters.read().is_empty()
    }
}

impl Default for ExporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

/// Exporter information for display
#[derive(Debug, Clone, Serialize)]
pub struct ExporterInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub extensions: Vec<String>,
    pub priority: i32,
}

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Exporter with ID '{0}' already registered")]
    DuplicateId(String),

    #[error("Exporter with ID '{0}' not found")]
    NotFound(String),

    #[error("No exporter available for extension '.{0}'")]
    NoExporterForExtension(String),

    #[error("No exporter available for path: {}", .0.display())]
    NoExporterForPath(PathBuf),

    #[error("Invalid registration: {0}")]
    InvalidRegistration(&'static str),
}

/// Global registry instance
pub static GLOBAL_REGISTRY: Lazy<ExporterRegistry> = Lazy::new(ExporterRegistry::with_builtins);

/// Register the EIF, ESE and RTG exporters
fn register_builtin_exporters(registry: &ExporterRegistry) {
    let builtins = [
        ExporterRegistrationBuilder::new()
            .id("eif")
            .name("EuroLand Interchange Format")
            .description("Static scene with shared mesh definitions and world-space nodes")
            .extensions(&["eif"])
            .priority(100)
            .factory(EifExporter::new)
            .build(),
        ExporterRegistrationBuilder::new()
            .id("ese")
            .name("EuroLand Scene Export")
            .description("ASE-style scene dump with triangulated world-space geometry")
            .extensions(&["ese"])
            .priority(100)
            .factory(EseExporter::new)
            .build(),
        ExporterRegistrationBuilder::new()
            .id("rtg")
            .name("EuroLand Runtime Geometry")
            .description("Runtime hierarchy with local transforms, skeletons and baked animation")
            .extensions(&["rtg"])
            .priority(100)
            .factory(RtgExporter::new)
            .build(),
    ];

    for registration in builtins {
        if let Err(e) = registration.and_then(|r| registry.register(r)) {
            tracing::error!(error = %e, "Failed to register built-in exporter");
        }
    }
}

/// Builder for exporter registration
pub struct ExporterRegistrationBuilder {
    id: Option<String>,
    name: Option<String>,
    description: String,
    extensions: Vec<String>,
    priority: i32,
    factory: Option<ExporterFactory>,
}

impl ExporterRegistrationBuilder {
    pub fn new() -> Self {
        Self {
            id: None,
            name: None,
            description: String::new(),
            extensions: Vec::new(),
            priority: 0,
            factory: None,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn extensions(mut self, exts: &[&str]) -> Self {
        self.extensions = exts.iter().map(|s| normalize_extension(s)).collect();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn factory<F, E>(mut self, factory: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
        E: Exporter + 'static,
    {
        self.factory = Some(Box::new(move || Arc::new(factory()) as Arc<dyn Exporter>));
        self
    }

    pub fn build(self) -> Result<ExporterRegistration, RegistryError> {
        let id = self.id.ok_or(RegistryError::InvalidRegistration("ID is required"))?;
        let factory = self
            .factory
            .ok_or(RegistryError::InvalidRegistration("Factory is required"))?;

        Ok(ExporterRegistration {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            description: self.description,
            extensions: self.extensions,
            priority: self.priority,
            factory,
        })
    }
}

impl Default for ExporterRegistrationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ExportOptions;
    use crate::traits::{ExportResult, ExportSummary, RenderedExport};
    use euroland_scene::Scene;

    // Mock exporter for testing
    struct MockExporter;

    impl Exporter for MockExporter {
        fn id(&self) -> &str {
            "mock"
        }

        fn name(&self) -> &str {
            "Mock Exporter"
        }

        fn extensions(&self) -> &[&str] {
            &["mock", "eif"]
        }

        fn default_precision(&self) -> usize {
            2
        }

        fn render(&self, _scene: &Scene, _options: &ExportOptions) -> ExportResult<RenderedExport> {
            Ok(RenderedExport {
                text: "*MOCK\n".into(),
                summary: ExportSummary::new("mock"),
            })
        }
    }

    fn mock_registration(priority: i32) -> ExporterRegistration {
        ExporterRegistrationBuilder::new()
            .id("mock")
            .name("Mock Exporter")
            .extensions(&["mock", "EIF"])
            .priority(priority)
            .factory(|| MockExporter)
            .build()
            .unwrap()
    }

    #[test]
    fn test_registry_registration() {
        let registry = ExporterRegistry::new();
        registry.register(mock_registration(10)).unwrap();

        let exporter = registry.get("mock").unwrap();
        assert_eq!(exporter.name(), "Mock Exporter");
        assert!(matches!(
            registry.register(mock_registration(10)),
            Err(RegistryError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_extension_lookup() {
        let registry = ExporterRegistry::new();
        registry.register(mock_registration(0)).unwrap();

        assert_eq!(registry.get_for_extension("mock").unwrap().id(), "mock");
        assert_eq!(registry.get_for_extension(".MOCK").unwrap().id(), "mock");
        assert!(matches!(
            registry.get_for_extension("obj"),
            Err(RegistryError::NoExporterForExtension(ext)) if ext == "obj"
        ));
    }

    #[test]
    fn test_priority_ordering() {
        let registry = ExporterRegistry::with_builtins();
        assert_eq!(registry.get_for_extension("eif").unwrap().id(), "eif");

        registry.register(mock_registration(200)).unwrap();
        assert_eq!(registry.get_for_extension("eif").unwrap().id(), "mock");

        registry.unregister("mock").unwrap();
        assert_eq!(registry.get_for_extension("eif").unwrap().id(), "eif");
        assert!(registry.get_for_extension("mock").is_err());
        assert!(matches!(registry.unregister("mock"), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_path_lookup() {
        let registry = ExporterRegistry::with_builtins();

        assert_eq!(registry.get_for_path(Path::new("out/level.RTG")).unwrap().id(), "rtg");
        assert!(matches!(
            registry.get_for_path(Path::new("out/level")),
            Err(RegistryError::NoExporterForPath(_))
        ));
    }

    #[test]
    fn test_builtins_listed() {
        let ids: Vec<String> = GLOBAL_REGISTRY.list().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["eif", "ese", "rtg"]);
        assert_eq!(GLOBAL_REGISTRY.len(), 3);
    }

    #[test]
    fn test_builder_requires_factory() {
        let result = ExporterRegistrationBuilder::new().id("broken").build();
        assert!(matches!(result, Err(RegistryError::InvalidRegistration(_))));
    }
}
