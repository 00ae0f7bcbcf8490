//! euroland-scene
//!
//! Read-only scene model consumed by the EuroLand exporters.
//!
//! The model mirrors what a DCC host hands an exporter after evaluation:
//! modifier-applied meshes with per-loop layers, materials reduced to a
//! principled shading model, cameras, lights, rest-pose armatures, and
//! objects with world matrices and optional baked animation.
//!
//! # Example
//!
//! ```rust,ignore
//! use euroland_scene::load_scene;
//!
//! let scene = load_scene("level.yaml")?;
//! println!("{} objects", scene.objects.len());
//! ```

pub mod armature;
pub mod camera;
pub mod light;
pub mod loader;
pub mod material;
pub mod mesh;
pub mod object;
pub mod scene;

pub use armature::{Armature, Bone};
pub use camera::{Camera, Projection};
pub use light::{Light, LightKind};
pub use loader::{load_scene, SceneFormat};
pub use material::Material;
pub use mesh::{
    newell_normal, ColorLayer, CornerList, Mesh, MeshLoop, MeshVertex, Polygon, ShapeKey, UvLayer,
    VertexWeight,
};
pub use object::{Object, ObjectData, ObjectKind, TransformSample};
pub use scene::{Scene, SceneStatistics};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
