//! Scene objects

use euroland_core::Mat4;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Datablock an object instantiates
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "lowercase")]
pub enum ObjectData {
    Mesh(String),
    Camera(String),
    Light(String),
    Armature(String),
    #[default]
    Empty,
}

impl ObjectData {
    /// Object kind
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectData::Mesh(_) => ObjectKind::Mesh,
            ObjectData::Camera(_) => ObjectKind::Camera,
            ObjectData::Light(_) => ObjectKind::Light,
            ObjectData::Armature(_) => ObjectKind::Armature,
            ObjectData::Empty => ObjectKind::Empty,
        }
    }

    /// Referenced datablock name
    pub fn data_name(&self) -> Option<&str> {
        match self {
            ObjectData::Mesh(name)
            | ObjectData::Camera(name)
            | ObjectData::Light(name)
            | ObjectData::Armature(name) => Some(name),
            ObjectData::Empty => None,
        }
    }
}

/// Object kind without the datablock reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Mesh,
    Camera,
    Light,
    Armature,
    Empty,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Mesh => "MESH",
            ObjectKind::Camera => "CAMERA",
            ObjectKind::Light => "LIGHT",
            ObjectKind::Armature => "ARMATURE",
            ObjectKind::Empty => "EMPTY",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Baked world transform at a frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformSample {
    pub frame: i32,
    pub matrix_world: Mat4,
}

fn default_true() -> bool {
    true
}

/// Scene object (node)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    /// Object name (unique in the scene)
    pub name: String,
    /// Parent object name
    #[serde(default)]
    pub parent: Option<String>,
    /// Instantiated datablock
    #[serde(default)]
    pub data: ObjectData,
    /// World transform
    #[serde(default)]
    pub matrix_world: Mat4,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub selected: bool,
    /// Armature object deforming this mesh
    #[serde(default)]
    pub armature: Option<String>,
    /// Baked animation, ordered by frame
    #[serde(default)]
    pub animation: Vec<TransformSample>,
}

impl Object {
    /// Create a visible object at the origin
    pub fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Self {
            name: name.into(),
            parent: None,
            data,
            matrix_world: Mat4::IDENTITY,
            visible: true,
            selected: false,
            armature: None,
            animation: Vec::new(),
        }
    }

    /// Builder-style parent assignment
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Builder-style world matrix assignment
    pub fn with_matrix(mut self, matrix_world: Mat4) -> Self {
        self.matrix_world = matrix_world;
        self
    }

    pub fn kind(&self) -> ObjectKind {
        self.data.kind()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// World matrix at `frame`, falling back to the rest transform
    pub fn matrix_at(&self, frame: i32) -> Mat4 {
        self.animation
            .iter()
            .find(|s| s.frame == frame)
            .map(|s| s.matrix_world)
            .unwrap_or(self.matrix_world)
    }
}
