//! Scene container, lookups, hierarchy ordering and validation

use euroland_core::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::armature::Armature;
use crate::camera::Camera;
use crate::light::Light;
use crate::material::Material;
use crate::mesh::Mesh;
use crate::object::{Object, ObjectData, ObjectKind};

/// A complete scene as handed over by the host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub name: String,
    /// File the scene was saved as
    pub source_file: String,
    pub frame_start: i32,
    pub frame_end: i32,
    pub frame_current: i32,
    pub fps: u32,
    /// World ambient colour
    pub ambient: [f32; 3],
    /// World background colour
    pub background: [f32; 3],
    pub materials: Vec<Material>,
    pub meshes: Vec<Mesh>,
    pub cameras: Vec<Camera>,
    pub lights: Vec<Light>,
    pub armatures: Vec<Armature>,
    pub objects: Vec<Object>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            name: "Scene".to_string(),
            source_file: String::new(),
            frame_start: 1,
            frame_end: 250,
            frame_current: 1,
            fps: 24,
            ambient: [0.05, 0.05, 0.05],
            background: [0.0, 0.0, 0.0],
            materials: Vec::new(),
            meshes: Vec::new(),
            cameras: Vec::new(),
            lights: Vec::new(),
            armatures: Vec::new(),
            objects: Vec::new(),
        }
    }
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn mesh(&self, name: &str) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.name == name)
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name == name)
    }

    pub fn camera(&self, name: &str) -> Option<&Camera> {
        self.cameras.iter().find(|c| c.name == name)
    }

    pub fn light(&self, name: &str) -> Option<&Light> {
        self.lights.iter().find(|l| l.name == name)
    }

    pub fn armature(&self, name: &str) -> Option<&Armature> {
        self.armatures.iter().find(|a| a.name == name)
    }

    pub fn object(&self, name: &str) -> Option<&Object> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn object_index(&self, name: &str) -> Option<usize> {
        self.objects.iter().position(|o| o.name == name)
    }

    /// Mesh datablock of a mesh object
    pub fn object_mesh(&self, object: &Object) -> Option<&Mesh> {
        match &object.data {
            ObjectData::Mesh(name) => self.mesh(name),
            _ => None,
        }
    }

    /// Armature datablock of an armature object
    pub fn object_armature(&self, object: &Object) -> Option<&Armature> {
        match &object.data {
            ObjectData::Armature(name) => self.armature(name),
            _ => None,
        }
    }

    /// Parent object, if it exists
    pub fn parent_of(&self, object: &Object) -> Option<&Object> {
        object.parent.as_deref().and_then(|p| self.object(p))
    }

    /// Direct children of the named object, in declaration order
    pub fn children(&self, name: &str) -> Vec<&Object> {
        self.objects
            .iter()
            .filter(|o| o.parent.as_deref() == Some(name))
            .collect()
    }

    /// Objects without a (resolvable) parent
    pub fn roots(&self) -> Vec<&Object> {
        self.objects
            .iter()
            .filter(|o| self.parent_of(o).is_none())
            .collect()
    }

    /// Object indices, depth-first, parents ahead of their children
    pub fn hierarchy_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.objects.len());
        let mut visited = HashSet::with_capacity(self.objects.len());
        let mut stack: Vec<usize> = (0..self.objects.len())
            .filter(|&i| self.parent_of(&self.objects[i]).is_none())
            .rev()
            .collect();

        while let Some(idx) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }
            order.push(idx);

            let name = &self.objects[idx].name;
            let children: Vec<usize> = (0..self.objects.len())
                .filter(|&i| self.objects[i].parent.as_deref() == Some(name.as_str()))
                .collect();
            stack.extend(children.into_iter().rev());
        }

        order
    }

    /// Check references, uniqueness and hierarchy
    pub fn validate(&self) -> Result<()> {
        check_unique("material", self.materials.iter().map(|m| m.name.as_str()))?;
        check_unique("mesh", self.meshes.iter().map(|m| m.name.as_str()))?;
        check_unique("camera", self.cameras.iter().map(|c| c.name.as_str()))?;
        check_unique("light", self.lights.iter().map(|l| l.name.as_str()))?;
        check_unique("armature", self.armatures.iter().map(|a| a.name.as_str()))?;
        check_unique("object", self.objects.iter().map(|o| o.name.as_str()))?;

        for mesh in &self.meshes {
            mesh.validate()?;
            for slot in mesh.materials.iter().flatten() {
                if self.material(slot).is_none() {
                    return Err(Error::missing_reference("material", slot)
                        .with_context(format!("mesh '{}'", mesh.name)));
                }
            }
        }

        for armature in &self.armatures {
            armature
                .validate()
                .with_context(|| format!("armature '{}'", armature.name))?;
        }

        for object in &self.objects {
            self.validate_object(object)
                .with_context(|| format!("object '{}'", object.name))?;
        }

        Ok(())
    }

    fn validate_object(&self, object: &Object) -> Result<()> {
        if object.name.is_empty() {
            return Err(Error::missing_field("name"));
        }

        let resolved = match &object.data {
            ObjectData::Mesh(name) => self.mesh(name).is_some(),
            ObjectData::Camera(name) => self.camera(name).is_some(),
            ObjectData::Light(name) => self.light(name).is_some(),
            ObjectData::Armature(name) => self.armature(name).is_some(),
            ObjectData::Empty => true,
        };
        if !resolved {
            let kind = object.kind().as_str().to_lowercase();
            let name = object.data.data_name().unwrap_or_default();
            return Err(Error::missing_reference(kind, name));
        }

        if !object.matrix_world.is_finite()
            || object.animation.iter().any(|s| !s.matrix_world.is_finite())
        {
            return Err(Error::invalid_data("non-finite world matrix"));
        }

        if let Some(parent) = &object.parent {
            if parent == &object.name || self.object(parent).is_none() {
                return Err(Error::missing_reference("parent", parent));
            }

            let mut current = object;
            let mut steps = 0;
            while let Some(next) = self.parent_of(current) {
                steps += 1;
                if steps > self.objects.len() {
                    return Err(Error::cyclic("object", &object.name));
                }
                current = next;
            }
        }

        if let Some(armature) = &object.armature {
            match self.object(armature) {
                Some(target) if target.kind() == ObjectKind::Armature => {}
                _ => return Err(Error::missing_reference("armature object", armature)),
            }
        }

        Ok(())
    }

    /// Summary counts
    pub fn statistics(&self) -> SceneStatistics {
        let mut stats = SceneStatistics {
            objects: self.objects.len(),
            materials: self.materials.len(),
            ..Default::default()
        };

        for object in &self.objects {
            match object.kind() {
                ObjectKind::Mesh => {
                    stats.mesh_objects += 1;
                    if let Some(mesh) = self.object_mesh(object) {
                        stats.vertices += mesh.vertex_count();
                        stats.polygons += mesh.polygon_count();
                        stats.triangles += mesh.triangle_count();
                    }
                }
                ObjectKind::Camera => stats.cameras += 1,
                ObjectKind::Light => stats.lights += 1,
                ObjectKind::Armature => {
                    stats.armatures += 1;
                    if let Some(armature) = self.object_armature(object) {
                        stats.bones += armature.bone_count();
                    }
                }
                ObjectKind::Empty => stats.empties += 1,
            }
        }

        stats
    }
}

fn check_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(Error::duplicate_name(kind, name));
        }
    }
    Ok(())
}

/// Scene counts, evaluated per object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SceneStatistics {
    pub objects: usize,
    pub mesh_objects: usize,
    pub cameras: usize,
    pub lights: usize,
    pub armatures: usize,
    pub empties: usize,
    pub materials: usize,
    pub bones: usize,
    pub vertices: usize,
    pub polygons: usize,
    pub triangles: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{MeshVertex, Polygon};
    use euroland_core::Vec3;

    fn make_scene() -> Scene {
        let mut scene = Scene::new("test");

        let mut mesh = Mesh::new("Tri");
        mesh.vertices = vec![
            MeshVertex::new(Vec3::new(0.0, 0.0, 0.0)),
            MeshVertex::new(Vec3::new(1.0, 0.0, 0.0)),
            MeshVertex::new(Vec3::new(0.0, 1.0, 0.0)),
        ];
        mesh.polygons = vec![Polygon::new(&[0, 1, 2])];
        scene.meshes.push(mesh);

        scene.objects.push(Object::new("Child", ObjectData::Mesh("Tri".into())).with_parent("Root"));
        scene.objects.push(Object::new("Root", ObjectData::Empty));
        scene.objects.push(Object::new("Other", ObjectData::Empty));
        scene.objects.push(Object::new("Grandchild", ObjectData::Empty).with_parent("Child"));
        scene
    }

    #[test]
    fn test_hierarchy_order_parents_first() {
        let scene = make_scene();
        let names: Vec<&str> = scene
            .hierarchy_order()
            .into_iter()
            .map(|i| scene.objects[i].name.as_str())
            .collect();

        assert_eq!(names, vec!["Root", "Child", "Grandchild", "Other"]);
    }

    #[test]
    fn test_validate_ok() {
        assert!(make_scene().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_mesh() {
        let mut scene = make_scene();
        scene.objects.push(Object::new("Ghost", ObjectData::Mesh("Nope".into())));

        let err = scene.validate().unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Ghost"));
    }

    #[test]
    fn test_validate_parent_cycle() {
        let mut scene = make_scene();
        scene.objects[1].parent = Some("Grandchild".into());

        let err = scene.validate().unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_validate_duplicate_object() {
        let mut scene = make_scene();
        scene.objects.push(Object::new("Root", ObjectData::Empty));
        assert!(matches!(scene.validate().unwrap_err(), Error::DuplicateName { .. }));
    }

    #[test]
    fn test_statistics() {
        let stats = make_scene().statistics();
        assert_eq!(stats.objects, 4);
        assert_eq!(stats.mesh_objects, 1);
        assert_eq!(stats.empties, 3);
        assert_eq!(stats.triangles, 1);
    }
}
