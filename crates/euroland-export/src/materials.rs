//! Global material list
//!
//! Formats write one material table and faces reference it by index. The
//! table is built in first-use order over the exported meshes. Empty or
//! unresolvable slots share a synthesized default material.

use std::collections::HashMap;

use euroland_scene::{Material, Mesh, Scene};

/// Name of the synthesized fallback material
pub const DEFAULT_MATERIAL_NAME: &str = "DEFAULT";

#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    materials: Vec<Material>,
    lookup: HashMap<String, u32>,
    default_index: Option<u32>,
    mesh_slots: HashMap<String, Vec<u32>>,
}

impl MaterialTable {
    /// Collect materials from meshes in export order
    pub fn build<'a>(scene: &Scene, meshes: impl IntoIterator<Item = &'a Mesh>) -> Self {
        let mut table = Self::default();
        for mesh in meshes {
            if table.mesh_slots.contains_key(&mesh.name) {
                continue;
            }
            let slots = table.resolve_slots(scene, mesh);
            table.mesh_slots.insert(mesh.name.clone(), slots);
        }
        table
    }

    fn resolve_slots(&mut self, scene: &Scene, mesh: &Mesh) -> Vec<u32> {
        if mesh.materials.is_empty() {
            return vec![self.default_material()];
        }

        mesh.materials
            .iter()
            .map(|slot| match slot.as_deref().and_then(|name| scene.material(name)) {
                Some(material) => self.insert(material),
                None => self.default_material(),
            })
            .collect()
    }

    fn insert(&mut self, material: &Material) -> u32 {
        if let Some(&index) = self.lookup.get(&material.name) {
            return index;
        }
        let index = self.materials.len() as u32;
        self.materials.push(material.clone());
        self.lookup.insert(material.name.clone(), index);
        index
    }

    fn default_material(&mut self) -> u32 {
        if let Some(index) = self.default_index {
            return index;
        }
        let index = self.materials.len() as u32;
        self.materials.push(Material::new(DEFAULT_MATERIAL_NAME));
        self.default_index = Some(index);
        index
    }

    /// Global index per material slot of a mesh; never empty for a built mesh
    pub fn slots(&self, mesh_name: &str) -> &[u32] {
        self.mesh_slots
            .get(mesh_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn get(&self, index: u32) -> Option<&Material> {
        self.materials.get(index as usize)
    }

    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.lookup.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn has_default(&self) -> bool {
        self.default_index.is_some()
    }
}
