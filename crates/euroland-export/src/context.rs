//! Per-export state shared by the format writers

use euroland_core::Mat4;
use euroland_scene::{Armature, Camera, Light, Mesh, Object, ObjectKind, Scene};
use tracing::debug;

use crate::indexing::{IndexedMesh, MeshContext};
use crate::materials::MaterialTable;
use crate::options::ExportOptions;
use crate::traits::{ExportError, ExportResult};
use crate::walk::{ExportNode, SceneWalker};

pub struct ExportContext<'s> {
    pub scene: &'s Scene,
    pub options: &'s ExportOptions,
    pub walker: SceneWalker<'s>,
    pub nodes: Vec<ExportNode<'s>>,
    pub materials: MaterialTable,
    pub precision: usize,
}

impl<'s> ExportContext<'s> {
    /// Validate inputs, walk the scene and collect materials
    pub fn prepare(scene: &'s Scene, options: &'s ExportOptions, precision: usize) -> ExportResult<Self> {
        Self::prepare_with(scene, options, precision, SceneWalker::new(scene, options))
    }

    /// Like [`prepare`](Self::prepare) with a configured walker
    pub fn prepare_with(
        scene: &'s Scene,
        options: &'s ExportOptions,
        precision: usize,
        walker: SceneWalker<'s>,
    ) -> ExportResult<Self> {
        options.validate()?;
        scene.validate()?;

        let nodes = walker.collect();
        let materials = MaterialTable::build(
            scene,
            nodes.iter().filter_map(|n| scene.object_mesh(n.object)),
        );

        debug!(
            nodes = nodes.len(),
            materials = materials.len(),
            precision,
            "Prepared export"
        );

        Ok(Self {
            scene,
            options,
            walker,
            nodes,
            materials,
            precision,
        })
    }

    pub fn mesh_nodes(&self) -> impl Iterator<Item = &ExportNode<'s>> + '_ {
        self.nodes.iter().filter(|n| n.kind == ObjectKind::Mesh)
    }

    pub fn count(&self, kind: ObjectKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    pub fn mesh(&self, node: &ExportNode<'s>) -> ExportResult<&'s Mesh> {
        self.scene
            .object_mesh(node.object)
            .ok_or_else(|| ExportError::missing("mesh", node.object.data.data_name().unwrap_or_default()))
    }

    pub fn camera(&self, node: &ExportNode<'s>) -> ExportResult<&'s Camera> {
        let name = node.object.data.data_name().unwrap_or_default();
        self.scene
            .camera(name)
            .ok_or_else(|| ExportError::missing("camera", name))
    }

    pub fn light(&self, node: &ExportNode<'s>) -> ExportResult<&'s Light> {
        let name = node.object.data.data_name().unwrap_or_default();
        self.scene
            .light(name)
            .ok_or_else(|| ExportError::missing("light", name))
    }

    /// Armature deforming a mesh node, when skin weights are exported
    pub fn skin(&self, node: &ExportNode<'s>) -> Option<(&'s Object, &'s Armature)> {
        if !self.options.export_skin_weights {
            return None;
        }
        let object = self.scene.object(node.object.armature.as_deref()?)?;
        let armature = self.scene.object_armature(object)?;
        Some((object, armature))
    }

    /// Index a mesh, baking `bake` into its vertices
    pub fn index_mesh(&self, mesh: &Mesh, bake: Option<Mat4>, include_weights: bool) -> ExportResult<IndexedMesh> {
        let slots = self.materials.slots(&mesh.name);
        let conversion = self.walker.conversion();
        let ctx = MeshContext {
            conversion,
            bake,
            options: self.options,
            slot_materials: slots,
            precision: self.precision,
            include_weights,
        };

        let indexed = IndexedMesh::build(mesh, &ctx);
        indexed
            .validate_indices()
            .map_err(|e| e.with_context(format!("mesh '{}'", mesh.name)))?;

        debug!(
            mesh = %mesh.name,
            positions = indexed.positions.len(),
            uvs = indexed.uvs.len(),
            colors = indexed.colors.len(),
            faces = indexed.faces.len(),
            "Indexed mesh"
        );
        Ok(indexed)
    }
}

/// `(position, bone index, weight)` for weights whose group names a bone
pub fn bone_weights(indexed: &IndexedMesh, armature: &Armature) -> Vec<(u32, usize, f32)> {
    indexed
        .weights
        .iter()
        .filter_map(|w| {
            armature
                .bone_index(&w.group)
                .map(|bone| (w.position, bone, w.weight))
        })
        .collect()
}
