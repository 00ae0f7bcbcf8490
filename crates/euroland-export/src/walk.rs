//! Scene traversal
//!
//! Produces the exported objects in hierarchy order with their transforms
//! already in the target basis. Filtered-out objects are skipped and their
//! children attach to the nearest exported ancestor.
//!
//! With local baking enabled, a mesh node's parent-relative transform goes
//! into its vertices. The node then sits in its parent's frame, and its
//! children are made relative to that frame.

use std::collections::HashMap;

use euroland_core::Mat4;
use euroland_scene::{Armature, Object, ObjectData, ObjectKind, Scene};
use tracing::{debug, trace};

use crate::basis::{BasisConversion, NodeTransform};
use crate::options::ExportOptions;

/// An exported object
#[derive(Debug, Clone)]
pub struct ExportNode<'s> {
    pub object: &'s Object,
    pub kind: ObjectKind,
    /// Position in export order
    pub index: usize,
    /// Export index of the nearest exported ancestor
    pub parent: Option<usize>,
    /// Source-space world matrix
    pub world_source: Mat4,
    /// Source-space matrix relative to the exported parent
    pub local_source: Mat4,
    /// Target-space world transform
    pub world: NodeTransform,
    /// Target-space transform relative to the exported parent
    pub local: NodeTransform,
    /// Parent-relative transform is baked into the vertices
    pub baked: bool,
    /// Source-space frame children are expressed in
    pub frame_source: Mat4,
    /// Target-space frame children are expressed in
    pub frame: Mat4,
}

impl<'s> ExportNode<'s> {
    pub fn name(&self) -> &'s str {
        &self.object.name
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// A bone in target space
#[derive(Debug, Clone)]
pub struct BoneNode<'s> {
    pub name: &'s str,
    /// Bone index in the armature
    pub index: usize,
    /// Parent bone index
    pub parent: Option<usize>,
    pub world: NodeTransform,
    /// Relative to the parent bone, or to the armature object for roots
    pub local: NodeTransform,
}

/// Converted transform at one frame
#[derive(Debug, Clone, Copy)]
pub struct AnimationKey {
    pub frame: i32,
    pub transform: NodeTransform,
}

pub struct SceneWalker<'s> {
    scene: &'s Scene,
    options: &'s ExportOptions,
    conversion: BasisConversion,
    bake_local_meshes: bool,
}

impl<'s> SceneWalker<'s> {
    pub fn new(scene: &'s Scene, options: &'s ExportOptions) -> Self {
        Self {
            scene,
            options,
            conversion: options.conversion(),
            bake_local_meshes: false,
        }
    }

    /// Treat mesh nodes as having their parent-relative transform baked
    pub fn with_local_baking(mut self, enabled: bool) -> Self {
        self.bake_local_meshes = enabled;
        self
    }

    pub fn scene(&self) -> &'s Scene {
        self.scene
    }

    pub fn conversion(&self) -> &BasisConversion {
        &self.conversion
    }

    /// Whether an object passes the visibility, selection and kind filters
    pub fn include(&self, object: &Object) -> bool {
        if self.options.visible_only && !object.visible {
            return false;
        }
        if self.options.selected_only && !object.selected {
            return false;
        }
        match object.kind() {
            ObjectKind::Mesh => true,
            ObjectKind::Camera => self.options.export_cameras,
            ObjectKind::Light => self.options.export_lights,
            ObjectKind::Empty => self.options.export_empties,
            ObjectKind::Armature => self.options.export_armatures,
        }
    }

    /// Exported objects, parents ahead of their children
    pub fn collect(&self) -> Vec<ExportNode<'s>> {
        let mut nodes: Vec<ExportNode<'s>> = Vec::new();
        let mut exported: HashMap<&'s str, usize> = HashMap::new();

        for idx in self.scene.hierarchy_order() {
            let object = &self.scene.objects[idx];
            if !self.include(object) {
                trace!(object = %object.name, "Skipping filtered object");
                continue;
            }

            let parent = self.exported_ancestor(object, &exported);
            let world_source = object.matrix_world;
            let world = self.convert_world(object, &world_source);

            let (parent_source, parent_frame) = match parent {
                Some(p) => (nodes[p].frame_source, nodes[p].frame),
                None => (Mat4::IDENTITY, Mat4::IDENTITY),
            };
            let local_source = relative(&parent_source, &world_source);
            let local = relative(&parent_frame, &world);

            let baked = self.bake_local_meshes && object.kind() == ObjectKind::Mesh;
            let (frame_source, frame) = if baked {
                (parent_source, parent_frame)
            } else {
                (world_source, world)
            };

            let index = nodes.len();
            exported.insert(object.name.as_str(), index);
            nodes.push(ExportNode {
                object,
                kind: object.kind(),
                index,
                parent,
                world_source,
                local_source,
                world: NodeTransform::decompose(&world),
                local: NodeTransform::decompose(&local),
                baked,
                frame_source,
                frame,
            });
        }

        debug!(
            total = self.scene.objects.len(),
            exported = nodes.len(),
            "Collected export nodes"
        );
        nodes
    }

    fn exported_ancestor(&self, object: &Object, exported: &HashMap<&'s str, usize>) -> Option<usize> {
        let mut current = self.scene.parent_of(object);
        let mut steps = 0;
        while let Some(parent) = current {
            if let Some(&index) = exported.get(parent.name.as_str()) {
                return Some(index);
            }
            steps += 1;
            if steps > self.scene.objects.len() {
                return None;
            }
            current = self.scene.parent_of(parent);
        }
        None
    }

    /// Target-space matrix for an object's source matrix
    pub fn convert_world(&self, object: &Object, matrix: &Mat4) -> Mat4 {
        if self.is_oriented(object) {
            self.conversion.convert_oriented(matrix)
        } else {
            self.conversion.convert_matrix(matrix)
        }
    }

    /// Cameras and directional lights look down their local -Z
    fn is_oriented(&self, object: &Object) -> bool {
        match &object.data {
            ObjectData::Camera(_) => true,
            ObjectData::Light(name) => self
                .scene
                .light(name)
                .map(|l| l.kind.is_directional())
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Parent-relative transforms for every baked sample of a node
    ///
    /// Nodes with baked vertices carry no keys.
    pub fn animation(&self, nodes: &[ExportNode<'s>], node: &ExportNode<'s>) -> Vec<AnimationKey> {
        if !self.options.export_animation || node.baked {
            return Vec::new();
        }

        node.object
            .animation
            .iter()
            .map(|sample| {
                let world = self.convert_world(node.object, &sample.matrix_world);
                let local = match node.parent.and_then(|p| nodes.get(p)) {
                    Some(parent) => relative(&self.frame_at(nodes, parent, sample.frame), &world),
                    None => world,
                };
                AnimationKey {
                    frame: sample.frame,
                    transform: NodeTransform::decompose(&local),
                }
            })
            .collect()
    }

    /// Target-space frame a node offers its children at `frame`
    fn frame_at(&self, nodes: &[ExportNode<'s>], node: &ExportNode<'s>, frame: i32) -> Mat4 {
        if node.baked {
            return match node.parent.and_then(|p| nodes.get(p)) {
                Some(parent) => self.frame_at(nodes, parent, frame),
                None => Mat4::IDENTITY,
            };
        }
        self.convert_world(node.object, &node.object.matrix_at(frame))
    }

    /// Armature datablock of an armature node
    pub fn armature(&self, node: &ExportNode<'s>) -> Option<&'s Armature> {
        self.scene.object_armature(node.object)
    }

    /// Rest-pose bones of an armature node, parents first
    pub fn bones(&self, node: &ExportNode<'s>) -> Vec<BoneNode<'s>> {
        let Some(armature) = self.armature(node) else {
            return Vec::new();
        };

        let armature_world = self.conversion.convert_matrix(&node.world_source);
        let bone_worlds: Vec<Mat4> = armature
            .bones
            .iter()
            .map(|bone| {
                self.conversion
                    .convert_matrix(&node.world_source.mul(&bone.matrix_local))
            })
            .collect();

        armature
            .ordered_bones()
            .into_iter()
            .map(|index| {
                let parent = armature.parent_index(index);
                let parent_world = parent.map_or(armature_world, |p| bone_worlds[p]);
                BoneNode {
                    name: &armature.bones[index].name,
                    index,
                    parent,
                    world: NodeTransform::decompose(&bone_worlds[index]),
                    local: NodeTransform::decompose(&relative(&parent_world, &bone_worlds[index])),
                }
            })
            .collect()
    }
}

/// `parent⁻¹ · child`, or the child itself when the parent is singular
pub fn relative(parent: &Mat4, child: &Mat4) -> Mat4 {
    match parent.inverse_affine() {
        Some(inverse) => inverse.mul(child),
        None => *child,
    }
}
