//! RTG exporter implementation

use std::time::Instant;

use euroland_scene::{Armature, Camera, Light, Material, ObjectKind, Scene};

use super::{DEFAULT_PRECISION, RTG_VERSION};
use crate::basis::NodeTransform;
use crate::context::{bone_weights, ExportContext};
use crate::indexing::IndexedMesh;
use crate::logging::instrument_export;
use crate::options::ExportOptions;
use crate::traits::{ExportResult, ExportSummary, Exporter, RenderedExport};
use crate::walk::{AnimationKey, BoneNode, ExportNode, SceneWalker};
use crate::writer::TagWriter;

/// RTG exporter
#[derive(Debug, Clone, Copy, Default)]
pub struct RtgExporter;

impl RtgExporter {
    pub fn new() -> Self {
        Self
    }

    fn render_document(&self, scene: &Scene, options: &ExportOptions) -> ExportResult<RenderedExport> {
        let walker = SceneWalker::new(scene, options).with_local_baking(options.apply_transform);
        let ctx = ExportContext::prepare_with(scene, options, self.precision(options), walker)?;
        let mut w = TagWriter::new(ctx.precision);
        let mut summary = ExportSummary::new(self.id());

        w.record("RTG_EXPORT").uint(RTG_VERSION as u64).end();
        write_header(&mut w, &ctx);
        write_materials(&mut w, ctx.materials.materials());
        write_hierarchy(&mut w, &ctx.nodes);

        for node in &ctx.nodes {
            w.record("OBJECT").uint(node.index as u64).open();
            w.record("NAME").string(node.name()).end();
            w.record("TYPE").string(node.kind.as_str()).end();
            w.record("PARENT").index(node.parent.map(|p| p as u32)).end();
            if node.baked {
                write_transform(&mut w, &NodeTransform::identity());
            } else {
                write_transform(&mut w, &node.local);
            }

            match node.kind {
                ObjectKind::Mesh => {
                    let mesh = ctx.mesh(node)?;
                    let skin = ctx.skin(node);
                    let bake = node.baked.then_some(node.local_source);
                    let indexed = ctx.index_mesh(mesh, bake, skin.is_some())?;

                    write_geometry(&mut w, &indexed, skin.map(|(_, armature)| armature));

                    summary.meshes += 1;
                    summary.positions += indexed.position_count();
                    summary.faces += indexed.face_count();
                    summary.triangles += indexed.triangle_count();
                }
                ObjectKind::Camera => write_camera(&mut w, ctx.camera(node)?, options.global_scale),
                ObjectKind::Light => write_light(&mut w, ctx.light(node)?, options.global_scale),
                ObjectKind::Empty | ObjectKind::Armature => {}
            }

            let keys = ctx.walker.animation(&ctx.nodes, node);
            if !keys.is_empty() {
                write_animation(&mut w, &keys);
                summary.animation_keys += keys.len();
            }

            w.close();
        }

        for node in ctx.nodes.iter().filter(|n| n.kind == ObjectKind::Armature) {
            if let Some(armature) = ctx.walker.armature(node) {
                let bones = ctx.walker.bones(node);
                write_skeleton(&mut w, node.name(), armature, &bones);
                summary.bones += bones.len();
            }
        }

        summary.nodes = ctx.nodes.len();
        summary.materials = ctx.materials.len();
        summary.cameras = ctx.count(ObjectKind::Camera);
        summary.lights = ctx.count(ObjectKind::Light);
        summary.bytes = w.len();

        Ok(RenderedExport {
            text: w.finish(),
            summary,
        })
    }
}

impl Exporter for RtgExporter {
    fn id(&self) -> &str {
        "rtg"
    }

    fn name(&self) -> &str {
        "EuroLand Runtime Geometry"
    }

    fn extensions(&self) -> &[&str] {
        &["rtg"]
    }

    fn default_precision(&self) -> usize {
        DEFAULT_PRECISION
    }

    fn render(&self, scene: &Scene, options: &ExportOptions) -> ExportResult<RenderedExport> {
        instrument_export(self.id(), || {
            let start = Instant::now();
            crate::log_export_start!(self.id(), scene);

            let result = self.render_document(scene, options);
            match &result {
                Ok(rendered) => {
                    crate::log_export_complete!(self.id(), start.elapsed(), rendered.summary);
                }
                Err(e) => {
                    crate::log_export_error!(self.id(), e);
                }
            }
            result
        })
    }
}

fn write_header(w: &mut TagWriter, ctx: &ExportContext<'_>) {
    let scene = ctx.scene;
    w.open("HEADER");
    w.record("SOURCE").string(&scene.source_file).end();
    w.record("FIRSTFRAME").int(scene.frame_start as i64).end();
    w.record("LASTFRAME").int(scene.frame_end as i64).end();
    w.record("FPS").uint(scene.fps as u64).end();
    w.record("UNITSCALE").float(ctx.options.global_scale).end();
    w.record("COORD_SYSTEM")
        .string(ctx.options.coordinate_system.handedness_tag())
        .end();
    w.close();
}

fn write_materials(w: &mut TagWriter, materials: &[Material]) {
    w.open("MATERIAL_LIST");
    w.record("COUNT").uint(materials.len() as u64).end();
    for (i, material) in materials.iter().enumerate() {
        let [r, g, b] = material.diffuse();
        w.record("MATERIAL").uint(i as u64).string(&material.name).open();
        w.record("DIFFUSE").floats(&[r, g, b, material.opacity()]).end();
        w.record("SPECULAR").floats(&material.specular_color()).end();
        w.record("SHININESS").float(material.shininess()).end();
        if let Some(texture) = material.texture_name() {
            w.record("TEXTURE").string(texture).end();
        }
        w.close();
    }
    w.close();
}

fn write_hierarchy(w: &mut TagWriter, nodes: &[ExportNode<'_>]) {
    w.open("HIERARCHY");
    w.record("NODE_COUNT").uint(nodes.len() as u64).end();
    for node in nodes {
        w.record("NODE")
            .uint(node.index as u64)
            .string(node.name())
            .index(node.parent.map(|p| p as u32))
            .string(node.kind.as_str())
            .end();
    }
    w.close();
}

fn write_transform(w: &mut TagWriter, t: &NodeTransform) {
    w.open("LOCAL_TM");
    for (i, row) in t.rows.iter().enumerate() {
        w.record(&format!("ROW{}", i)).floats(row).end();
    }
    w.close();
    w.record("POS").vec3(t.translation).end();
    w.record("ROT").vec3(t.euler).end();
    w.record("SCL").vec3(t.scale).end();
}

fn write_geometry(w: &mut TagWriter, mesh: &IndexedMesh, armature: Option<&Armature>) {
    let triangles = mesh.triangles();

    w.open("GEOMETRY");
    w.record("VERTEX_COUNT").uint(mesh.positions.len() as u64).end();
    w.open("VERTEX_LIST");
    for p in &mesh.positions {
        w.record("V").vec3(*p).end();
    }
    w.close();

    w.record("UV_COUNT").uint(mesh.uvs.len() as u64).end();
    if !mesh.uvs.is_empty() {
        w.open("UV_LIST");
        for uv in &mesh.uvs {
            w.record("T").vec2(*uv).end();
        }
        w.close();
    }

    w.record("COLOR_COUNT").uint(mesh.colors.len() as u64).end();
    if !mesh.colors.is_empty() {
        w.open("COLOR_LIST");
        for c in &mesh.colors {
            w.record("C").floats(c).end();
        }
        w.close();
    }

    w.record("TRIANGLE_COUNT").uint(triangles.len() as u64).end();
    w.open("TRIANGLE_LIST");
    for tri in &triangles {
        let mut rec = w.record("TRI");
        for p in tri.positions {
            rec = rec.uint(p as u64);
        }
        for c in 0..3 {
            rec = rec.index(tri.uvs.map(|uvs| uvs[c]));
        }
        for c in 0..3 {
            rec = rec.index(tri.colors.map(|colors| colors[c]));
        }
        rec.uint(tri.material as u64).end();
    }
    w.close();

    if let Some(armature) = armature {
        let weights = bone_weights(mesh, armature);
        w.open("WEIGHT_LIST");
        w.record("WEIGHT_COUNT").uint(weights.len() as u64).end();
        for (position, bone, weight) in weights {
            w.record("W")
                .uint(position as u64)
                .uint(bone as u64)
                .float(weight)
                .end();
        }
        w.close();
    }

    w.close();
}

fn write_camera(w: &mut TagWriter, camera: &Camera, scale: f32) {
    w.open("CAMERA");
    w.record("FOV").float(camera.fov).end();
    w.record("NEAR").float(camera.clip_start * scale).end();
    w.record("FAR").float(camera.clip_end * scale).end();
    w.record("ORTHO").flag(camera.is_orthographic()).end();
    w.close();
}

fn write_light(w: &mut TagWriter, light: &Light, scale: f32) {
    w.open("LIGHT");
    w.record("KIND").string(light.kind.as_str()).end();
    w.record("COLOR").floats(&light.color).end();
    w.record("ENERGY").float(light.energy).end();
    w.record("DISTANCE").float(light.distance * scale).end();
    w.record("HOTSPOT").float(light.hotspot()).end();
    w.record("FALLOFF").float(light.falloff()).end();
    w.close();
}

fn write_animation(w: &mut TagWriter, keys: &[AnimationKey]) {
    w.open("ANIMATION");
    w.record("KEY_COUNT").uint(keys.len() as u64).end();
    for key in keys {
        let t = &key.transform;
        w.record("KEY")
            .int(key.frame as i64)
            .vec3(t.translation)
            .vec3(t.euler)
            .vec3(t.scale)
            .end();
    }
    w.close();
}

fn write_skeleton(w: &mut TagWriter, armature_object: &str, armature: &Armature, bones: &[BoneNode<'_>]) {
    w.record("SKELETON").string(armature_object).open();
    w.record("BONE_COUNT").uint(armature.bones.len() as u64).end();
    for bone in bones {
        w.record("BONE")
            .uint(bone.index as u64)
            .string(bone.name)
            .index(bone.parent.map(|p| p as u32))
            .open();
        write_transform(w, &bone.local);
        w.close();
    }
    w.close();
}
