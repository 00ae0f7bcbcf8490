//! ESE exporter implementation

use std::time::Instant;

use euroland_scene::{Armature, Camera, Light, LightKind, Material, ObjectKind, Scene};

use super::{DEFAULT_PRECISION, ESE_VERSION, TICKS_PER_FRAME};
use crate::basis::NodeTransform;
use crate::context::{bone_weights, ExportContext};
use crate::indexing::IndexedMesh;
use crate::logging::instrument_export;
use crate::options::ExportOptions;
use crate::traits::{ExportResult, ExportSummary, Exporter, RenderedExport};
use crate::walk::{BoneNode, ExportNode};
use crate::writer::TagWriter;

/// ESE exporter
#[derive(Debug, Clone, Copy, Default)]
pub struct EseExporter;

impl EseExporter {
    pub fn new() -> Self {
        Self
    }

    fn render_document(&self, scene: &Scene, options: &ExportOptions) -> ExportResult<RenderedExport> {
        let ctx = ExportContext::prepare(scene, options, self.precision(options))?;
        let mut w = TagWriter::new(ctx.precision);
        let mut summary = ExportSummary::new(self.id());
        let time = scene.frame_current as i64 * TICKS_PER_FRAME;

        w.line(&format!("*3DSMAX_EUROEXPORT\t{}", ESE_VERSION));
        if options.write_timestamp {
            let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            w.record("COMMENT")
                .string(&format!("EuroLand Exporter - {}", stamp))
                .end();
        }
        write_scene_info(&mut w, scene);
        write_materials(&mut w, ctx.materials.materials());

        for node in &ctx.nodes {
            match node.kind {
                ObjectKind::Mesh => {
                    let mesh = ctx.mesh(node)?;
                    let skin = ctx.skin(node);
                    let indexed = ctx.index_mesh(mesh, Some(node.world_source), skin.is_some())?;

                    w.open("GEOMOBJECT");
                    write_node_header(&mut w, &ctx, node);
                    write_node_tm(&mut w, node.name(), &node.world);
                    write_mesh(&mut w, &indexed, time, options.export_normals);
                    if let Some((object, armature)) = skin {
                        write_skin(&mut w, &object.name, armature, &indexed);
                    }
                    w.record("PROP_MOTIONBLUR").uint(0).end();
                    w.record("PROP_CASTSHADOW").uint(1).end();
                    w.record("PROP_RECVSHADOW").uint(1).end();
                    w.close();

                    summary.meshes += 1;
                    summary.positions += indexed.position_count();
                    summary.faces += indexed.face_count();
                    summary.triangles += indexed.triangle_count();
                }
                ObjectKind::Camera => {
                    let camera = ctx.camera(node)?;
                    write_camera(&mut w, &ctx, node, camera, time);
                }
                ObjectKind::Light => {
                    let light = ctx.light(node)?;
                    write_light(&mut w, &ctx, node, light, time);
                }
                ObjectKind::Empty => write_helper(&mut w, &ctx, node),
                ObjectKind::Armature => {
                    write_helper(&mut w, &ctx, node);
                    let bones = ctx.walker.bones(node);
                    for bone in &bones {
                        write_bone(&mut w, node, &bones, bone);
                    }
                    summary.bones += bones.len();
                }
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

impl Exporter for EseExporter {
    fn id(&self) -> &str {
        "ese"
    }

    fn name(&self) -> &str {
        "EuroLand Scene Export"
    }

    fn extensions(&self) -> &[&str] {
        &["ese"]
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

fn write_scene_info(w: &mut TagWriter, scene: &Scene) {
    w.open("SCENE");
    w.record("SCENE_FILENAME").string(&scene.source_file).end();
    w.record("SCENE_FIRSTFRAME").int(scene.frame_start as i64).end();
    w.record("SCENE_LASTFRAME").int(scene.frame_end as i64).end();
    w.record("SCENE_FRAMESPEED").uint(scene.fps as u64).end();
    w.record("SCENE_TICKSPERFRAME").int(TICKS_PER_FRAME).end();
    w.record("SCENE_BACKGROUND_STATIC").floats(&scene.background).end();
    w.record("SCENE_AMBIENT_STATIC").floats(&scene.ambient).end();
    w.close();
}

fn write_materials(w: &mut TagWriter, materials: &[Material]) {
    w.open("MATERIAL_LIST");
    w.record("MATERIAL_COUNT").uint(materials.len() as u64).end();
    for (i, material) in materials.iter().enumerate() {
        let self_illum = material
            .emissive_color()
            .into_iter()
            .fold(0.0f32, f32::max)
            .clamp(0.0, 1.0);

        w.record("MATERIAL").uint(i as u64).open();
        w.record("MATERIAL_NAME").string(&material.name).end();
        w.record("MATERIAL_CLASS").string("Standard").end();
        w.record("MATERIAL_AMBIENT").floats(&material.diffuse()).end();
        w.record("MATERIAL_DIFFUSE").floats(&material.diffuse()).end();
        w.record("MATERIAL_SPECULAR").floats(&material.specular_color()).end();
        w.record("MATERIAL_SHINE").float(material.shininess()).end();
        w.record("MATERIAL_SHINESTRENGTH").float(material.specular_intensity).end();
        w.record("MATERIAL_TRANSPARENCY").float(material.transparency()).end();
        w.record("MATERIAL_SELFILLUM").float(self_illum).end();
        if material.two_sided {
            w.tag("MATERIAL_TWOSIDED");
        }
        if let (Some(name), Some(path)) = (material.texture_name(), material.base_color_texture.as_deref()) {
            w.open("MAP_DIFFUSE");
            w.record("MAP_NAME").string(name).end();
            w.record("MAP_CLASS").string("Bitmap").end();
            w.record("BITMAP").string(path).end();
            w.close();
        }
        w.close();
    }
    w.close();
}

fn write_node_header(w: &mut TagWriter, ctx: &ExportContext<'_>, node: &ExportNode<'_>) {
    w.record("NODE_NAME").string(node.name()).end();
    if let Some(parent) = node.parent.and_then(|p| ctx.nodes.get(p)) {
        w.record("NODE_PARENT").string(parent.name()).end();
    }
}

fn write_node_tm(w: &mut TagWriter, name: &str, t: &NodeTransform) {
    w.open("NODE_TM");
    w.record("NODE_NAME").string(name).end();
    for (i, row) in t.rows.iter().enumerate() {
        w.record(&format!("TM_ROW{}", i)).floats(row).end();
    }
    w.record("TM_POS").vec3(t.translation).end();
    w.record("TM_ROTATION").vec3(t.euler).end();
    w.record("TM_SCALE").vec3(t.scale).end();
    w.close();
}

fn write_mesh(w: &mut TagWriter, mesh: &IndexedMesh, time: i64, normals: bool) {
    let triangles = mesh.triangles();

    w.open("MESH");
    w.record("TIMEVALUE").int(time).end();
    w.record("MESH_NUMVERTEX").uint(mesh.positions.len() as u64).end();
    w.record("MESH_NUMFACES").uint(triangles.len() as u64).end();

    w.open("MESH_VERTEX_LIST");
    for (i, p) in mesh.positions.iter().enumerate() {
        w.record("MESH_VERTEX").uint(i as u64).vec3(*p).end();
    }
    w.close();

    w.open("MESH_FACE_LIST");
    for (i, tri) in triangles.iter().enumerate() {
        let [a, b, c] = tri.positions;
        let [ab, bc, ca] = tri.edges;
        w.record("MESH_FACE")
            .value(format!("{}:", i))
            .word("A:")
            .uint(a as u64)
            .word("B:")
            .uint(b as u64)
            .word("C:")
            .uint(c as u64)
            .word("AB:")
            .flag(ab)
            .word("BC:")
            .flag(bc)
            .word("CA:")
            .flag(ca)
            .word("*MESH_SMOOTHING")
            .flag(tri.smooth)
            .word("*MESH_MTLID")
            .uint(tri.material as u64)
            .end();
    }
    w.close();

    w.record("MESH_NUMTVERTEX").uint(mesh.uvs.len() as u64).end();
    if !mesh.uvs.is_empty() {
        w.open("MESH_TVERTLIST");
        for (i, uv) in mesh.uvs.iter().enumerate() {
            w.record("MESH_TVERT").uint(i as u64).vec2(*uv).float(0.0).end();
        }
        w.close();
    }
    if mesh.has_uvs {
        w.record("MESH_NUMTVFACES").uint(triangles.len() as u64).end();
        w.open("MESH_TFACELIST");
        for (i, tri) in triangles.iter().enumerate() {
            let [a, b, c] = tri.uvs.unwrap_or_default();
            w.record("MESH_TFACE")
                .uint(i as u64)
                .uint(a as u64)
                .uint(b as u64)
                .uint(c as u64)
                .end();
        }
        w.close();
    }

    w.record("MESH_NUMCVERTEX").uint(mesh.colors.len() as u64).end();
    if !mesh.colors.is_empty() {
        w.open("MESH_CVERTLIST");
        for (i, c) in mesh.colors.iter().enumerate() {
            w.record("MESH_VERTCOL").uint(i as u64).floats(&c[..3]).end();
        }
        w.close();
    }
    if mesh.has_colors {
        w.record("MESH_NUMCVFACES").uint(triangles.len() as u64).end();
        w.open("MESH_CFACELIST");
        for (i, tri) in triangles.iter().enumerate() {
            let [a, b, c] = tri.colors.unwrap_or_default();
            w.record("MESH_CFACE")
                .uint(i as u64)
                .uint(a as u64)
                .uint(b as u64)
                .uint(c as u64)
                .end();
        }
        w.close();
    }

    if normals {
        w.open("MESH_NORMALS");
        for (i, tri) in triangles.iter().enumerate() {
            w.record("MESH_FACENORMAL").uint(i as u64).vec3(tri.normal).end();
            for (corner, normal) in tri.positions.iter().zip(&tri.normals) {
                w.record("MESH_VERTEXNORMAL").uint(*corner as u64).vec3(*normal).end();
            }
        }
        w.close();
    }

    w.close();
}

fn write_skin(w: &mut TagWriter, armature_object: &str, armature: &Armature, mesh: &IndexedMesh) {
    let weights = bone_weights(mesh, armature);

    w.open("SKIN_DATA");
    w.record("SKIN_ARMATURE").string(armature_object).end();
    w.record("SKIN_BONECOUNT").uint(armature.bones.len() as u64).end();
    for (i, bone) in armature.bones.iter().enumerate() {
        w.record("SKIN_BONE").uint(i as u64).string(&bone.name).end();
    }
    w.record("SKIN_WEIGHTCOUNT").uint(weights.len() as u64).end();
    for (position, bone, weight) in weights {
        w.record("SKIN_WEIGHT")
            .uint(position as u64)
            .uint(bone as u64)
            .float(weight)
            .end();
    }
    w.close();
}

fn write_camera(w: &mut TagWriter, ctx: &ExportContext<'_>, node: &ExportNode<'_>, camera: &Camera, time: i64) {
    let scale = ctx.options.global_scale;

    w.open("CAMERAOBJECT");
    write_node_header(w, ctx, node);
    w.record("CAMERA_TYPE").word("Free").end();
    write_node_tm(w, node.name(), &node.world);
    w.open("CAMERA_SETTINGS");
    w.record("TIMEVALUE").int(time).end();
    w.record("CAMERA_NEAR").float(camera.clip_start * scale).end();
    w.record("CAMERA_FAR").float(camera.clip_end * scale).end();
    w.record("CAMERA_FOV").float(camera.fov).end();
    w.record("CAMERA_ORTHO").flag(camera.is_orthographic()).end();
    if camera.is_orthographic() {
        w.record("CAMERA_ORTHOSCALE").float(camera.ortho_scale * scale).end();
    }
    w.close();
    w.close();
}

fn light_type(kind: LightKind) -> &'static str {
    match kind {
        LightKind::Point => "Omni",
        LightKind::Sun => "Directional",
        LightKind::Spot => "Target",
        LightKind::Area => "Area",
    }
}

fn write_light(w: &mut TagWriter, ctx: &ExportContext<'_>, node: &ExportNode<'_>, light: &Light, time: i64) {
    w.open("LIGHTOBJECT");
    write_node_header(w, ctx, node);
    w.record("LIGHT_TYPE").word(light_type(light.kind)).end();
    write_node_tm(w, node.name(), &node.world);
    w.record("LIGHT_SHADOWS")
        .word(if light.cast_shadows { "Raytraced" } else { "Off" })
        .end();
    w.record("LIGHT_USELIGHT").uint(1).end();
    w.open("LIGHT_SETTINGS");
    w.record("TIMEVALUE").int(time).end();
    w.record("LIGHT_COLOR").floats(&light.color).end();
    w.record("LIGHT_INTENS").float(light.energy).end();
    w.record("LIGHT_HOTSPOT").float(light.hotspot().to_degrees()).end();
    w.record("LIGHT_FALLOFF").float(light.falloff().to_degrees()).end();
    w.record("LIGHT_ATTNEND").float(light.distance * ctx.options.global_scale).end();
    w.close();
    w.close();
}

fn write_helper(w: &mut TagWriter, ctx: &ExportContext<'_>, node: &ExportNode<'_>) {
    w.open("HELPEROBJECT");
    write_node_header(w, ctx, node);
    w.record("HELPER_CLASS").string("Dummy").end();
    write_node_tm(w, node.name(), &node.world);
    w.close();
}

fn write_bone(w: &mut TagWriter, armature: &ExportNode<'_>, bones: &[BoneNode<'_>], bone: &BoneNode<'_>) {
    let parent = bone
        .parent
        .and_then(|p| bones.iter().find(|b| b.index == p))
        .map(|b| b.name)
        .unwrap_or_else(|| armature.name());

    w.open("HELPEROBJECT");
    w.record("NODE_NAME").string(bone.name).end();
    w.record("NODE_PARENT").string(parent).end();
    w.record("HELPER_CLASS").string("Bone").end();
    write_node_tm(w, bone.name, &bone.world);
    w.close();
}
