//! EIF exporter implementation

use std::collections::HashSet;
use std::time::Instant;

use euroland_scene::{Material, ObjectKind, Scene};

use super::{DEFAULT_PRECISION, EIF_VERSION, FACE_FLAG_SMOOTH};
use crate::basis::NodeTransform;
use crate::context::ExportContext;
use crate::indexing::{IndexedMesh, ShapeKeyRecord};
use crate::logging::instrument_export;
use crate::options::ExportOptions;
use crate::traits::{ExportResult, ExportSummary, Exporter, RenderedExport};
use crate::walk::ExportNode;
use crate::writer::TagWriter;

/// EIF exporter
#[derive(Debug, Clone, Copy, Default)]
pub struct EifExporter;

impl EifExporter {
    pub fn new() -> Self {
        Self
    }

    fn render_document(&self, scene: &Scene, options: &ExportOptions) -> ExportResult<RenderedExport> {
        let ctx = ExportContext::prepare(scene, options, self.precision(options))?;
        let mut w = TagWriter::new(ctx.precision);
        let mut summary = ExportSummary::new(self.id());

        w.record("EIF").uint(EIF_VERSION as u64).end();
        write_options(&mut w, &ctx);
        write_scene_info(&mut w, scene);
        write_materials(&mut w, ctx.materials.materials());

        // Mesh definitions: shared per datablock, or one per object when baking
        let mut written = HashSet::new();
        for node in ctx.mesh_nodes() {
            let mesh = ctx.mesh(node)?;
            let (name, bake) = if options.apply_transform {
                (node.name(), Some(node.world_source))
            } else {
                (mesh.name.as_str(), None)
            };
            if !written.insert(name) {
                continue;
            }

            let indexed = ctx.index_mesh(mesh, bake, false)?;
            write_mesh(&mut w, name, &indexed);

            summary.meshes += 1;
            summary.positions += indexed.position_count();
            summary.faces += indexed.face_count();
            summary.triangles += indexed.triangle_count();
        }

        for node in &ctx.nodes {
            match node.kind {
                ObjectKind::Mesh => {
                    let mesh_name = if options.apply_transform {
                        node.name()
                    } else {
                        ctx.mesh(node)?.name.as_str()
                    };
                    write_geom_node(&mut w, &ctx, node, mesh_name);
                }
                kind => write_place_node(&mut w, &ctx, node, kind),
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

impl Exporter for EifExporter {
    fn id(&self) -> &str {
        "eif"
    }

    fn name(&self) -> &str {
        "EuroLand Interchange Format"
    }

    fn extensions(&self) -> &[&str] {
        &["eif"]
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

fn write_options(w: &mut TagWriter, ctx: &ExportContext<'_>) {
    let system = ctx.options.coordinate_system;
    w.open("OPTIONS");
    w.record("COORD_SYSTEM").string(system.handedness_tag()).end();
    w.record("UP_AXIS").string(system.up_axis()).end();
    w.close();
}

fn write_scene_info(w: &mut TagWriter, scene: &Scene) {
    w.open("SCENE");
    w.record("FILENAME").string(&scene.source_file).end();
    w.record("FIRSTFRAME").int(scene.frame_start as i64).end();
    w.record("LASTFRAME").int(scene.frame_end as i64).end();
    w.record("FRAMESPEED").uint(scene.fps as u64).end();
    w.record("STATICFRAME").int(scene.frame_current as i64).end();
    w.record("AMBIENTSTATIC").floats(&scene.ambient).end();
    w.close();
}

fn write_materials(w: &mut TagWriter, materials: &[Material]) {
    w.open("MATERIALS");
    w.record("COUNT").uint(materials.len() as u64).end();
    for (i, material) in materials.iter().enumerate() {
        w.record("MATERIAL").uint(i as u64).open();
        w.record("NAME").string(&material.name).end();
        if material.two_sided {
            w.tag("TWOSIDED");
        }
        w.record("COL_DIFFUSE").floats(&material.diffuse()).end();
        w.record("COL_SPECULAR").floats(&material.specular_color()).end();
        w.record("COL_EMISSIVE").floats(&material.emissive_color()).end();
        w.record("SHININESS").float(material.shininess()).end();
        w.record("OPACITY").float(material.opacity()).end();
        if let Some(texture) = material.texture_name() {
            w.record("MAP_DIFFUSE").string(texture).end();
        }
        w.close();
    }
    w.close();
}

fn write_mesh(w: &mut TagWriter, name: &str, mesh: &IndexedMesh) {
    w.open("MESH");
    w.record("NAME").string(name).end();
    w.record("VERTCOUNT").uint(mesh.positions.len() as u64).end();
    w.record("UVCOUNT").uint(mesh.uvs.len() as u64).end();
    w.record("VERTCOLCOUNT").uint(mesh.colors.len() as u64).end();
    w.record("FACECOUNT").uint(mesh.faces.len() as u64).end();
    w.record("TRIFACECOUNT").uint(mesh.triangle_count() as u64).end();
    w.record("FACELAYERSCOUNT").uint(mesh.material_count() as u64).end();

    w.open("VERTEX_LIST");
    for p in &mesh.positions {
        w.record("VERTEX").vec3(*p).end();
    }
    w.close();

    if !mesh.uvs.is_empty() {
        w.open("UV_LIST");
        for uv in &mesh.uvs {
            w.record("UV").vec2(*uv).end();
        }
        w.close();
    }

    if !mesh.colors.is_empty() {
        w.open("VERTCOL_LIST");
        for c in &mesh.colors {
            w.record("VERTCOL").floats(c).end();
        }
        w.close();
    }

    w.open("FACE_LIST");
    for face in &mesh.faces {
        let n = face.corner_count();
        let mut rec = w.record("FACE").uint(n as u64);
        for &p in &face.positions {
            rec = rec.uint(p as u64);
        }
        for c in 0..n {
            rec = rec.index(face.uvs.as_ref().map(|uvs| uvs[c]));
        }
        for c in 0..n {
            rec = rec.index(face.colors.as_ref().map(|colors| colors[c]));
        }
        let flags = if face.smooth { FACE_FLAG_SMOOTH } else { 0 };
        rec.uint(face.material as u64).uint(flags as u64).end();
    }
    w.close();

    if !mesh.shape_keys.is_empty() {
        write_shape_keys(w, &mesh.shape_keys);
    }

    w.close();
}

fn write_shape_keys(w: &mut TagWriter, keys: &[ShapeKeyRecord]) {
    w.open("SHAPEKEY_LIST");
    w.record("COUNT").uint(keys.len() as u64).end();
    for (i, key) in keys.iter().enumerate() {
        w.record("SHAPEKEY").uint(i as u64).open();
        w.record("NAME").string(&key.name).end();
        w.record("VALUE").float(key.value).end();
        w.record("OFFSETCOUNT").uint(key.offsets.len() as u64).end();
        w.open("OFFSET_LIST");
        for (position, offset) in &key.offsets {
            w.record("OFFSET").uint(*position as u64).vec3(*offset).end();
        }
        w.close();
        w.close();
    }
    w.close();
}

fn write_transform(w: &mut TagWriter, t: &NodeTransform) {
    w.open("WORLD_TM");
    for (i, row) in t.rows.iter().enumerate() {
        w.record(&format!("TMROW{}", i)).floats(row).end();
    }
    w.close();
    w.record("POSITION").vec3(t.translation).end();
    w.record("ROTATION").vec3(t.euler).end();
    w.record("SCALE").vec3(t.scale).end();
}

fn write_parent(w: &mut TagWriter, ctx: &ExportContext<'_>, node: &ExportNode<'_>) {
    if let Some(parent) = node.parent.and_then(|p| ctx.nodes.get(p)) {
        w.record("PARENT").string(parent.name()).end();
    }
}

fn write_geom_node(w: &mut TagWriter, ctx: &ExportContext<'_>, node: &ExportNode<'_>, mesh_name: &str) {
    w.open("GEOMNODE");
    w.record("NAME").string(node.name()).end();
    w.record("MESH").string(mesh_name).end();
    write_parent(w, ctx, node);
    if ctx.options.apply_transform {
        write_transform(w, &NodeTransform::identity());
    } else {
        write_transform(w, &node.world);
    }
    w.record("USER_FLAGS_COUNT").uint(1).end();
    w.record("USER_FLAGS").uint(0).end();
    w.close();
}

fn write_place_node(w: &mut TagWriter, ctx: &ExportContext<'_>, node: &ExportNode<'_>, kind: ObjectKind) {
    w.open("PLACENODE");
    w.record("NAME").string(node.name()).end();
    w.record("TYPE").string(kind.as_str()).end();
    write_parent(w, ctx, node);
    write_transform(w, &node.world);
    w.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use euroland_core::{Mat4, Vec2, Vec3};
    use euroland_scene::{Mesh, MeshVertex, Object, ObjectData, Polygon, ShapeKey, UvLayer};

    fn triangle_scene() -> Scene {
        let mut scene = Scene::new("tri");
        scene.source_file = "tri.blend".into();
        scene.materials.push(Material::new("Red"));

        let mut mesh = Mesh::new("TriMesh");
        mesh.vertices = vec![
            MeshVertex::new(Vec3::new(0.0, 0.0, 0.0)),
            MeshVertex::new(Vec3::new(1.0, 0.0, 0.0)),
            MeshVertex::new(Vec3::new(0.0, 1.0, 0.0)),
        ];
        mesh.polygons = vec![Polygon::new(&[0, 1, 2])];
        mesh.uv_layers = vec![UvLayer {
            name: "UVMap".into(),
            active: true,
            data: vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
        }];
        mesh.materials = vec![Some("Red".into())];
        scene.meshes.push(mesh);

        scene.objects.push(
            Object::new("Tri", ObjectData::Mesh("TriMesh".into()))
                .with_matrix(Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0))),
        );
        scene
    }

    #[test]
    fn test_header_and_counts() {
        let text = EifExporter.export_string(&triangle_scene(), &ExportOptions::default()).unwrap();

        assert!(text.starts_with("*EIF 1\n*OPTIONS {\n\t*COORD_SYSTEM \"LH\"\n\t*UP_AXIS \"Y\"\n}\n"));
        assert!(text.contains("\t*FILENAME \"tri.blend\"\n"));
        assert!(text.contains("\t*VERTCOUNT 3\n"));
        assert!(text.contains("\t*UVCOUNT 3\n"));
        assert!(text.contains("\t*VERTCOLCOUNT 0\n"));
        assert!(text.contains("\t\t*FACE 3 0 1 2 0 1 2 -1 -1 -1 0 0\n"));
        assert!(!text.contains("VERTCOL_LIST"));
    }

    #[test]
    fn test_node_keeps_world_transform() {
        let text = EifExporter.export_string(&triangle_scene(), &ExportOptions::default()).unwrap();

        assert!(text.contains("*GEOMNODE {\n\t*NAME \"Tri\"\n\t*MESH \"TriMesh\"\n"));
        assert!(text.contains("\t\t*TMROW3 0.000000 5.000000 0.000000\n"));
        assert!(text.contains("\t*POSITION 0.000000 5.000000 0.000000\n"));
    }

    #[test]
    fn test_apply_transform_bakes_vertices() {
        let options = ExportOptions {
            apply_transform: true,
            ..Default::default()
        };
        let text = EifExporter.export_string(&triangle_scene(), &options).unwrap();

        assert!(text.contains("*MESH {\n\t*NAME \"Tri\"\n"));
        assert!(text.contains("\t\t*VERTEX 0.000000 5.000000 0.000000\n"));
        assert!(text.contains("\t\t*TMROW3 0.000000 0.000000 0.000000\n"));
    }

    #[test]
    fn test_shared_mesh_written_once() {
        let mut scene = triangle_scene();
        scene.objects.push(Object::new("Tri.001", ObjectData::Mesh("TriMesh".into())));

        let rendered = EifExporter.render(&scene, &ExportOptions::default()).unwrap();
        assert_eq!(rendered.text.matches("*MESH {").count(), 1);
        assert_eq!(rendered.text.matches("*GEOMNODE {").count(), 2);
        assert_eq!(rendered.summary.meshes, 1);
        assert_eq!(rendered.summary.nodes, 2);
    }

    #[test]
    fn test_shape_keys_block() {
        let mut scene = triangle_scene();
        let basis: Vec<Vec3> = scene.meshes[0].vertices.iter().map(|v| v.co).collect();
        let mut moved = basis.clone();
        moved[1].x += 1.0;
        scene.meshes[0].shape_keys = vec![
            ShapeKey { name: "Basis".into(), value: 0.0, data: basis },
            ShapeKey { name: "Stretch".into(), value: 1.0, data: moved },
        ];

        let text = EifExporter.export_string(&scene, &ExportOptions::default()).unwrap();
        assert!(text.contains("\t*SHAPEKEY_LIST {\n\t\t*COUNT 1\n"));
        assert!(text.contains("\t\t\t*NAME \"Stretch\"\n"));
        assert!(text.contains("\t\t\t\t*OFFSET 1 1.000000 0.000000 0.000000\n"));
    }

    #[test]
    fn test_default_material_for_empty_slots() {
        let mut scene = triangle_scene();
        scene.meshes[0].materials.clear();

        let text = EifExporter.export_string(&scene, &ExportOptions::default()).unwrap();
        assert!(text.contains("\t*COUNT 1\n\t*MATERIAL 0 {\n\t\t*NAME \"DEFAULT\"\n"));
    }

    #[test]
    fn test_invalid_scene_is_rejected() {
        let mut scene = triangle_scene();
        scene.objects.push(Object::new("Ghost", ObjectData::Mesh("Missing".into())));
        assert!(EifExporter.render(&scene, &ExportOptions::default()).is_err());
    }
}
