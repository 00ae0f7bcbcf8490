//! End-to-end tests for the EIF, ESE and RTG exporters
//!
//! These tests cover:
//! - Exporting a loaded scene to disk through the registry
//! - Option files, coordinate systems, precision and scale
//! - Object filtering and hierarchy reparenting
//! - Failure behaviour (no partial output files)

use std::io::Write;
use std::path::Path;

use euroland_core::{Mat4, Vec3};
use euroland_export::{
    CoordinateSystem, EifExporter, EseExporter, ExportError, ExportOptions, Exporter, RtgExporter,
    GLOBAL_REGISTRY,
};
use euroland_scene::{load_scene, Mesh, MeshVertex, Object, ObjectData, Polygon, Scene};

const LEVEL_YAML: &str = r#"
name: Level
source_file: level.blend
materials:
  - name: Stone
    base_color: [0.5, 0.5, 0.5, 1.0]
meshes:
  - name: Block
    vertices:
      - co: [0.0, 0.0, 0.0]
      - co: [1.0, 0.0, 0.0]
      - co: [1.0, 1.0, 0.0]
      - co: [0.0, 1.0, 0.0]
      - co: [0.0, 0.0, 1.0]
    polygons:
      - vertices: [0, 3, 2, 1]
      - vertices: [0, 1, 4]
    materials: [Stone]
cameras:
  - name: View
lights:
  - name: Sun
    kind: sun
objects:
  - name: Group
  - name: BlockA
    parent: Group
    data: { type: mesh, name: Block }
  - name: BlockB
    parent: Group
    data: { type: mesh, name: Block }
    matrix_world:
      - [1.0, 0.0, 0.0, 3.0]
      - [0.0, 1.0, 0.0, 0.0]
      - [0.0, 0.0, 1.0, 0.0]
      - [0.0, 0.0, 0.0, 1.0]
  - name: Camera
    data: { type: camera, name: View }
  - name: SunLight
    data: { type: light, name: Sun }
"#;

/// Helper to load the shared level description
fn load_level(dir: &Path) -> Scene {
    let path = dir.join("level.yaml");
    std::fs::write(&path, LEVEL_YAML).unwrap();
    load_scene(&path).unwrap()
}

/// Helper to build a single-quad scene
fn quad_scene() -> Scene {
    let mut scene = Scene::new("quad");
    let mut mesh = Mesh::new("Quad");
    mesh.vertices = vec![
        MeshVertex::new(Vec3::new(0.0, 0.0, 0.0)),
        MeshVertex::new(Vec3::new(1.0, 0.0, 0.0)),
        MeshVertex::new(Vec3::new(1.0, 1.0, 0.0)),
        MeshVertex::new(Vec3::new(0.0, 1.0, 0.0)),
    ];
    mesh.polygons = vec![Polygon::new(&[0, 1, 2, 3])];
    scene.meshes.push(mesh);
    scene
        .objects
        .push(Object::new("Floor", ObjectData::Mesh("Quad".into())));
    scene
}

mod pipeline_tests {
    use super::*;

    #[test]
    fn test_export_all_formats_via_registry() {
        let dir = tempfile::tempdir().unwrap();
        let scene = load_level(dir.path());
        let options = ExportOptions::default();

        for name in ["level.eif", "level.ese", "level.rtg"] {
            let out = dir.path().join(name);
            let exporter = GLOBAL_REGISTRY.get_for_path(&out).unwrap();
            let summary = exporter.export_file(&scene, &options, &out).unwrap();

            let written = std::fs::read_to_string(&out).unwrap();
            assert_eq!(summary.bytes, written.len(), "{}", name);
            assert_eq!(summary.nodes, 5, "{}", name);
            assert_eq!(summary.materials, 1, "{}", name);
            assert_eq!(summary.cameras, 1, "{}", name);
            assert_eq!(summary.lights, 1, "{}", name);
            // One quad plus one triangle per instance
            assert_eq!(summary.faces % 2, 0, "{}", name);
        }
    }

    #[test]
    fn test_triangle_counts_agree() {
        let dir = tempfile::tempdir().unwrap();
        let scene = load_level(dir.path());
        let options = ExportOptions::default();

        let eif = EifExporter.render(&scene, &options).unwrap().summary;
        let ese = EseExporter.render(&scene, &options).unwrap().summary;
        let rtg = RtgExporter.render(&scene, &options).unwrap().summary;

        // EIF shares the datablock; ESE and RTG write it per object
        assert_eq!(eif.meshes, 1);
        assert_eq!(eif.triangles, 3);
        assert_eq!(ese.meshes, 2);
        assert_eq!(ese.triangles, 6);
        assert_eq!(rtg.triangles, ese.triangles);
    }

    #[test]
    fn test_output_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let scene = load_level(dir.path());
        let options = ExportOptions::default();

        for exporter in [
            &EifExporter as &dyn Exporter,
            &EseExporter as &dyn Exporter,
            &RtgExporter as &dyn Exporter,
        ] {
            let first = exporter.export_string(&scene, &options).unwrap();
            let second = exporter.export_string(&scene, &options).unwrap();
            assert_eq!(first, second, "{}", exporter.id());
        }
    }

    #[test]
    fn test_write_scene_matches_export_string() {
        let scene = quad_scene();
        let options = ExportOptions::default();

        let mut buffer: Vec<u8> = Vec::new();
        let summary = RtgExporter.write_scene(&scene, &options, &mut buffer).unwrap();

        let text = RtgExporter.export_string(&scene, &options).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), text);
        assert_eq!(summary.bytes, text.len());
    }
}

mod option_tests {
    use super::*;

    #[test]
    fn test_options_file_drives_export() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("export.yaml");
        let mut file = std::fs::File::create(&config).unwrap();
        writeln!(file, "coordinate_system: z-up-right-handed").unwrap();
        writeln!(file, "precision: 2").unwrap();
        writeln!(file, "export_uvs: false").unwrap();
        drop(file);

        let options = ExportOptions::from_file(&config).unwrap();
        assert_eq!(options.coordinate_system, CoordinateSystem::ZUpRightHanded);

        let text = EifExporter.export_string(&quad_scene(), &options).unwrap();
        assert!(text.contains("\t*COORD_SYSTEM \"RH\"\n\t*UP_AXIS \"Z\"\n"));
        assert!(text.contains("\t\t*VERTEX 1.00 1.00 0.00\n"));
        assert!(text.contains("\t*UVCOUNT 0\n"));
    }

    #[test]
    fn test_invalid_options_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("export.json");
        std::fs::write(&config, r#"{ "global_scale": -1.0 }"#).unwrap();

        assert!(matches!(
            ExportOptions::from_file(&config),
            Err(ExportError::Config(_))
        ));
    }

    #[test]
    fn test_global_scale() {
        let options = ExportOptions {
            global_scale: 10.0,
            ..Default::default()
        };
        let text = EseExporter.export_string(&quad_scene(), &options).unwrap();
        // Source (1, 1, 0) in Y-up left-handed is (1, 0, 1)
        assert!(text.contains("\t\t\t*MESH_VERTEX 2 10.0000 0.0000 10.0000\n"));
    }

    #[test]
    fn test_coordinate_systems_differ() {
        let scene = quad_scene();
        let lh = RtgExporter.export_string(&scene, &ExportOptions::default()).unwrap();
        let rh = RtgExporter
            .export_string(
                &scene,
                &ExportOptions {
                    coordinate_system: CoordinateSystem::YUpRightHanded,
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(lh.contains("\t*COORD_SYSTEM \"LH\"\n"));
        assert!(rh.contains("\t*COORD_SYSTEM \"RH\"\n"));
        // Source +Y maps to +Z (LH) and -Z (RH)
        assert!(lh.contains("\t\t\t*V 1.000000 0.000000 1.000000\n"));
        assert!(rh.contains("\t\t\t*V 1.000000 0.000000 -1.000000\n"));
    }
}

mod filtering_tests {
    use super::*;

    #[test]
    fn test_hidden_parent_is_skipped() {
        let mut scene = quad_scene();
        let mut hidden = Object::new("Hidden", ObjectData::Empty)
            .with_matrix(Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0)));
        hidden.visible = false;
        scene.objects.push(hidden);
        scene.objects[0].parent = Some("Hidden".into());

        let text = RtgExporter.export_string(&scene, &ExportOptions::default()).unwrap();
        assert!(!text.contains("\"Hidden\""));
        assert!(text.contains("\t*NODE 0 \"Floor\" -1 \"MESH\"\n"));

        let options = ExportOptions {
            visible_only: false,
            ..Default::default()
        };
        let text = RtgExporter.export_string(&scene, &options).unwrap();
        assert!(text.contains("\t*NODE 0 \"Hidden\" -1 \"EMPTY\"\n\t*NODE 1 \"Floor\" 0 \"MESH\"\n"));
    }

    #[test]
    fn test_selected_only() {
        let mut scene = quad_scene();
        scene.objects.push(Object::new("Marker", ObjectData::Empty));
        scene.objects[1].selected = true;

        let options = ExportOptions {
            selected_only: true,
            ..Default::default()
        };
        let rendered = EifExporter.render(&scene, &options).unwrap();
        assert_eq!(rendered.summary.nodes, 1);
        assert_eq!(rendered.summary.meshes, 0);
        assert!(rendered.text.contains("\"Marker\""));
    }

    #[test]
    fn test_kind_toggles() {
        let dir = tempfile::tempdir().unwrap();
        let scene = load_level(dir.path());
        let options = ExportOptions {
            export_cameras: false,
            export_lights: false,
            ..Default::default()
        };

        let summary = EseExporter.render(&scene, &options).unwrap().summary;
        assert_eq!(summary.cameras, 0);
        assert_eq!(summary.lights, 0);
        assert_eq!(summary.nodes, 3);
    }
}

mod failure_tests {
    use super::*;

    #[test]
    fn test_failed_export_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = quad_scene();
        scene
            .objects
            .push(Object::new("Ghost", ObjectData::Mesh("Missing".into())));

        for exporter in [
            &EifExporter as &dyn Exporter,
            &EseExporter as &dyn Exporter,
            &RtgExporter as &dyn Exporter,
        ] {
            let out = dir.path().join(format!("broken.{}", exporter.id()));
            let err = exporter
                .export_file(&scene, &ExportOptions::default(), &out)
                .unwrap_err();
            assert!(matches!(err, ExportError::Scene(_)), "{}", exporter.id());
            assert!(!out.exists(), "{}", exporter.id());
        }
    }

    #[test]
    fn test_unknown_output_extension() {
        assert!(GLOBAL_REGISTRY.get_for_path(Path::new("level.obj")).is_err());
    }

    #[test]
    fn test_invalid_precision_rejected() {
        let options = ExportOptions {
            precision: Some(12),
            ..Default::default()
        };
        assert!(matches!(
            EseExporter.render(&quad_scene(), &options),
            Err(ExportError::Config(_))
        ));
    }
}
