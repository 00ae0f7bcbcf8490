//! Mesh attribute deduplication and face indexing
//!
//! The host hands over redundant per-loop data. Every format wants unique
//! position, UV and colour lists with faces referencing them by index.
//! Uniqueness is decided on values rounded to the output precision, so
//! values within half a unit of the last printed digit share one slot.
//! Exact halfway values may round differently here than in the writer.

use std::collections::HashMap;
use std::hash::Hash;

use euroland_core::{Mat3, Mat4, Vec2, Vec3};
use euroland_scene::{newell_normal, CornerList, Mesh};
use smallvec::SmallVec;

use crate::basis::BasisConversion;
use crate::options::ExportOptions;
use crate::traits::{ExportError, ExportResult};

/// Values that can be keyed for deduplication
pub trait Quantize: Copy {
    type Key: Eq + Hash;

    fn quantize(&self, factor: f64) -> Self::Key;
}

fn quantize_component(value: f32, factor: f64) -> i64 {
    // Rounding to zero from either side lands on the same key
    (value as f64 * factor).round() as i64
}

impl Quantize for Vec2 {
    type Key = [i64; 2];

    fn quantize(&self, factor: f64) -> Self::Key {
        [quantize_component(self.x, factor), quantize_component(self.y, factor)]
    }
}

impl Quantize for Vec3 {
    type Key = [i64; 3];

    fn quantize(&self, factor: f64) -> Self::Key {
        [
            quantize_component(self.x, factor),
            quantize_component(self.y, factor),
            quantize_component(self.z, factor),
        ]
    }
}

impl Quantize for [f32; 4] {
    type Key = [i64; 4];

    fn quantize(&self, factor: f64) -> Self::Key {
        self.map(|c| quantize_component(c, factor))
    }
}

/// First-occurrence ordered list of unique values
#[derive(Debug, Clone)]
pub struct UniqueList<T: Quantize> {
    items: Vec<T>,
    lookup: HashMap<T::Key, u32>,
    factor: f64,
}

impl<T: Quantize> UniqueList<T> {
    pub fn new(precision: usize) -> Self {
        Self {
            items: Vec::new(),
            lookup: HashMap::new(),
            factor: 10f64.powi(precision as i32),
        }
    }

    /// Index of `value`, appending it when unseen
    pub fn insert(&mut self, value: T) -> u32 {
        let key = value.quantize(self.factor);
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }
        let index = self.items.len() as u32;
        self.items.push(value);
        self.lookup.insert(key, index);
        index
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.items.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Deduplicate `values`, returning the unique list and one index per input
pub fn dedup<T: Quantize>(values: &[T], precision: usize) -> (Vec<T>, Vec<u32>) {
    let mut list = UniqueList::new(precision);
    let indices = values.iter().map(|&v| list.insert(v)).collect();
    (list.into_items(), indices)
}

/// One polygon with indices into the unique lists
#[derive(Debug, Clone, PartialEq)]
pub struct FaceRecord {
    pub positions: CornerList,
    pub uvs: Option<CornerList>,
    pub colors: Option<CornerList>,
    /// Per-corner normals
    pub normals: SmallVec<[Vec3; 4]>,
    /// Polygon normal
    pub normal: Vec3,
    /// Index into the global material list
    pub material: u32,
    pub smooth: bool,
}

impl FaceRecord {
    pub fn corner_count(&self) -> usize {
        self.positions.len()
    }
}

/// Fan triangle of a [`FaceRecord`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub positions: [u32; 3],
    pub uvs: Option<[u32; 3]>,
    pub colors: Option<[u32; 3]>,
    pub normals: [Vec3; 3],
    pub normal: Vec3,
    pub material: u32,
    pub smooth: bool,
    /// AB, BC, CA lie on the polygon boundary
    pub edges: [bool; 3],
}

/// Shape key as offsets from the basis
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeKeyRecord {
    pub name: String,
    pub value: f32,
    /// `(position index, offset)`; zero offsets are left out
    pub offsets: Vec<(u32, Vec3)>,
}

/// Skin weight on a position
#[derive(Debug, Clone, PartialEq)]
pub struct WeightRecord {
    pub position: u32,
    pub group: String,
    pub weight: f32,
}

/// Inputs for [`IndexedMesh::build`]
#[derive(Debug, Clone, Copy)]
pub struct MeshContext<'a> {
    pub conversion: &'a BasisConversion,
    /// Source-space matrix baked into the vertices
    pub bake: Option<Mat4>,
    pub options: &'a ExportOptions,
    /// Global material index per slot; never empty
    pub slot_materials: &'a [u32],
    pub precision: usize,
    /// Collect skin weights (keeps vertex identity)
    pub include_weights: bool,
}

impl<'a> MeshContext<'a> {
    fn material_for(&self, slot: u32) -> u32 {
        self.slot_materials
            .get(slot as usize)
            .or_else(|| self.slot_materials.first())
            .copied()
            .unwrap_or(0)
    }
}

/// Mesh with deduplicated attributes and indexed faces, in target space
#[derive(Debug, Clone, Default)]
pub struct IndexedMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    /// Original vertex → position index
    pub vertex_remap: Vec<u32>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<[f32; 4]>,
    pub faces: Vec<FaceRecord>,
    pub shape_keys: Vec<ShapeKeyRecord>,
    pub weights: Vec<WeightRecord>,
    pub has_uvs: bool,
    pub has_colors: bool,
}

impl IndexedMesh {
    pub fn build(mesh: &Mesh, ctx: &MeshContext<'_>) -> Self {
        let conv = ctx.conversion;
        let options = ctx.options;

        let bake = ctx.bake.unwrap_or(Mat4::IDENTITY);
        let bake_linear = bake.linear();
        let mirrored = bake_linear.determinant() < 0.0;
        let normal_matrix = bake_linear
            .inverse()
            .map(|inv| inv.transpose())
            .unwrap_or(Mat3::IDENTITY);
        let reverse = options.flip_winding ^ mirrored;

        let baked: Vec<Vec3> = mesh.vertices.iter().map(|v| bake.transform_point(v.co)).collect();
        let converted: Vec<Vec3> = baked.iter().map(|&p| conv.convert_point(p)).collect();

        let with_shape_keys = options.export_shape_keys && mesh.has_shape_keys();
        let keep_identity = with_shape_keys || ctx.include_weights;
        let (positions, vertex_remap) = if options.merge_vertices && !keep_identity {
            dedup(&converted, ctx.precision)
        } else {
            (converted.clone(), (0..converted.len() as u32).collect())
        };

        let vertex_normals: Vec<Vec3> = mesh
            .vertices
            .iter()
            .map(|v| conv.convert_normal(normal_matrix.mul_vec(v.normal)))
            .collect();

        let mut uvs = UniqueList::new(ctx.precision);
        let uv_indices: Option<Vec<u32>> = mesh
            .active_uv_layer()
            .filter(|_| options.export_uvs)
            .map(|layer| {
                layer
                    .data
                    .iter()
                    .map(|uv| {
                        let v = if options.flip_v { 1.0 - uv.y } else { uv.y };
                        uvs.insert(Vec2::new(uv.x, v))
                    })
                    .collect()
            });

        let mut colors = UniqueList::new(ctx.precision);
        let color_indices: Option<Vec<u32>> = mesh
            .active_color_layer()
            .filter(|_| options.export_colors)
            .map(|layer| layer.data.iter().map(|&c| colors.insert(c)).collect());

        let loop_starts = mesh.loop_starts();
        let mut faces = Vec::with_capacity(mesh.polygons.len());

        for (polygon, &start) in mesh.polygons.iter().zip(&loop_starts) {
            let count = polygon.vertices.len();
            let mut corners: SmallVec<[usize; 4]> = (0..count).collect();
            if reverse && count > 1 {
                corners[1..].reverse();
            }

            let source: SmallVec<[Vec3; 4]> =
                polygon.vertices.iter().map(|&v| baked[v as usize]).collect();
            let mut source_normal = newell_normal(&source);
            if mirrored {
                source_normal = source_normal.scale(-1.0);
            }
            let normal = conv.convert_normal(source_normal);

            let positions = corners
                .iter()
                .map(|&c| vertex_remap[polygon.vertices[c] as usize])
                .collect();
            let uvs = uv_indices
                .as_ref()
                .map(|idx| corners.iter().map(|&c| idx[start + c]).collect());
            let colors = color_indices
                .as_ref()
                .map(|idx| corners.iter().map(|&c| idx[start + c]).collect());
            let normals = corners
                .iter()
                .map(|&c| {
                    if polygon.smooth {
                        vertex_normals[polygon.vertices[c] as usize]
                    } else {
                        normal
                    }
                })
                .collect();

            faces.push(FaceRecord {
                positions,
                uvs,
                colors,
                normals,
                normal,
                material: ctx.material_for(polygon.material_index),
                smooth: polygon.smooth,
            });
        }

        let shape_keys = if with_shape_keys {
            build_shape_keys(mesh, &bake, conv, &vertex_remap, ctx.precision)
        } else {
            Vec::new()
        };

        let weights = if ctx.include_weights {
            build_weights(mesh, &vertex_remap)
        } else {
            Vec::new()
        };

        Self {
            name: mesh.name.clone(),
            positions,
            vertex_remap,
            uvs: uvs.into_items(),
            colors: colors.into_items(),
            faces,
            shape_keys,
            weights,
            has_uvs: uv_indices.is_some(),
            has_colors: color_indices.is_some(),
        }
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(|f| f.corner_count().saturating_sub(2)).sum()
    }

    /// Distinct global materials referenced by faces, in first-use order
    pub fn materials_used(&self) -> Vec<u32> {
        let mut used = Vec::new();
        for face in &self.faces {
            if !used.contains(&face.material) {
                used.push(face.material);
            }
        }
        used
    }

    pub fn material_count(&self) -> usize {
        self.materials_used().len()
    }

    /// Fan-triangulate every face
    pub fn triangles(&self) -> Vec<Triangle> {
        let mut out = Vec::with_capacity(self.triangle_count());
        for face in &self.faces {
            let n = face.corner_count();
            for k in 1..n.saturating_sub(1) {
                let pick = [0, k, k + 1];
                out.push(Triangle {
                    positions: pick.map(|c| face.positions[c]),
                    uvs: face.uvs.as_ref().map(|uvs| pick.map(|c| uvs[c])),
                    colors: face.colors.as_ref().map(|colors| pick.map(|c| colors[c])),
                    normals: pick.map(|c| face.normals[c]),
                    normal: face.normal,
                    material: face.material,
                    smooth: face.smooth,
                    edges: [k == 1, true, k + 2 == n],
                });
            }
        }
        out
    }

    /// Every face index must point into its list
    pub fn validate_indices(&self) -> ExportResult<()> {
        for (i, face) in self.faces.iter().enumerate() {
            let check = |indices: Option<&CornerList>, len: usize, what: &str| {
                match indices.and_then(|idx| idx.iter().find(|&&v| v as usize >= len)) {
                    Some(bad) => Err(ExportError::InvalidMeshData(format!(
                        "mesh '{}': face {} {} index {} of {}",
                        self.name, i, what, bad, len
                    ))),
                    None => Ok(()),
                }
            };
            check(Some(&face.positions), self.positions.len(), "position")?;
            check(face.uvs.as_ref(), self.uvs.len(), "uv")?;
            check(face.colors.as_ref(), self.colors.len(), "colour")?;
        }

        for key in &self.shape_keys {
            if let Some((bad, _)) = key.offsets.iter().find(|(p, _)| *p as usize >= self.positions.len()) {
                return Err(ExportError::InvalidMeshData(format!(
                    "mesh '{}': shape key '{}' offset on position {} of {}",
                    self.name,
                    key.name,
                    bad,
                    self.positions.len()
                )));
            }
        }

        Ok(())
    }
}

fn build_shape_keys(
    mesh: &Mesh,
    bake: &Mat4,
    conv: &BasisConversion,
    vertex_remap: &[u32],
    precision: usize,
) -> Vec<ShapeKeyRecord> {
    let Some((basis, keys)) = mesh.shape_keys.split_first() else {
        return Vec::new();
    };
    let factor = 10f64.powi(precision as i32);

    keys.iter()
        .map(|key| {
            let offsets = key
                .data
                .iter()
                .zip(&basis.data)
                .enumerate()
                .filter_map(|(i, (shaped, rest))| {
                    let offset = conv.convert_offset(bake.transform_vector(shaped.sub(rest)));
                    if offset.quantize(factor) == [0, 0, 0] {
                        None
                    } else {
                        Some((vertex_remap[i], offset))
                    }
                })
                .collect();

            ShapeKeyRecord {
                name: key.name.clone(),
                value: key.value,
                offsets,
            }
        })
        .collect()
}

fn build_weights(mesh: &Mesh, vertex_remap: &[u32]) -> Vec<WeightRecord> {
    let mut weights = Vec::new();
    for (i, vertex) in mesh.vertices.iter().enumerate() {
        for w in vertex.groups.iter().filter(|w| w.weight > 0.0) {
            if let Some(group) = mesh.vertex_groups.get(w.group as usize) {
                weights.push(WeightRecord {
                    position: vertex_remap[i],
                    group: group.clone(),
                    weight: w.weight,
                });
            }
        }
    }
    weights
}
