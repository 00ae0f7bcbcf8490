// euroland-scene/src/mesh.rs
//! Evaluated mesh data structures
//!
//! A mesh is stored the way the host evaluates it: unique vertices, polygons
//! listing vertex indices, and per-loop attribute layers. Loops are the
//! polygon corners taken in polygon order, so loop `n` of the mesh is the
//! `n`-th corner when walking `polygons` front to back.

use euroland_core::{BoundingBox, Error, Result, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Polygon corner list; quads stay inline
pub type CornerList = SmallVec<[u32; 4]>;

/// An evaluated (modifier-applied) mesh
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    /// Mesh datablock name
    pub name: String,
    /// Unique vertices
    #[serde(default)]
    pub vertices: Vec<MeshVertex>,
    /// Polygons (n-gons allowed)
    #[serde(default)]
    pub polygons: Vec<Polygon>,
    /// UV layers, one entry per loop
    #[serde(default)]
    pub uv_layers: Vec<UvLayer>,
    /// Vertex colour layers, one entry per loop
    #[serde(default)]
    pub color_layers: Vec<ColorLayer>,
    /// Shape keys, one position per vertex; the first key is the basis
    #[serde(default)]
    pub shape_keys: Vec<ShapeKey>,
    /// Material slots (by material name, `None` for an empty slot)
    #[serde(default)]
    pub materials: Vec<Option<String>>,
    /// Vertex group names, indexed by [`VertexWeight::group`]
    #[serde(default)]
    pub vertex_groups: Vec<String>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get polygon count
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Total number of polygon corners
    pub fn loop_count(&self) -> usize {
        self.polygons.iter().map(|p| p.vertices.len()).sum()
    }

    /// Triangle count after fan triangulation
    pub fn triangle_count(&self) -> usize {
        self.polygons
            .iter()
            .map(|p| p.vertices.len().saturating_sub(2))
            .sum()
    }

    /// First loop index of every polygon
    pub fn loop_starts(&self) -> Vec<usize> {
        let mut starts = Vec::with_capacity(self.polygons.len());
        let mut next = 0;
        for polygon in &self.polygons {
            starts.push(next);
            next += polygon.vertices.len();
        }
        starts
    }

    /// Iterate all loops in order
    pub fn loops(&self) -> impl Iterator<Item = MeshLoop> + '_ {
        self.polygons
            .iter()
            .enumerate()
            .scan(0usize, |next, (polygon_index, polygon)| {
                let start = *next;
                *next += polygon.vertices.len();
                Some((polygon_index, start, polygon))
            })
            .flat_map(|(polygon, start, p)| {
                p.vertices.iter().enumerate().map(move |(corner, &vertex)| MeshLoop {
                    index: start + corner,
                    polygon,
                    vertex,
                })
            })
    }

    /// Layer flagged active, else the first one
    pub fn active_uv_layer(&self) -> Option<&UvLayer> {
        self.uv_layers
            .iter()
            .find(|l| l.active)
            .or_else(|| self.uv_layers.first())
    }

    /// Colour layer flagged active, else the first one
    pub fn active_color_layer(&self) -> Option<&ColorLayer> {
        self.color_layers
            .iter()
            .find(|l| l.active)
            .or_else(|| self.color_layers.first())
    }

    /// Check if mesh has UV coordinates
    pub fn has_uvs(&self) -> bool {
        !self.uv_layers.is_empty()
    }

    /// Check if mesh has vertex colors
    pub fn has_colors(&self) -> bool {
        !self.color_layers.is_empty()
    }

    /// Check if mesh has shape keys beyond the basis
    pub fn has_shape_keys(&self) -> bool {
        self.shape_keys.len() > 1
    }

    /// Check if any vertex carries a group weight
    pub fn has_vertex_weights(&self) -> bool {
        self.vertices.iter().any(|v| !v.groups.is_empty())
    }

    /// Get all unique material slot indices used by polygons
    pub fn material_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.polygons.iter().map(|p| p.material_index).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Bounding box of the vertex positions
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices.iter().map(|v| v.co))
    }

    /// Polygon normal from the stored vertex positions
    pub fn polygon_normal(&self, polygon: &Polygon) -> Vec3 {
        let points: SmallVec<[Vec3; 4]> = polygon
            .vertices
            .iter()
            .filter_map(|&i| self.vertices.get(i as usize).map(|v| v.co))
            .collect();
        newell_normal(&points)
    }

    /// Check structural consistency
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.vertices.len();

        for (index, vertex) in self.vertices.iter().enumerate() {
            if !vertex.co.is_finite() || !vertex.normal.is_finite() {
                return Err(Error::invalid_data(format!(
                    "mesh '{}': vertex {} has a non-finite coordinate",
                    self.name, index
                )));
            }
            for weight in &vertex.groups {
                if weight.group as usize >= self.vertex_groups.len() {
                    return Err(Error::invalid_data(format!(
                        "mesh '{}': vertex {} references group {} of {}",
                        self.name,
                        index,
                        weight.group,
                        self.vertex_groups.len()
                    )));
                }
            }
        }

        for (index, polygon) in self.polygons.iter().enumerate() {
            if polygon.vertices.len() < 3 {
                return Err(Error::invalid_data(format!(
                    "mesh '{}': polygon {} has {} corners",
                    self.name,
                    index,
                    polygon.vertices.len()
                )));
            }
            for (corner, &v) in polygon.vertices.iter().enumerate() {
                if v as usize >= vertex_count {
                    return Err(Error::invalid_data(format!(
                        "mesh '{}': polygon {} references vertex {} of {}",
                        self.name, index, v, vertex_count
                    )));
                }
                if polygon.vertices[..corner].contains(&v) {
                    return Err(Error::invalid_data(format!(
                        "mesh '{}': polygon {} repeats vertex {}",
                        self.name, index, v
                    )));
                }
            }
            if !self.materials.is_empty() && polygon.material_index as usize >= self.materials.len() {
                return Err(Error::invalid_data(format!(
                    "mesh '{}': polygon {} uses material slot {} of {}",
                    self.name,
                    index,
                    polygon.material_index,
                    self.materials.len()
                )));
            }
        }

        let loop_count = self.loop_count();
        for layer in &self.uv_layers {
            if layer.data.len() != loop_count {
                return Err(Error::invalid_data(format!(
                    "mesh '{}': UV layer '{}' has {} entries for {} loops",
                    self.name,
                    layer.name,
                    layer.data.len(),
                    loop_count
                )));
            }
        }
        for layer in &self.color_layers {
            if layer.data.len() != loop_count {
                return Err(Error::invalid_data(format!(
                    "mesh '{}': colour layer '{}' has {} entries for {} loops",
                    self.name,
                    layer.name,
                    layer.data.len(),
                    loop_count
                )));
            }
        }
        for key in &self.shape_keys {
            if key.data.len() != vertex_count {
                return Err(Error::invalid_data(format!(
                    "mesh '{}': shape key '{}' has {} positions for {} vertices",
                    self.name,
                    key.name,
                    key.data.len(),
                    vertex_count
                )));
            }
        }

        Ok(())
    }
}

/// A single loop (polygon corner)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshLoop {
    /// Loop index into per-loop layers
    pub index: usize,
    /// Owning polygon
    pub polygon: usize,
    /// Vertex index
    pub vertex: u32,
}

/// A unique mesh vertex
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshVertex {
    /// Position in object space
    pub co: Vec3,
    /// Smoothed vertex normal
    #[serde(default)]
    pub normal: Vec3,
    /// Vertex group memberships
    #[serde(default)]
    pub groups: Vec<VertexWeight>,
}

impl MeshVertex {
    /// Create a vertex with just position
    pub fn new(co: Vec3) -> Self {
        Self {
            co,
            normal: Vec3::Z,
            groups: Vec::new(),
        }
    }
}

/// Vertex group weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexWeight {
    pub group: u32,
    pub weight: f32,
}

/// A polygon face
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Polygon {
    /// Vertex indices in winding order
    pub vertices: CornerList,
    /// Material slot index
    #[serde(default)]
    pub material_index: u32,
    /// Smooth shading flag
    #[serde(default)]
    pub smooth: bool,
}

impl Polygon {
    /// Create a polygon from vertex indices
    pub fn new(vertices: &[u32]) -> Self {
        Self {
            vertices: CornerList::from_slice(vertices),
            material_index: 0,
            smooth: false,
        }
    }

    /// Set the material slot
    pub fn with_material(mut self, material_index: u32) -> Self {
        self.material_index = material_index;
        self
    }

    /// Mark as smooth shaded
    pub fn smooth(mut self) -> Self {
        self.smooth = true;
        self
    }
}

/// Per-loop UV layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UvLayer {
    pub name: String,
    #[serde(default)]
    pub active: bool,
    pub data: Vec<Vec2>,
}

/// Per-loop colour layer (linear RGBA, 0-1)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorLayer {
    pub name: String,
    #[serde(default)]
    pub active: bool,
    pub data: Vec<[f32; 4]>,
}

/// Shape key (morph target) with absolute positions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShapeKey {
    pub name: String,
    /// Blend weight
    #[serde(default)]
    pub value: f32,
    pub data: Vec<Vec3>,
}

/// Polygon normal by Newell's method; works for non-planar n-gons
pub fn newell_normal(points: &[Vec3]) -> Vec3 {
    let mut normal = Vec3::ZERO;
    for (i, cur) in points.iter().enumerate() {
        let next = &points[(i + 1) % points.len()];
        normal.x += (cur.y - next.y) * (cur.z + next.z);
        normal.y += (cur.z - next.z) * (cur.x + next.x);
        normal.z += (cur.x - next.x) * (cur.y + next.y);
    }
    normal.normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_mesh() -> Mesh {
        let mut mesh = Mesh::new("test");

        mesh.vertices = vec![
            MeshVertex::new(Vec3::new(0.0, 0.0, 0.0)),
            MeshVertex::new(Vec3::new(1.0, 0.0, 0.0)),
            MeshVertex::new(Vec3::new(1.0, 1.0, 0.0)),
            MeshVertex::new(Vec3::new(0.0, 1.0, 0.0)),
            MeshVertex::new(Vec3::new(2.0, 0.0, 0.0)),
        ];

        mesh.polygons = vec![Polygon::new(&[0, 1, 2, 3]), Polygon::new(&[1, 4, 2])];

        mesh
    }

    #[test]
    fn test_mesh_counts() {
        let mesh = make_test_mesh();
        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.polygon_count(), 2);
        assert_eq!(mesh.loop_count(), 7);
        assert_eq!(mesh.triangle_count(), 3);
    }

    #[test]
    fn test_loops_follow_polygon_order() {
        let mesh = make_test_mesh();
        let loops: Vec<MeshLoop> = mesh.loops().collect();

        assert_eq!(loops.len(), 7);
        assert_eq!(loops[4], MeshLoop { index: 4, polygon: 1, vertex: 1 });
        assert_eq!(mesh.loop_starts(), vec![0, 4]);
    }

    #[test]
    fn test_polygon_normal() {
        let mesh = make_test_mesh();
        let normal = mesh.polygon_normal(&mesh.polygons[0]);

        // Counter-clockwise in XY faces +Z
        assert!(normal.z > 0.999);
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let mut mesh = make_test_mesh();
        mesh.polygons.push(Polygon::new(&[0, 1, 9]));
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_short_layer() {
        let mut mesh = make_test_mesh();
        mesh.uv_layers.push(UvLayer {
            name: "UVMap".into(),
            active: true,
            data: vec![Vec2::ZERO; 3],
        });
        let err = mesh.validate().unwrap_err();
        assert!(err.to_string().contains("UVMap"));
    }

    #[test]
    fn test_validate_material_slot_range() {
        let mut mesh = make_test_mesh();
        mesh.materials = vec![Some("Stone".into())];
        assert!(mesh.validate().is_ok());

        mesh.polygons[1].material_index = 1;
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_active_layer_falls_back_to_first() {
        let mut mesh = make_test_mesh();
        mesh.uv_layers = vec![
            UvLayer { name: "a".into(), active: false, data: vec![Vec2::ZERO; 7] },
            UvLayer { name: "b".into(), active: false, data: vec![Vec2::ZERO; 7] },
        ];
        assert_eq!(mesh.active_uv_layer().unwrap().name, "a");

        mesh.uv_layers[1].active = true;
        assert_eq!(mesh.active_uv_layer().unwrap().name, "b");
    }
}
