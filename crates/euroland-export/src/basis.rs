//! Coordinate system conversion and transform decomposition
//!
//! Source data is Z-up right-handed with column vectors. Targets are
//! described by a basis matrix `C` mapping source axes to target axes:
//! points become `s·C·p`, linear parts `C·L·Cᵀ`.
//!
//! Cameras and directional lights look down their local -Z in the source.
//! The left-handed target looks down local +Z, so their linear part gets a
//! local fix `K` instead of `Cᵀ` (see [`BasisConversion::convert_oriented`]).

use std::fmt;
use std::str::FromStr;

use euroland_core::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Target coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoordinateSystem {
    /// Y up, left-handed (engine native)
    #[default]
    YUpLeftHanded,
    /// Y up, right-handed
    YUpRightHanded,
    /// Z up, right-handed (source space, no conversion)
    ZUpRightHanded,
}

impl CoordinateSystem {
    /// Basis matrix `C`
    pub fn basis(&self) -> Mat3 {
        match self {
            CoordinateSystem::YUpLeftHanded => {
                Mat3::from_rows([[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]])
            }
            CoordinateSystem::YUpRightHanded => {
                Mat3::from_rows([[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, -1.0, 0.0]])
            }
            CoordinateSystem::ZUpRightHanded => Mat3::IDENTITY,
        }
    }

    /// Local axis fix for objects looking down -Z
    pub fn view_fix(&self) -> Mat3 {
        match self {
            CoordinateSystem::YUpLeftHanded => Mat3::from_diagonal(Vec3::new(1.0, 1.0, -1.0)),
            _ => Mat3::IDENTITY,
        }
    }

    pub fn is_left_handed(&self) -> bool {
        matches!(self, CoordinateSystem::YUpLeftHanded)
    }

    /// `"LH"` or `"RH"`
    pub fn handedness_tag(&self) -> &'static str {
        if self.is_left_handed() {
            "LH"
        } else {
            "RH"
        }
    }

    pub fn up_axis(&self) -> &'static str {
        match self {
            CoordinateSystem::ZUpRightHanded => "Z",
            _ => "Y",
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CoordinateSystem::YUpLeftHanded => "yup-lh",
            CoordinateSystem::YUpRightHanded => "yup-rh",
            CoordinateSystem::ZUpRightHanded => "zup-rh",
        };
        f.write_str(s)
    }
}

impl FromStr for CoordinateSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yup-lh" | "y-up-left-handed" | "lh" => Ok(CoordinateSystem::YUpLeftHanded),
            "yup-rh" | "y-up-right-handed" => Ok(CoordinateSystem::YUpRightHanded),
            "zup-rh" | "z-up-right-handed" | "none" => Ok(CoordinateSystem::ZUpRightHanded),
            _ => Err(format!("Unknown coordinate system: {}", s)),
        }
    }
}

/// Source → target conversion with a uniform unit scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasisConversion {
    system: CoordinateSystem,
    basis: Mat3,
    basis_t: Mat3,
    view_fix: Mat3,
    scale: f32,
}

impl BasisConversion {
    pub fn new(system: CoordinateSystem, scale: f32) -> Self {
        let basis = system.basis();
        Self {
            system,
            basis,
            basis_t: basis.transpose(),
            view_fix: system.view_fix(),
            scale,
        }
    }

    pub fn system(&self) -> CoordinateSystem {
        self.system
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Whether the basis change is a reflection
    pub fn mirrors(&self) -> bool {
        self.basis.determinant() < 0.0
    }

    /// Position: `s·C·p`
    pub fn convert_point(&self, p: Vec3) -> Vec3 {
        self.basis.mul_vec(p).scale(self.scale)
    }

    /// Direction: `C·v`
    pub fn convert_vector(&self, v: Vec3) -> Vec3 {
        self.basis.mul_vec(v)
    }

    /// Displacement (shape key offsets): `s·C·v`
    pub fn convert_offset(&self, v: Vec3) -> Vec3 {
        self.convert_point(v)
    }

    /// Unit normal; `C` is orthogonal so it is its own normal matrix
    pub fn convert_normal(&self, n: Vec3) -> Vec3 {
        self.basis.mul_vec(n).normalize()
    }

    /// Linear part: `C·L·Cᵀ`
    pub fn convert_linear(&self, linear: &Mat3) -> Mat3 {
        self.basis.mul(linear).mul(&self.basis_t)
    }

    pub fn convert_matrix(&self, m: &Mat4) -> Mat4 {
        Mat4::from_linear_translation(
            &self.convert_linear(&m.linear()),
            self.convert_point(m.translation()),
        )
    }

    /// Exact inverse of [`convert_matrix`](Self::convert_matrix)
    pub fn unconvert_matrix(&self, m: &Mat4) -> Mat4 {
        let linear = self.basis_t.mul(&m.linear()).mul(&self.basis);
        let translation = self.basis_t.mul_vec(m.translation()).scale(1.0 / self.scale);
        Mat4::from_linear_translation(&linear, translation)
    }

    /// Cameras and directional lights: `C·L·K`
    pub fn convert_oriented(&self, m: &Mat4) -> Mat4 {
        let linear = self.basis.mul(&m.linear()).mul(&self.view_fix);
        Mat4::from_linear_translation(&linear, self.convert_point(m.translation()))
    }
}

impl Default for BasisConversion {
    fn default() -> Self {
        Self::new(CoordinateSystem::default(), 1.0)
    }
}

/// Target-space transform split the way the formats write it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    /// Full matrix (column vectors)
    pub matrix: Mat4,
    /// Row-vector layout: rows 0-2 are the images of X/Y/Z, row 3 is the translation
    pub rows: [[f32; 3]; 4],
    pub translation: Vec3,
    /// XYZ Euler angles in radians, `R = Rz·Ry·Rx`
    pub euler: Vec3,
    pub scale: Vec3,
}

impl NodeTransform {
    pub fn identity() -> Self {
        Self::decompose(&Mat4::IDENTITY)
    }

    /// Split an affine matrix into rows, translation, Euler angles and scale
    pub fn decompose(matrix: &Mat4) -> Self {
        let linear = matrix.linear();
        let translation = matrix.translation();

        let mut scale = Vec3::new(
            linear.column(0).length(),
            linear.column(1).length(),
            linear.column(2).length(),
        );
        if linear.determinant() < 0.0 {
            scale.x = -scale.x;
        }

        let axes = [Vec3::X, Vec3::Y, Vec3::Z];
        let factors = scale.to_array();
        let columns: Vec<Vec3> = (0..3)
            .map(|i| {
                if factors[i].abs() > f32::EPSILON {
                    linear.column(i).scale(1.0 / factors[i])
                } else {
                    axes[i]
                }
            })
            .collect();
        let rotation = Mat3::from_columns(columns[0], columns[1], columns[2]);

        let mut rows = [[0.0f32; 3]; 4];
        for (i, row) in rows.iter_mut().take(3).enumerate() {
            *row = linear.column(i).to_array();
        }
        rows[3] = translation.to_array();

        Self {
            matrix: *matrix,
            rows,
            translation,
            euler: matrix_to_euler(&rotation),
            scale,
        }
    }

    /// Rebuild a matrix from translation, Euler angles and scale
    pub fn compose(translation: Vec3, euler: Vec3, scale: Vec3) -> Mat4 {
        let linear = euler_to_matrix(euler).mul(&Mat3::from_diagonal(scale));
        Mat4::from_linear_translation(&linear, translation)
    }

    /// Matrix rebuilt from the decomposed parts
    pub fn recompose(&self) -> Mat4 {
        Self::compose(self.translation, self.euler, self.scale)
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Rotation matrix for XYZ Euler angles (`Rz·Ry·Rx`)
pub fn euler_to_matrix(euler: Vec3) -> Mat3 {
    let (sx, cx) = euler.x.sin_cos();
    let (sy, cy) = euler.y.sin_cos();
    let (sz, cz) = euler.z.sin_cos();

    Mat3::from_rows([
        [cy * cz, sx * sy * cz - cx * sz, cx * sy * cz + sx * sz],
        [cy * sz, sx * sy * sz + cx * cz, cx * sy * sz - sx * cz],
        [-sy, sx * cy, cx * cy],
    ])
}

/// XYZ Euler angles of a pure rotation; z is zero in gimbal lock
pub fn matrix_to_euler(rotation: &Mat3) -> Vec3 {
    let m = &rotation.m;
    let y = (-m[2][0]).clamp(-1.0, 1.0).asin();

    if m[2][0].abs() < 0.999_999 {
        Vec3::new(m[2][1].atan2(m[2][2]), y, m[1][0].atan2(m[0][0]))
    } else {
        Vec3::new((-m[1][2]).atan2(m[1][1]), y, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn sample_matrix() -> Mat4 {
        let linear = euler_to_matrix(Vec3::new(0.3, -0.7, 1.1)).mul(&Mat3::from_diagonal(Vec3::new(2.0, 1.0, 0.5)));
        Mat4::from_linear_translation(&linear, Vec3::new(4.0, -2.0, 7.5))
    }

    #[test]
    fn test_point_conversion_swaps_up_axis() {
        let conv = BasisConversion::new(CoordinateSystem::YUpLeftHanded, 1.0);
        assert_eq!(conv.convert_point(Vec3::new(1.0, 2.0, 3.0)), Vec3::new(1.0, 3.0, 2.0));
        assert!(conv.mirrors());

        let scaled = BasisConversion::new(CoordinateSystem::YUpLeftHanded, 2.0);
        assert_eq!(scaled.convert_point(Vec3::new(1.0, 2.0, 3.0)), Vec3::new(2.0, 6.0, 4.0));
        assert_eq!(scaled.convert_vector(Vec3::new(1.0, 2.0, 3.0)), Vec3::new(1.0, 3.0, 2.0));
    }

    #[test]
    fn test_right_handed_y_up_is_rotation() {
        let conv = BasisConversion::new(CoordinateSystem::YUpRightHanded, 1.0);
        assert!(!conv.mirrors());
        // Source forward (+Y) becomes -Z
        assert_eq!(conv.convert_point(Vec3::Y), Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(conv.convert_point(Vec3::Z), Vec3::Y);
    }

    #[test]
    fn test_matrix_round_trip() {
        for system in [
            CoordinateSystem::YUpLeftHanded,
            CoordinateSystem::YUpRightHanded,
            CoordinateSystem::ZUpRightHanded,
        ] {
            let conv = BasisConversion::new(system, 0.01);
            let m = sample_matrix();
            let back = conv.unconvert_matrix(&conv.convert_matrix(&m));
            assert!(back.approx_eq(&m, 1e-4), "{:?}", system);
        }
    }

    #[test]
    fn test_converted_matrix_agrees_with_converted_points() {
        let conv = BasisConversion::new(CoordinateSystem::YUpLeftHanded, 3.0);
        let m = sample_matrix();
        let p = Vec3::new(0.5, -1.5, 2.0);

        let lhs = conv.convert_matrix(&m).transform_point(conv.convert_point(p));
        let rhs = conv.convert_point(m.transform_point(p));
        assert!(lhs.approx_eq(&rhs, 1e-4));
    }

    #[test]
    fn test_z_rotation_becomes_y_rotation() {
        let conv = BasisConversion::new(CoordinateSystem::YUpLeftHanded, 1.0);
        let m = NodeTransform::compose(Vec3::ZERO, Vec3::new(0.0, 0.0, FRAC_PI_2), Vec3::ONE);
        let t = NodeTransform::decompose(&conv.convert_matrix(&m));

        assert!(t.euler.approx_eq(&Vec3::new(0.0, -FRAC_PI_2, 0.0), 1e-5));
        assert!(t.scale.approx_eq(&Vec3::ONE, 1e-6));
    }

    #[test]
    fn test_decompose_compose_round_trip() {
        let m = sample_matrix();
        let t = NodeTransform::decompose(&m);

        assert!(t.scale.approx_eq(&Vec3::new(2.0, 1.0, 0.5), 1e-5));
        assert!(t.euler.approx_eq(&Vec3::new(0.3, -0.7, 1.1), 1e-5));
        assert!(t.recompose().approx_eq(&m, 1e-5));
    }

    #[test]
    fn test_rows_are_transposed_linear() {
        let m = sample_matrix();
        let t = NodeTransform::decompose(&m);

        assert_eq!(t.rows[0], [m.m[0][0], m.m[1][0], m.m[2][0]]);
        assert_eq!(t.rows[3], [4.0, -2.0, 7.5]);
    }

    #[test]
    fn test_negative_scale_folds_into_x() {
        let m = NodeTransform::compose(Vec3::ZERO, Vec3::new(0.2, 0.1, -0.4), Vec3::new(-1.0, 2.0, 3.0));
        let t = NodeTransform::decompose(&m);

        assert!(t.scale.approx_eq(&Vec3::new(-1.0, 2.0, 3.0), 1e-5));
        assert!(t.recompose().approx_eq(&m, 1e-5));
    }

    #[test]
    fn test_gimbal_lock_recomposes() {
        let m = NodeTransform::compose(Vec3::ZERO, Vec3::new(0.4, FRAC_PI_2, 0.3), Vec3::ONE);
        let t = NodeTransform::decompose(&m);

        assert_eq!(t.euler.z, 0.0);
        assert!(t.recompose().approx_eq(&m, 1e-4));
    }

    #[test]
    fn test_camera_looks_down_target_z() {
        let conv = BasisConversion::new(CoordinateSystem::YUpLeftHanded, 1.0);
        // Identity camera looks straight down the source -Z
        let m = conv.convert_oriented(&Mat4::IDENTITY);

        assert!(m.transform_vector(Vec3::Z).approx_eq(&Vec3::new(0.0, -1.0, 0.0), 1e-6));
        assert!(m.linear().determinant() > 0.0);
    }

    #[test]
    fn test_coordinate_system_parse() {
        assert_eq!("yup-lh".parse::<CoordinateSystem>().unwrap(), CoordinateSystem::YUpLeftHanded);
        assert_eq!("ZUP-RH".parse::<CoordinateSystem>().unwrap(), CoordinateSystem::ZUpRightHanded);
        assert!("sideways".parse::<CoordinateSystem>().is_err());
        assert_eq!(CoordinateSystem::YUpRightHanded.to_string(), "yup-rh");
    }
}
