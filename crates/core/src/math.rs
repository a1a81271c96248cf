use serde::{Deserialize, Serialize};

use crate::rotation;

/// Externally facing 3-component vector (translation, XYZ rotation in
/// degrees, scale).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3d {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn from_array(a: [f64; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps
            && (self.y - other.y).abs() <= eps
            && (self.z - other.z).abs() <= eps
    }

    fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl From<[f64; 3]> for Vector3d {
    fn from(a: [f64; 3]) -> Self {
        Self::from_array(a)
    }
}

/// Row-major 4x4 matrix using the row-vector convention: translation lives
/// in the last row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix4d(pub [[f64; 4]; 4]);

impl Default for Matrix4d {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix4d {
    pub const IDENTITY: Self = Self([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    /// Compose scale, then XYZ rotation (degrees), then translation.
    pub fn from_trs(translation: Vector3d, rotation_xyz: Vector3d, scale: Vector3d) -> Self {
        // Column-vector rotation, transposed into row-vector layout.
        let r = rotation::matrix_from_xyz(rotation_xyz);
        let s = scale.to_array();
        let mut m = Self::IDENTITY.0;
        for (row, s_row) in s.iter().enumerate() {
            for col in 0..3 {
                m[row][col] = s_row * r[col][row];
            }
        }
        m[3][0] = translation.x;
        m[3][1] = translation.y;
        m[3][2] = translation.z;
        Self(m)
    }

    /// Split into translation, XYZ rotation (degrees) and scale. Shear is
    /// discarded.
    pub fn decompose_trs(&self) -> (Vector3d, Vector3d, Vector3d) {
        let m = &self.0;
        let translation = Vector3d::new(m[3][0], m[3][1], m[3][2]);

        let rows: [Vector3d; 3] =
            std::array::from_fn(|i| Vector3d::new(m[i][0], m[i][1], m[i][2]));
        let scale = Vector3d::new(rows[0].length(), rows[1].length(), rows[2].length());

        let mut r = [[0.0; 3]; 3];
        for (i, row) in rows.iter().enumerate() {
            let len = row.length();
            let n = if len > f64::EPSILON {
                row.to_array().map(|c| c / len)
            } else {
                let mut unit = [0.0; 3];
                unit[i] = 1.0;
                unit
            };
            // Back to column-vector layout.
            for col in 0..3 {
                r[col][i] = n[col];
            }
        }

        (translation, rotation::xyz_from_matrix(&r), scale)
    }
}
