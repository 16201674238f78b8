use serde::{Deserialize, Serialize};

const AXIS_EPSILON: f64 = 1e-12;

/// Rigid placement of an object: a rotation about an axis through the
/// origin, followed by a translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Placement {
    pub position: [f64; 3],
    pub axis: [f64; 3],
    /// Rotation angle in degrees.
    pub angle: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            axis: [0.0, 0.0, 1.0],
            angle: 0.0,
        }
    }
}

impl Placement {
    pub fn translation(position: [f64; 3]) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn new(position: [f64; 3], axis: [f64; 3], angle: f64) -> Self {
        Self {
            position,
            axis,
            angle,
        }
    }

    /// Normalized rotation axis and angle in radians, or `None` when the
    /// placement does not rotate (zero angle or degenerate axis).
    pub fn rotation(&self) -> Option<([f64; 3], f64)> {
        let len = norm(self.axis);
        if len < AXIS_EPSILON || self.angle == 0.0 {
            return None;
        }
        let axis = [self.axis[0] / len, self.axis[1] / len, self.axis[2] / len];
        Some((axis, self.angle.to_radians()))
    }

    pub fn is_identity(&self) -> bool {
        self.rotation().is_none() && self.position == [0.0; 3]
    }

    pub fn to_transform(&self) -> Transform {
        let rotation = match self.rotation() {
            Some((axis, angle)) => Transform::rotation(axis, angle),
            None => Transform::identity(),
        };
        rotation.then(&Transform::translation(self.position))
    }

    /// Maps a point through rotation then translation.
    pub fn apply(&self, point: [f64; 3]) -> [f64; 3] {
        self.to_transform().apply_point(point)
    }
}

/// Affine transform stored as the top three rows of a 4x4 matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub rows: [[f64; 4]; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            rows: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
        }
    }

    pub fn translation(v: [f64; 3]) -> Self {
        let mut t = Self::identity();
        for (i, row) in t.rows.iter_mut().enumerate() {
            row[3] = v[i];
        }
        t
    }

    /// Rotation by `angle` radians about the unit `axis` through the origin.
    pub fn rotation(axis: [f64; 3], angle: f64) -> Self {
        let [x, y, z] = axis;
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        Self {
            rows: [
                [c + x * x * t, x * y * t - z * s, x * z * t + y * s, 0.0],
                [y * x * t + z * s, c + y * y * t, y * z * t - x * s, 0.0],
                [z * x * t - y * s, z * y * t + x * s, c + z * z * t, 0.0],
            ],
        }
    }

    /// `self` applied first, then `next`.
    pub fn then(&self, next: &Transform) -> Transform {
        let a = &next.rows;
        let b = &self.rows;
        let mut rows = [[0.0; 4]; 3];
        for i in 0..3 {
            for j in 0..4 {
                let mut acc = 0.0;
                for k in 0..3 {
                    acc += a[i][k] * b[k][j];
                }
                if j == 3 {
                    acc += a[i][3];
                }
                rows[i][j] = acc;
            }
        }
        Transform { rows }
    }

    pub fn apply_point(&self, p: [f64; 3]) -> [f64; 3] {
        let r = &self.rows;
        [
            r[0][0] * p[0] + r[0][1] * p[1] + r[0][2] * p[2] + r[0][3],
            r[1][0] * p[0] + r[1][1] * p[1] + r[1][2] * p[2] + r[1][3],
            r[2][0] * p[0] + r[2][1] * p[1] + r[2][2] * p[2] + r[2][3],
        ]
    }

    /// Applies the linear part only (directions and normals of rigid motions).
    pub fn apply_vector(&self, v: [f64; 3]) -> [f64; 3] {
        let r = &self.rows;
        [
            r[0][0] * v[0] + r[0][1] * v[1] + r[0][2] * v[2],
            r[1][0] * v[0] + r[1][1] * v[1] + r[1][2] * v[2],
            r[2][0] * v[0] + r[2][1] * v[1] + r[2][2] * v[2],
        ]
    }
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}
