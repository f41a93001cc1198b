use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Mat3 = [[f64; 3]; 3];
pub type Vec3 = [f64; 3];

const AFFINE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoseError {
    #[error("pose contains non-finite entries")]
    NonFinite,
    #[error("pose bottom row must be [0, 0, 0, 1], got {0:?}")]
    NotAffine([f64; 4]),
    #[error("invalid pose descriptor: {0}")]
    Descriptor(String),
}

/// World-to-camera transform stored as a row-major 4x4 matrix `[R T; 0 0 0 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pose(pub [[f64; 4]; 4]);

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub fn identity() -> Self {
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self(m)
    }

    pub fn from_rt(rotation: &Mat3, translation: &Vec3) -> Self {
        let mut m = [[0.0; 4]; 4];
        for i in 0..3 {
            m[i][..3].copy_from_slice(&rotation[i]);
            m[i][3] = translation[i];
        }
        m[3][3] = 1.0;
        Self(m)
    }

    pub fn matrix(&self) -> &[[f64; 4]; 4] {
        &self.0
    }

    pub fn decompose(&self) -> Result<(Mat3, Vec3), PoseError> {
        if self.0.iter().flatten().any(|v| !v.is_finite()) {
            return Err(PoseError::NonFinite);
        }
        let bottom = self.0[3];
        let expected = [0.0, 0.0, 0.0, 1.0];
        if bottom
            .iter()
            .zip(expected.iter())
            .any(|(a, b)| (a - b).abs() > AFFINE_EPSILON)
        {
            return Err(PoseError::NotAffine(bottom));
        }

        let mut rotation = [[0.0; 3]; 3];
        let mut translation = [0.0; 3];
        for i in 0..3 {
            rotation[i].copy_from_slice(&self.0[i][..3]);
            translation[i] = self.0[i][3];
        }
        Ok((rotation, translation))
    }

    /// Matrix product `self * rhs`.
    pub fn compose(&self, rhs: &Pose) -> Pose {
        let mut out = [[0.0; 4]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.0[i][k] * rhs.0[k][j]).sum();
            }
        }
        Pose(out)
    }

    /// Camera position in world coordinates, `-Rᵀ T`.
    pub fn camera_center(&self) -> Result<Vec3, PoseError> {
        let (r, t) = self.decompose()?;
        let rt = transpose(&r);
        let c = mat_vec(&rt, &t);
        Ok([-c[0], -c[1], -c[2]])
    }

    /// Camera viewing direction (+z of the camera frame) in world coordinates.
    pub fn forward(&self) -> Result<Vec3, PoseError> {
        let (r, _) = self.decompose()?;
        Ok([r[2][0], r[2][1], r[2][2]])
    }

    pub fn approx_eq(&self, other: &Pose, epsilon: f64) -> bool {
        self.0
            .iter()
            .flatten()
            .zip(other.0.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

pub fn transpose(m: &Mat3) -> Mat3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in m.iter().enumerate() {
        for (j, v) in row.iter().enumerate() {
            out[j][i] = *v;
        }
    }
    out
}

pub fn mat_vec(m: &Mat3, v: &Vec3) -> Vec3 {
    let mut out = [0.0; 3];
    for (i, row) in m.iter().enumerate() {
        out[i] = row[0] * v[0] + row[1] * v[1] + row[2] * v[2];
    }
    out
}

pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn norm(v: &Vec3) -> f64 {
    dot(v, v).sqrt()
}

#[cfg(test)]
#[path = "tests/pose_tests.rs"]
mod tests;
