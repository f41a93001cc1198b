use serde::{Deserialize, Serialize};
use shared::pose::{Mat3, Pose, PoseError, Vec3};

/// Stored asset camera placement. Both fields hold JSON-encoded arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetPoseDescriptor {
    #[serde(rename = "R_mat")]
    pub r_mat: String,
    #[serde(rename = "T_vec")]
    pub t_vec: String,
}

impl AssetPoseDescriptor {
    pub fn from_rt(rotation: &Mat3, translation: &Vec3) -> Self {
        Self {
            r_mat: format!("{rotation:?}"),
            t_vec: format!("{translation:?}"),
        }
    }

    pub fn decode(&self) -> Result<Pose, PoseError> {
        let rotation: Mat3 = serde_json::from_str(self.r_mat.trim())
            .map_err(|e| PoseError::Descriptor(format!("R_mat: {e}")))?;
        let translation = parse_translation(&self.t_vec)?;
        let pose = Pose::from_rt(&rotation, &translation);
        pose.decompose()?;
        Ok(pose)
    }
}

// Column vectors ([[x],[y],[z]]) are accepted alongside flat ones.
fn parse_translation(raw: &str) -> Result<Vec3, PoseError> {
    let raw = raw.trim();
    if let Ok(flat) = serde_json::from_str::<Vec3>(raw) {
        return Ok(flat);
    }
    let column: [[f64; 1]; 3] = serde_json::from_str(raw)
        .map_err(|e| PoseError::Descriptor(format!("T_vec: {e}")))?;
    Ok([column[0][0], column[1][0], column[2][0]])
}

#[cfg(test)]
#[path = "tests/descriptor_tests.rs"]
mod tests;
