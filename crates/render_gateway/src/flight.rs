use serde::{Deserialize, Serialize};
use shared::{
    pose::{cross, dot, mat_vec, norm, sub, transpose, Mat3, Vec3},
    protocol::FlightParams,
};

const DEGENERATE_EPSILON: f64 = 1e-9;

/// Ground reference frame used to turn a camera pose into altitude and heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightFrame {
    pub origin: Vec3,
    pub up: Vec3,
    pub north: Vec3,
    pub altitude_scale: f64,
    pub altitude_offset: f64,
}

impl Default for FlightFrame {
    fn default() -> Self {
        Self {
            origin: [0.0, 0.0, 0.0],
            up: [0.0, -1.0, 0.0],
            north: [0.0, 0.0, 1.0],
            altitude_scale: 1.0,
            altitude_offset: 0.0,
        }
    }
}

impl FlightFrame {
    pub fn flight_params(&self, rotation: &Mat3, translation: &Vec3) -> FlightParams {
        let up = normalized(&self.up).unwrap_or([0.0, -1.0, 0.0]);

        let rt = transpose(rotation);
        let c = mat_vec(&rt, translation);
        let center = [-c[0], -c[1], -c[2]];
        let altitude = dot(&sub(&center, &self.origin), &up) * self.altitude_scale
            + self.altitude_offset;

        let forward = rotation[2];
        let heading = match (
            normalized(&project_onto_ground(&forward, &up)),
            normalized(&project_onto_ground(&self.north, &up)),
        ) {
            (Some(f), Some(north)) => {
                let east = cross(&north, &up);
                let degrees = dot(&f, &east).atan2(dot(&f, &north)).to_degrees();
                degrees.rem_euclid(360.0)
            }
            _ => 0.0,
        };

        FlightParams { altitude, heading }
    }
}

fn project_onto_ground(v: &Vec3, up: &Vec3) -> Vec3 {
    let along = dot(v, up);
    [v[0] - along * up[0], v[1] - along * up[1], v[2] - along * up[2]]
}

fn normalized(v: &Vec3) -> Option<Vec3> {
    let length = norm(v);
    if length < DEGENERATE_EPSILON {
        return None;
    }
    Some([v[0] / length, v[1] / length, v[2] / length])
}

#[cfg(test)]
#[path = "tests/flight_tests.rs"]
mod tests;
