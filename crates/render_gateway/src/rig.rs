use shared::{
    domain::MotionCommand,
    pose::{mat_vec, transpose, Mat3, Pose, Vec3},
};
use tracing::debug;

use crate::CameraRig;

const IDENTITY: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
const ZERO: Vec3 = [0.0, 0.0, 0.0];

/// Keyboard camera bindings. Camera frame is x right, y down, z forward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyboardRig {
    pub translate_per_step: f64,
    pub rotate_deg_per_step: f64,
}

impl Default for KeyboardRig {
    fn default() -> Self {
        Self {
            translate_per_step: 0.1,
            rotate_deg_per_step: 2.0,
        }
    }
}

impl KeyboardRig {
    pub fn new(translate_per_step: f64, rotate_deg_per_step: f64) -> Self {
        Self {
            translate_per_step,
            rotate_deg_per_step,
        }
    }

    // Placement of the moved camera expressed in the current camera frame.
    fn local_delta(&self, command: &MotionCommand) -> Option<(Mat3, Vec3)> {
        let d = self.translate_per_step * command.step;
        let angle = (self.rotate_deg_per_step * command.step).to_radians();
        let delta = match command.key.as_str() {
            "w" => (IDENTITY, [0.0, 0.0, d]),
            "s" => (IDENTITY, [0.0, 0.0, -d]),
            "a" => (IDENTITY, [-d, 0.0, 0.0]),
            "d" => (IDENTITY, [d, 0.0, 0.0]),
            "r" => (IDENTITY, [0.0, -d, 0.0]),
            "f" => (IDENTITY, [0.0, d, 0.0]),
            "ArrowLeft" => (rot_y(-angle), ZERO),
            "ArrowRight" => (rot_y(angle), ZERO),
            "ArrowUp" => (rot_x(angle), ZERO),
            "ArrowDown" => (rot_x(-angle), ZERO),
            "q" => (rot_z(-angle), ZERO),
            "e" => (rot_z(angle), ZERO),
            _ => return None,
        };
        Some(delta)
    }
}

impl CameraRig for KeyboardRig {
    fn apply(&self, pose: &Pose, command: &MotionCommand) -> Pose {
        let Some((rotation, translation)) = self.local_delta(command) else {
            debug!(key = %command.key, "no camera binding for key");
            return *pose;
        };
        let inverse_rotation = transpose(&rotation);
        let moved = mat_vec(&inverse_rotation, &translation);
        let inverse = Pose::from_rt(&inverse_rotation, &[-moved[0], -moved[1], -moved[2]]);
        inverse.compose(pose)
    }
}

fn rot_x(a: f64) -> Mat3 {
    let (s, c) = a.sin_cos();
    [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]]
}

fn rot_y(a: f64) -> Mat3 {
    let (s, c) = a.sin_cos();
    [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]]
}

fn rot_z(a: f64) -> Mat3 {
    let (s, c) = a.sin_cos();
    [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]]
}

#[cfg(test)]
#[path = "tests/rig_tests.rs"]
mod tests;
