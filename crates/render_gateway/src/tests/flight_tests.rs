use super::*;
use crate::{rig::KeyboardRig, CameraRig};
use shared::{
    domain::{KeySymbol, MotionCommand},
    pose::Pose,
};

const IDENTITY: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

#[test]
fn altitude_follows_up_axis_with_scale_and_offset() {
    let frame = FlightFrame {
        altitude_scale: 10.0,
        altitude_offset: 100.0,
        ..FlightFrame::default()
    };
    // Camera center at y = -2, which is 2 units above the origin for up = -y.
    let params = frame.flight_params(&IDENTITY, &[0.0, 2.0, 0.0]);
    assert!((params.altitude - 120.0).abs() < 1e-9);
}

#[test]
fn looking_north_has_zero_heading() {
    let params = FlightFrame::default().flight_params(&IDENTITY, &[0.0, 0.0, 0.0]);
    assert!(params.heading.abs() < 1e-9);
}

#[test]
fn turning_right_increases_heading() {
    let rig = KeyboardRig::new(0.1, 90.0);
    let pose = rig.apply(
        &Pose::identity(),
        &MotionCommand {
            key: KeySymbol::from("ArrowRight"),
            step: 1.0,
        },
    );
    let (r, t) = pose.decompose().expect("decompose");
    let params = FlightFrame::default().flight_params(&r, &t);
    assert!((params.heading - 90.0).abs() < 1e-6, "heading {}", params.heading);
}

#[test]
fn looking_straight_down_reports_zero_heading() {
    // Forward row points along up.
    let rotation = [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, -1.0, 0.0]];
    let params = FlightFrame::default().flight_params(&rotation, &[0.0, 0.0, 0.0]);
    assert_eq!(params.heading, 0.0);
}
