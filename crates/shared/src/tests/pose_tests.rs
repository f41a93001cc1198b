use super::*;

fn translated(x: f64, y: f64, z: f64) -> Pose {
    let mut pose = Pose::identity();
    pose.0[0][3] = x;
    pose.0[1][3] = y;
    pose.0[2][3] = z;
    pose
}

#[test]
fn decompose_round_trips_rotation_and_translation() {
    let rotation = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
    let translation = [1.0, 2.0, 3.0];
    let pose = Pose::from_rt(&rotation, &translation);

    let (r, t) = pose.decompose().expect("decompose");
    assert_eq!(r, rotation);
    assert_eq!(t, translation);
}

#[test]
fn decompose_rejects_projective_bottom_row() {
    let mut pose = Pose::identity();
    pose.0[3][2] = 0.5;
    assert!(matches!(pose.decompose(), Err(PoseError::NotAffine(_))));
}

#[test]
fn decompose_rejects_nan() {
    let mut pose = Pose::identity();
    pose.0[1][1] = f64::NAN;
    assert_eq!(pose.decompose(), Err(PoseError::NonFinite));
}

#[test]
fn camera_center_inverts_world_to_camera_translation() {
    let pose = translated(0.0, 0.0, -5.0);
    let center = pose.camera_center().expect("center");
    assert_eq!(center, [0.0, 0.0, 5.0]);
}

#[test]
fn compose_with_identity_is_noop() {
    let pose = translated(1.0, -2.0, 0.5);
    assert_eq!(Pose::identity().compose(&pose), pose);
    assert_eq!(pose.compose(&Pose::identity()), pose);
}

#[test]
fn pose_serializes_as_nested_rows() {
    let json = serde_json::to_value(Pose::identity()).expect("json");
    assert_eq!(json[0], serde_json::json!([1.0, 0.0, 0.0, 0.0]));
    assert_eq!(json[3], serde_json::json!([0.0, 0.0, 0.0, 1.0]));
}
