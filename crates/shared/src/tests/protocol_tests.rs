use super::*;
use crate::error::ErrorCode;

#[test]
fn key_control_uses_wire_field_names() {
    let raw = r#"{"event":"key_control","data":{"key":{"w":true,"a":false},"step":2}}"#;
    let event: ClientEvent = serde_json::from_str(raw).expect("parse");
    let ClientEvent::KeyControl(payload) = event else {
        panic!("expected key_control");
    };
    assert_eq!(payload.step, 2.0);
    assert_eq!(payload.key.get(&KeySymbol::from("w")), Some(&true));
    assert_eq!(payload.key.get(&KeySymbol::from("a")), Some(&false));
}

#[test]
fn set_user_data_accepts_null_payload() {
    let raw = r#"{"event":"set_user_data","data":null}"#;
    let event: ClientEvent = serde_json::from_str(raw).expect("parse");
    assert_eq!(event, ClientEvent::SetUserData(None));
}

#[test]
fn set_user_data_reads_camel_case_fields() {
    let raw = r#"{"event":"set_user_data","data":{"userName":"ada","modelIds":["m1","m2"]}}"#;
    let event: ClientEvent = serde_json::from_str(raw).expect("parse");
    let ClientEvent::SetUserData(Some(data)) = event else {
        panic!("expected user data");
    };
    assert_eq!(data.user_name.as_deref(), Some("ada"));
    assert_eq!(
        data.model_ids,
        Some(vec![ModelId::from("m1"), ModelId::from("m2")])
    );
}

#[test]
fn get_asset_pose_reads_selected_model_id_list() {
    let raw = r#"{"event":"get_asset_pose","data":{"selectedModelId":["m1"],"index":4}}"#;
    let event: ClientEvent = serde_json::from_str(raw).expect("parse");
    assert_eq!(
        event,
        ClientEvent::GetAssetPose(AssetPosePayload {
            selected_model_id: vec![ModelId::from("m1")],
            index: 4,
        })
    );
}

#[test]
fn nearest_images_event_is_named_nn_img() {
    let event = ServerEvent::NearestImages(NearestImages {
        model_id: ModelId::from("m1"),
        images: BTreeMap::from([("a.jpg".to_string(), "AAAA".to_string())]),
    });
    let json = serde_json::to_value(&event).expect("json");
    assert_eq!(json["event"], "nnImg");
    assert_eq!(json["data"]["modelId"], "m1");
    assert_eq!(json["data"]["images"]["a.jpg"], "AAAA");
}

#[test]
fn error_response_names_code_and_model() {
    let event = ServerEvent::Response(ResponsePayload::error(
        ApiError::new(ErrorCode::CollaboratorFailure, "render failed"),
        Some(ModelId::from("m2")),
    ));
    assert!(event.is_error());
    let json = serde_json::to_value(&event).expect("json");
    assert_eq!(json["event"], "response");
    assert_eq!(json["data"]["message"], "render failed");
    assert_eq!(json["data"]["modelId"], "m2");
    assert_eq!(json["data"]["error"]["code"], "collaborator_failure");
    assert!(json["data"].get("userName").is_none());
}
