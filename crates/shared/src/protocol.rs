use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    domain::{KeySymbol, ModelId},
    error::ApiError,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_ids: Option<Vec<ModelId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyControlPayload {
    pub key: BTreeMap<KeySymbol, bool>,
    pub step: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPosePayload {
    pub selected_model_id: Vec<ModelId>,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    SetUserData(Option<UserData>),
    GetInitImage(ModelId),
    ResetPose(ModelId),
    KeyControl(KeyControlPayload),
    GetAssetPose(AssetPosePayload),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::SetUserData(_) => "set_user_data",
            ClientEvent::GetInitImage(_) => "get_init_image",
            ClientEvent::ResetPose(_) => "reset_pose",
            ClientEvent::KeyControl(_) => "key_control",
            ClientEvent::GetAssetPose(_) => "get_asset_pose",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_ids: Option<Vec<ModelId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<ModelId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl ResponsePayload {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn error(error: ApiError, model_id: Option<ModelId>) -> Self {
        Self {
            message: error.message.clone(),
            model_id,
            error: Some(error),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFrame {
    pub model_id: ModelId,
    pub image: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlightParams {
    pub altitude: f64,
    pub heading: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestImages {
    pub model_id: ModelId,
    pub images: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "response")]
    Response(ResponsePayload),
    #[serde(rename = "set_client_init_image")]
    SetClientInitImage(ImageFrame),
    #[serde(rename = "set_client_main_image")]
    SetClientMainImage(ImageFrame),
    #[serde(rename = "flight_params")]
    FlightParams(FlightParams),
    #[serde(rename = "nnImg")]
    NearestImages(NearestImages),
}

impl ServerEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, ServerEvent::Response(ResponsePayload { error: Some(_), .. }))
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
