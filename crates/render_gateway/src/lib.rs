use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{ModelId, MotionCommand},
    pose::{Mat3, Pose, Vec3},
    protocol::FlightParams,
};

pub mod catalog;
pub mod descriptor;
pub mod flight;
pub mod renderer;
pub mod rig;

pub use catalog::ModelCatalog;
pub use descriptor::AssetPoseDescriptor;
pub use renderer::{CameraIntrinsics, FrameRenderer, HttpRenderer};
pub use rig::KeyboardRig;

#[async_trait]
pub trait Model: Send + Sync {
    fn id(&self) -> &ModelId;
    fn init_pose(&self) -> Pose;
    async fn init_image(&self) -> anyhow::Result<Vec<u8>>;
    async fn render_image(&self, pose: &Pose) -> anyhow::Result<Vec<u8>>;
    fn nearest_images(&self, pose: &Pose, n: usize) -> Vec<String>;
    async fn load_thumbnail(&self, filename: &str) -> anyhow::Result<Vec<u8>>;
    fn flight_params(&self, rotation: &Mat3, translation: &Vec3) -> FlightParams;
}

#[async_trait]
pub trait ModelManager: Send + Sync {
    async fn get_model(&self, model_id: &ModelId) -> Option<Arc<dyn Model>>;
    async fn list_models(&self) -> Vec<ModelId>;
    async fn asset_pose(
        &self,
        model_id: &ModelId,
        index: usize,
    ) -> anyhow::Result<AssetPoseDescriptor>;
}

/// Camera-motion primitive: computes the pose reached by applying one command.
pub trait CameraRig: Send + Sync {
    fn apply(&self, pose: &Pose, command: &MotionCommand) -> Pose;
}
