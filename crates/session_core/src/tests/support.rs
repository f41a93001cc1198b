use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use render_gateway::{AssetPoseDescriptor, Model, ModelManager};
use shared::{
    domain::ModelId,
    pose::{Mat3, Pose, Vec3},
    protocol::FlightParams,
};
use tokio::sync::Notify;

pub(crate) fn translated(x: f64, y: f64, z: f64) -> Pose {
    Pose::from_rt(
        &[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        &[x, y, z],
    )
}

#[derive(Default)]
pub(crate) struct RenderGate {
    pub(crate) started: Notify,
    pub(crate) release: Notify,
}

pub(crate) struct FakeModel {
    id: ModelId,
    init: Pose,
    nearest: Vec<String>,
    thumbnails: HashMap<String, Vec<u8>>,
    fail_render: bool,
    gate: Option<Arc<RenderGate>>,
    rendered: StdMutex<Vec<Pose>>,
}

impl FakeModel {
    pub(crate) fn new(id: &str, init: Pose) -> Self {
        Self {
            id: ModelId::from(id),
            init,
            nearest: Vec::new(),
            thumbnails: HashMap::new(),
            fail_render: false,
            gate: None,
            rendered: StdMutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_thumbnails(mut self, files: &[&str]) -> Self {
        for file in files {
            self.nearest.push(file.to_string());
            self.thumbnails
                .insert(file.to_string(), format!("{}/{file}", self.id).into_bytes());
        }
        self
    }

    /// Ranks a file that has no thumbnail on disk.
    pub(crate) fn with_missing_thumbnail(mut self, file: &str) -> Self {
        self.nearest.push(file.to_string());
        self
    }

    pub(crate) fn failing_render(mut self) -> Self {
        self.fail_render = true;
        self
    }

    pub(crate) fn gated(mut self, gate: Arc<RenderGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn rendered_poses(&self) -> Vec<Pose> {
        self.rendered.lock().expect("rendered lock").clone()
    }
}

pub(crate) fn frame_bytes(model_id: &str, pose: &Pose) -> Vec<u8> {
    format!("{model_id}:{:?}", pose.0[2]).into_bytes()
}

#[async_trait]
impl Model for FakeModel {
    fn id(&self) -> &ModelId {
        &self.id
    }

    fn init_pose(&self) -> Pose {
        self.init
    }

    async fn init_image(&self) -> anyhow::Result<Vec<u8>> {
        Ok(format!("init-{}", self.id).into_bytes())
    }

    async fn render_image(&self, pose: &Pose) -> anyhow::Result<Vec<u8>> {
        if let Some(gate) = &self.gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }
        if self.fail_render {
            bail!("renderer offline");
        }
        self.rendered.lock().expect("rendered lock").push(*pose);
        Ok(frame_bytes(self.id.as_str(), pose))
    }

    fn nearest_images(&self, _pose: &Pose, n: usize) -> Vec<String> {
        self.nearest.iter().take(n).cloned().collect()
    }

    async fn load_thumbnail(&self, filename: &str) -> anyhow::Result<Vec<u8>> {
        self.thumbnails
            .get(filename)
            .cloned()
            .ok_or_else(|| anyhow!("thumbnail {filename} missing"))
    }

    fn flight_params(&self, _rotation: &Mat3, translation: &Vec3) -> FlightParams {
        FlightParams {
            altitude: translation[1],
            heading: translation[2],
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeGateway {
    models: HashMap<ModelId, Arc<FakeModel>>,
    assets: HashMap<(ModelId, usize), AssetPoseDescriptor>,
}

impl FakeGateway {
    pub(crate) fn with_model(mut self, model: FakeModel) -> Self {
        self.models.insert(model.id.clone(), Arc::new(model));
        self
    }

    pub(crate) fn with_asset(mut self, model_id: &str, index: usize, pose: &Pose) -> Self {
        let (r, t) = pose.decompose().expect("asset pose");
        self.assets.insert(
            (ModelId::from(model_id), index),
            AssetPoseDescriptor::from_rt(&r, &t),
        );
        self
    }

    pub(crate) fn with_raw_asset(
        mut self,
        model_id: &str,
        index: usize,
        descriptor: AssetPoseDescriptor,
    ) -> Self {
        self.assets.insert((ModelId::from(model_id), index), descriptor);
        self
    }

    pub(crate) fn fake(&self, model_id: &str) -> Arc<FakeModel> {
        Arc::clone(self.models.get(&ModelId::from(model_id)).expect("fake model"))
    }
}

#[async_trait]
impl ModelManager for FakeGateway {
    async fn get_model(&self, model_id: &ModelId) -> Option<Arc<dyn Model>> {
        self.models
            .get(model_id)
            .map(|model| Arc::clone(model) as Arc<dyn Model>)
    }

    async fn list_models(&self) -> Vec<ModelId> {
        let mut ids: Vec<ModelId> = self.models.keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn asset_pose(
        &self,
        model_id: &ModelId,
        index: usize,
    ) -> anyhow::Result<AssetPoseDescriptor> {
        self.assets
            .get(&(model_id.clone(), index))
            .cloned()
            .ok_or_else(|| anyhow!("no asset {index} for {model_id}"))
    }
}
