use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::{
    domain::ModelId,
    pose::{norm, sub, Mat3, Pose, Vec3},
    protocol::FlightParams,
};
use tracing::{debug, info, warn};

use crate::{
    descriptor::AssetPoseDescriptor,
    flight::FlightFrame,
    renderer::{CameraIntrinsics, FrameRenderer},
    Model, ModelManager,
};

pub const MODEL_CONFIG_FILE: &str = "model.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub init_pose: Pose,
    #[serde(default)]
    pub init_image: Option<String>,
    #[serde(default = "default_thumbnails_dir")]
    pub thumbnails_dir: String,
    #[serde(default = "default_images_file")]
    pub images_file: String,
    #[serde(default = "default_assets_file")]
    pub assets_file: String,
    #[serde(default)]
    pub flight: FlightFrame,
}

fn default_thumbnails_dir() -> String {
    "thumbnails".into()
}

fn default_images_file() -> String {
    "images.json".into()
}

fn default_assets_file() -> String {
    "assets.json".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub file: String,
    pub pose: Pose,
}

#[derive(Debug, Clone)]
struct ReferencePoint {
    file: String,
    center: Vec3,
}

pub struct CatalogModel {
    id: ModelId,
    root: PathBuf,
    config: ModelConfig,
    references: Vec<ReferencePoint>,
    assets: Vec<AssetPoseDescriptor>,
    renderer: Arc<dyn FrameRenderer>,
    camera: CameraIntrinsics,
}

impl CatalogModel {
    pub fn load(
        id: ModelId,
        root: &Path,
        renderer: Arc<dyn FrameRenderer>,
        camera: CameraIntrinsics,
    ) -> anyhow::Result<Self> {
        let config_path = root.join(MODEL_CONFIG_FILE);
        let raw = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read '{}'", config_path.display()))?;
        let config: ModelConfig = toml::from_str(&raw)
            .with_context(|| format!("invalid model config '{}'", config_path.display()))?;
        config
            .init_pose
            .decompose()
            .with_context(|| format!("model {id} has an unusable init_pose"))?;

        let images: Vec<ReferenceImage> = read_json_list(&root.join(&config.images_file))?;
        let references = images
            .into_iter()
            .filter_map(|image| match image.pose.camera_center() {
                Ok(center) => Some(ReferencePoint {
                    file: image.file,
                    center,
                }),
                Err(error) => {
                    warn!(model_id = %id, file = %image.file, %error, "skipping reference image");
                    None
                }
            })
            .collect();
        let assets = read_json_list(&root.join(&config.assets_file))?;

        Ok(Self {
            id,
            root: root.to_path_buf(),
            config,
            references,
            assets,
            renderer,
            camera,
        })
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    pub fn asset(&self, index: usize) -> Option<&AssetPoseDescriptor> {
        self.assets.get(index)
    }

    fn thumbnail_path(&self, filename: &str) -> anyhow::Result<PathBuf> {
        let filename = filename.trim();
        if filename.is_empty() {
            bail!("thumbnail name cannot be empty");
        }
        if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            bail!("thumbnail name '{filename}' must not contain path separators");
        }
        Ok(self.root.join(&self.config.thumbnails_dir).join(filename))
    }
}

fn read_json_list<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    if !path.exists() {
        debug!(path = %path.display(), "optional catalog file missing");
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid json in '{}'", path.display()))
}

#[async_trait]
impl Model for CatalogModel {
    fn id(&self) -> &ModelId {
        &self.id
    }

    fn init_pose(&self) -> Pose {
        self.config.init_pose
    }

    async fn init_image(&self) -> anyhow::Result<Vec<u8>> {
        match &self.config.init_image {
            Some(file) => {
                let path = self.root.join(file);
                tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read init image '{}'", path.display()))
            }
            None => self.render_image(&self.config.init_pose).await,
        }
    }

    async fn render_image(&self, pose: &Pose) -> anyhow::Result<Vec<u8>> {
        self.renderer.render(&self.id, pose, &self.camera).await
    }

    fn nearest_images(&self, pose: &Pose, n: usize) -> Vec<String> {
        let center = match pose.camera_center() {
            Ok(center) => center,
            Err(error) => {
                warn!(model_id = %self.id, %error, "cannot rank reference images");
                return Vec::new();
            }
        };
        let mut ranked: Vec<(f64, &str)> = self
            .references
            .iter()
            .map(|r| (norm(&sub(&r.center, &center)), r.file.as_str()))
            .collect();
        ranked.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });
        ranked
            .into_iter()
            .take(n)
            .map(|(_, file)| file.to_string())
            .collect()
    }

    async fn load_thumbnail(&self, filename: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.thumbnail_path(filename)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read thumbnail '{}'", path.display()))
    }

    fn flight_params(&self, rotation: &Mat3, translation: &Vec3) -> FlightParams {
        self.config.flight.flight_params(rotation, translation)
    }
}

/// Directory-backed model manager: one `<model_id>/model.toml` per model.
pub struct ModelCatalog {
    models: BTreeMap<ModelId, Arc<CatalogModel>>,
}

impl ModelCatalog {
    pub fn load(
        dir: &Path,
        renderer: Arc<dyn FrameRenderer>,
        camera: CameraIntrinsics,
    ) -> anyhow::Result<Self> {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("failed to list catalog '{}'", dir.display()))?;

        let mut models = BTreeMap::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.join(MODEL_CONFIG_FILE).exists() {
                warn!(path = %path.display(), "skipping directory without model.toml");
                continue;
            }
            let id = ModelId::new(name);
            let model = CatalogModel::load(id.clone(), &path, Arc::clone(&renderer), camera)?;
            info!(
                model_id = %id,
                references = model.reference_count(),
                assets = model.asset_count(),
                "loaded model"
            );
            models.insert(id, Arc::new(model));
        }

        Ok(Self { models })
    }

    pub fn model(&self, model_id: &ModelId) -> Option<Arc<CatalogModel>> {
        self.models.get(model_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[async_trait]
impl ModelManager for ModelCatalog {
    async fn get_model(&self, model_id: &ModelId) -> Option<Arc<dyn Model>> {
        self.models
            .get(model_id)
            .map(|model| Arc::clone(model) as Arc<dyn Model>)
    }

    async fn list_models(&self) -> Vec<ModelId> {
        self.models.keys().cloned().collect()
    }

    async fn asset_pose(
        &self,
        model_id: &ModelId,
        index: usize,
    ) -> anyhow::Result<AssetPoseDescriptor> {
        let model = self
            .models
            .get(model_id)
            .ok_or_else(|| anyhow!("unknown model {model_id}"))?;
        model.asset(index).cloned().ok_or_else(|| {
            anyhow!(
                "asset index {index} out of range for model {model_id} ({} assets)",
                model.asset_count()
            )
        })
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
