use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{domain::ModelId, pose::Pose};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub width: u32,
    pub height: u32,
    pub fov_x: f64,
    pub fov_y: f64,
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 1000,
            fov_x: 1.4261863218,
            fov_y: 1.261863218,
        }
    }
}

#[async_trait]
pub trait FrameRenderer: Send + Sync {
    async fn render(
        &self,
        model_id: &ModelId,
        pose: &Pose,
        camera: &CameraIntrinsics,
    ) -> anyhow::Result<Vec<u8>>;
}

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    model_id: &'a ModelId,
    pose: &'a Pose,
    #[serde(flatten)]
    camera: &'a CameraIntrinsics,
}

/// Client for a renderer service exposing `POST /render`.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    http: Client,
    render_url: Url,
}

impl HttpRenderer {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut base = Url::parse(base_url)
            .with_context(|| format!("invalid renderer url '{base_url}'"))?;
        // Without a trailing slash `join` would replace the last path segment.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let render_url = base
            .join("render")
            .with_context(|| format!("cannot derive render endpoint from '{base_url}'"))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build renderer http client")?;
        Ok(Self { http, render_url })
    }

    pub fn render_url(&self) -> &Url {
        &self.render_url
    }
}

#[async_trait]
impl FrameRenderer for HttpRenderer {
    async fn render(
        &self,
        model_id: &ModelId,
        pose: &Pose,
        camera: &CameraIntrinsics,
    ) -> anyhow::Result<Vec<u8>> {
        let response = self
            .http
            .post(self.render_url.clone())
            .json(&RenderRequest {
                model_id,
                pose,
                camera,
            })
            .send()
            .await
            .with_context(|| format!("render request for model {model_id} failed"))?
            .error_for_status()
            .with_context(|| format!("renderer rejected model {model_id}"))?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
#[path = "tests/renderer_tests.rs"]
mod tests;
