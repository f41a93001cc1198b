use std::{collections::BTreeMap, sync::Arc};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::join_all;
use render_gateway::{CameraRig, Model, ModelManager};
use shared::{
    domain::{ConnectionId, ModelId, MotionCommand},
    error::ApiError,
    pose::Pose,
    protocol::{
        AssetPosePayload, ClientEvent, ImageFrame, KeyControlPayload, NearestImages,
        ResponsePayload, ServerEvent, UserData,
    },
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    error::SessionError,
    keys::{self, KeyIntent},
    session::{Session, SessionManager, SessionState},
};

pub const NEAREST_IMAGE_COUNT: usize = 3;

/// Outbound half of one connection.
#[derive(Debug, Clone)]
pub struct Outbox {
    conn: ConnectionId,
    tx: mpsc::Sender<ServerEvent>,
}

impl Outbox {
    pub fn new(conn: ConnectionId, tx: mpsc::Sender<ServerEvent>) -> Self {
        Self { conn, tx }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.conn
    }
}

pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub struct EventDispatcher {
    sessions: Arc<SessionManager>,
    gateway: Arc<dyn ModelManager>,
    rig: Arc<dyn CameraRig>,
    nearest_count: usize,
}

impl EventDispatcher {
    pub fn new(gateway: Arc<dyn ModelManager>, rig: Arc<dyn CameraRig>) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new(Arc::clone(&gateway))),
            gateway,
            rig,
            nearest_count: NEAREST_IMAGE_COUNT,
        }
    }

    pub fn with_nearest_count(mut self, nearest_count: usize) -> Self {
        self.nearest_count = nearest_count;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn gateway(&self) -> &Arc<dyn ModelManager> {
        &self.gateway
    }

    pub async fn connect(&self, outbox: &Outbox) -> Result<(), SessionError> {
        self.sessions.on_connect(outbox.conn)?;
        self.emit(
            outbox,
            ServerEvent::Response(ResponsePayload::message("Connected to server")),
        )
        .await;
        Ok(())
    }

    pub fn disconnect(&self, conn: ConnectionId) {
        if !self.sessions.on_disconnect(conn) {
            debug!(%conn, "disconnect for unknown session ignored");
        }
    }

    pub async fn dispatch(&self, outbox: &Outbox, event: ClientEvent) {
        let conn = outbox.conn;
        let name = event.name();
        debug!(%conn, event = name, "dispatching event");

        let result = match event {
            ClientEvent::SetUserData(data) => self.set_user_data(outbox, data).await,
            ClientEvent::GetInitImage(model_id) => self.get_init_image(outbox, model_id).await,
            ClientEvent::ResetPose(model_id) => self.reset_pose(outbox, model_id).await,
            ClientEvent::KeyControl(payload) => self.key_control(outbox, payload).await,
            ClientEvent::GetAssetPose(payload) => self.get_asset_pose(outbox, payload).await,
        };

        if let Err(err) = result {
            warn!(%conn, event = name, error = %err, "event rejected");
            self.emit_error(outbox, &err).await;
        }
    }

    /// Reports an inbound frame that could not be decoded into an event.
    pub async fn reject_frame(&self, outbox: &Outbox, reason: impl Into<String>) {
        let err = SessionError::InvalidPayload(reason.into());
        warn!(conn = %outbox.conn, error = %err, "malformed frame");
        self.emit_error(outbox, &err).await;
    }

    async fn set_user_data(
        &self,
        outbox: &Outbox,
        data: Option<UserData>,
    ) -> Result<(), SessionError> {
        let Some(UserData {
            user_name,
            model_ids,
        }) = data
        else {
            return Err(SessionError::InvalidPayload("Data is None".into()));
        };
        let conn = outbox.conn;
        let rebind = model_ids.as_ref().is_some_and(|ids| !ids.is_empty());

        self.sessions
            .set_identity(conn, user_name.clone(), model_ids)
            .await?;
        if let Some(name) = user_name {
            info!(%conn, user_name = %name, "user identified");
            self.emit(
                outbox,
                ServerEvent::Response(ResponsePayload {
                    user_name: Some(name),
                    ..ResponsePayload::message("Setting User Name")
                }),
            )
            .await;
        }

        if rebind {
            let bound = self.sessions.bind_models(conn).await?;
            self.emit(
                outbox,
                ServerEvent::Response(ResponsePayload {
                    model_ids: Some(bound),
                    ..ResponsePayload::message("Models bound")
                }),
            )
            .await;
        }
        Ok(())
    }

    async fn get_init_image(&self, outbox: &Outbox, model_id: ModelId) -> Result<(), SessionError> {
        self.sessions.session(outbox.conn)?;
        let model = self.model(&model_id).await?;
        let bytes = model
            .init_image()
            .await
            .map_err(|e| SessionError::collaborator(&model_id, e))?;
        self.emit(
            outbox,
            ServerEvent::SetClientInitImage(ImageFrame {
                model_id,
                image: encode_image(&bytes),
            }),
        )
        .await;
        Ok(())
    }

    async fn reset_pose(&self, outbox: &Outbox, model_id: ModelId) -> Result<(), SessionError> {
        self.sessions.reset_pose(outbox.conn, &model_id).await?;
        info!(conn = %outbox.conn, %model_id, "pose reset");
        self.emit(
            outbox,
            ServerEvent::Response(ResponsePayload {
                model_id: Some(model_id),
                ..ResponsePayload::message("Pose reset")
            }),
        )
        .await;
        Ok(())
    }

    async fn key_control(
        &self,
        outbox: &Outbox,
        payload: KeyControlPayload,
    ) -> Result<(), SessionError> {
        let KeyControlPayload { key, step } = payload;
        if !step.is_finite() || step <= 0.0 {
            return Err(SessionError::InvalidPayload(format!(
                "step must be a positive number, got {step}"
            )));
        }

        let handle = self.sessions.session(outbox.conn)?;
        let mut session = handle.lock().await;
        if session.state() != SessionState::ModelsBound {
            return Err(SessionError::NoModelsBound);
        }
        let driver = session
            .driver_model()
            .cloned()
            .ok_or(SessionError::NoModelsBound)?;

        match keys::interpret(&key, step) {
            KeyIntent::NearestImages => {
                self.send_nearest_images(outbox, &session).await;
                Ok(())
            }
            KeyIntent::Motion(commands) => {
                if !commands.is_empty() {
                    self.move_and_render(outbox, &mut session, &driver, &commands)
                        .await?;
                }
                self.send_flight_params(outbox, &session, &driver).await
            }
        }
    }

    async fn send_nearest_images(&self, outbox: &Outbox, session: &Session) {
        for model_id in session.selected_models() {
            let pose = match session.poses().get(model_id) {
                Ok(pose) => pose,
                Err(err) => {
                    warn!(conn = %outbox.conn, %model_id, error = %err, "skipping nearest lookup");
                    continue;
                }
            };
            match self.nearest_images(model_id, &pose).await {
                Ok(images) => {
                    self.emit(
                        outbox,
                        ServerEvent::NearestImages(NearestImages {
                            model_id: model_id.clone(),
                            images,
                        }),
                    )
                    .await;
                }
                Err(err) => self.report_batch_error(outbox, &err).await,
            }
        }
    }

    async fn nearest_images(
        &self,
        model_id: &ModelId,
        pose: &Pose,
    ) -> Result<BTreeMap<String, String>, SessionError> {
        let model = self.model(model_id).await?;
        let filenames = model.nearest_images(pose, self.nearest_count);
        debug!(%model_id, closest = ?filenames, "nearest reference images");

        let mut images = BTreeMap::new();
        for file in filenames {
            let bytes = model
                .load_thumbnail(&file)
                .await
                .map_err(|e| SessionError::collaborator(model_id, e))?;
            images.insert(file, encode_image(&bytes));
        }
        Ok(images)
    }

    // The driver model's trajectory is shared by every selected model.
    async fn move_and_render(
        &self,
        outbox: &Outbox,
        session: &mut Session,
        driver: &ModelId,
        commands: &[MotionCommand],
    ) -> Result<(), SessionError> {
        let pose = session
            .poses_mut()
            .apply_motion(driver, commands, self.rig.as_ref())?;

        let targets = session.selected_models().to_vec();
        for model_id in &targets {
            if session.poses().is_bound(model_id) {
                session.poses_mut().set(model_id, pose)?;
            }
        }
        debug!(conn = %outbox.conn, %driver, keys = commands.len(), "pose advanced");

        let frames = join_all(
            targets
                .iter()
                .map(|model_id| self.render_frame(model_id, pose)),
        )
        .await;
        for (model_id, frame) in targets.into_iter().zip(frames) {
            match frame {
                Ok(image) => {
                    self.emit(
                        outbox,
                        ServerEvent::SetClientMainImage(ImageFrame { model_id, image }),
                    )
                    .await;
                }
                Err(err) => self.report_batch_error(outbox, &err).await,
            }
        }
        Ok(())
    }

    async fn send_flight_params(
        &self,
        outbox: &Outbox,
        session: &Session,
        driver: &ModelId,
    ) -> Result<(), SessionError> {
        let pose = session.poses().get(driver)?;
        let (rotation, translation) =
            pose.decompose()
                .map_err(|source| SessionError::InvalidPose {
                    model_id: driver.clone(),
                    source,
                })?;
        let model = self.model(driver).await?;
        let params = model.flight_params(&rotation, &translation);
        info!(
            conn = %outbox.conn,
            altitude = params.altitude,
            heading = params.heading,
            "flight params"
        );
        self.emit(outbox, ServerEvent::FlightParams(params)).await;
        Ok(())
    }

    async fn get_asset_pose(
        &self,
        outbox: &Outbox,
        payload: AssetPosePayload,
    ) -> Result<(), SessionError> {
        let AssetPosePayload {
            selected_model_id,
            index,
        } = payload;
        let handle = self.sessions.session(outbox.conn)?;
        let mut session = handle.lock().await;

        for model_id in selected_model_id {
            match self.asset_frame(&mut session, &model_id, index).await {
                Ok(image) => {
                    self.emit(
                        outbox,
                        ServerEvent::SetClientMainImage(ImageFrame { model_id, image }),
                    )
                    .await;
                }
                Err(err) => self.report_batch_error(outbox, &err).await,
            }
        }
        Ok(())
    }

    async fn asset_frame(
        &self,
        session: &mut Session,
        model_id: &ModelId,
        index: usize,
    ) -> Result<String, SessionError> {
        let model = self.model(model_id).await?;
        let descriptor = self
            .gateway
            .asset_pose(model_id, index)
            .await
            .map_err(|e| SessionError::collaborator(model_id, e))?;
        let pose = descriptor
            .decode()
            .map_err(|e| SessionError::collaborator(model_id, e))?;
        let bytes = model
            .render_image(&pose)
            .await
            .map_err(|e| SessionError::collaborator(model_id, e))?;

        if session.poses().is_bound(model_id) {
            session.poses_mut().set(model_id, pose)?;
        } else {
            debug!(conn = %session.id(), %model_id, "asset pose not stored for unbound model");
        }
        Ok(encode_image(&bytes))
    }

    async fn render_frame(&self, model_id: &ModelId, pose: Pose) -> Result<String, SessionError> {
        let model = self.model(model_id).await?;
        let bytes = model
            .render_image(&pose)
            .await
            .map_err(|e| SessionError::collaborator(model_id, e))?;
        Ok(encode_image(&bytes))
    }

    async fn model(&self, model_id: &ModelId) -> Result<Arc<dyn Model>, SessionError> {
        match self.gateway.get_model(model_id).await {
            Some(model) => Ok(model),
            None => {
                warn!(%model_id, "unknown model requested");
                Err(SessionError::UnknownModel(model_id.clone()))
            }
        }
    }

    // Unknown ids inside a batch are only logged; other failures are reported.
    async fn report_batch_error(&self, outbox: &Outbox, err: &SessionError) {
        if matches!(err, SessionError::UnknownModel(_)) {
            return;
        }
        warn!(conn = %outbox.conn, error = %err, "batch item failed");
        self.emit_error(outbox, err).await;
    }

    async fn emit_error(&self, outbox: &Outbox, err: &SessionError) {
        let payload = ResponsePayload::error(ApiError::from(err), err.model_id().cloned());
        self.emit(outbox, ServerEvent::Response(payload)).await;
    }

    // Emissions for sessions closed mid-flight are discarded.
    async fn emit(&self, outbox: &Outbox, event: ServerEvent) -> bool {
        if !self.sessions.contains(outbox.conn) {
            debug!(conn = %outbox.conn, "session gone, dropping outbound event");
            return false;
        }
        outbox.tx.send(event).await.is_ok()
    }
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
