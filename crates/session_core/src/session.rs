use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use render_gateway::ModelManager;
use shared::{
    domain::{ConnectionId, ModelId},
    pose::Pose,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{error::SessionError, pose_store::PoseStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unidentified,
    Identified,
    ModelsBound,
}

#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    user_name: Option<String>,
    model_ids: Vec<ModelId>,
    poses: PoseStore,
}

impl Session {
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            user_name: None,
            model_ids: Vec::new(),
            poses: PoseStore::default(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn selected_models(&self) -> &[ModelId] {
        &self.model_ids
    }

    /// First selected model that is bound. Its pose seeds every motion tick.
    pub fn driver_model(&self) -> Option<&ModelId> {
        self.model_ids
            .iter()
            .find(|model_id| self.poses.is_bound(model_id))
    }

    pub fn poses(&self) -> &PoseStore {
        &self.poses
    }

    pub fn poses_mut(&mut self) -> &mut PoseStore {
        &mut self.poses
    }

    /// Lifecycle stage; `ModelsBound` is the precondition for camera motion.
    pub fn state(&self) -> SessionState {
        if !self.poses.is_empty() {
            SessionState::ModelsBound
        } else if self.user_name.is_some() || !self.model_ids.is_empty() {
            SessionState::Identified
        } else {
            SessionState::Unidentified
        }
    }

    pub fn set_identity(&mut self, user_name: Option<String>, model_ids: Option<Vec<ModelId>>) {
        if let Some(name) = user_name {
            self.user_name = Some(name);
        }
        if let Some(model_ids) = model_ids.filter(|ids| !ids.is_empty()) {
            self.model_ids = model_ids;
        }
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

/// Live sessions keyed by connection. Each session sits behind its own lock so
/// one connection's read-modify-write never interleaves with another event of
/// the same connection.
pub struct SessionManager {
    sessions: DashMap<ConnectionId, SessionHandle>,
    gateway: Arc<dyn ModelManager>,
}

impl SessionManager {
    pub fn new(gateway: Arc<dyn ModelManager>) -> Self {
        Self {
            sessions: DashMap::new(),
            gateway,
        }
    }

    pub fn on_connect(&self, conn: ConnectionId) -> Result<(), SessionError> {
        match self.sessions.entry(conn) {
            Entry::Occupied(_) => Err(SessionError::DuplicateSession(conn)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(Session::new(conn))));
                info!(%conn, "session opened");
                Ok(())
            }
        }
    }

    pub fn on_disconnect(&self, conn: ConnectionId) -> bool {
        let removed = self.sessions.remove(&conn).is_some();
        if removed {
            info!(%conn, "session closed");
        }
        removed
    }

    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.sessions.contains_key(&conn)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session(&self, conn: ConnectionId) -> Result<SessionHandle, SessionError> {
        self.sessions
            .get(&conn)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(SessionError::SessionNotFound(conn))
    }

    pub async fn set_identity(
        &self,
        conn: ConnectionId,
        user_name: Option<String>,
        model_ids: Option<Vec<ModelId>>,
    ) -> Result<(), SessionError> {
        let handle = self.session(conn)?;
        let mut session = handle.lock().await;
        session.set_identity(user_name, model_ids);
        Ok(())
    }

    /// Binds every selected model at its init pose. Unknown models are skipped.
    pub async fn bind_models(&self, conn: ConnectionId) -> Result<Vec<ModelId>, SessionError> {
        let handle = self.session(conn)?;
        let mut session = handle.lock().await;
        let selected = session.selected_models().to_vec();

        let mut bound = Vec::with_capacity(selected.len());
        for model_id in &selected {
            let Some(model) = self.gateway.get_model(model_id).await else {
                warn!(%conn, %model_id, "unknown model skipped during binding");
                continue;
            };
            let init_pose = model.init_pose();
            if let Err(error) = init_pose.decompose() {
                warn!(%conn, %model_id, %error, "model init pose rejected");
                continue;
            }
            session.poses_mut().bind(model_id.clone(), init_pose);
            bound.push(model_id.clone());
        }
        session.poses_mut().retain_only(&bound);

        info!(%conn, bound = bound.len(), selected = selected.len(), "models bound");
        Ok(bound)
    }

    pub async fn reset_pose(
        &self,
        conn: ConnectionId,
        model_id: &ModelId,
    ) -> Result<Pose, SessionError> {
        let handle = self.session(conn)?;
        let mut session = handle.lock().await;
        session.poses_mut().reset(model_id)
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
