use std::collections::HashMap;

use render_gateway::CameraRig;
use shared::{
    domain::{ModelId, MotionCommand},
    pose::Pose,
};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPoseState {
    init_pose: Pose,
    current_pose: Pose,
}

impl ModelPoseState {
    pub fn new(init_pose: Pose) -> Self {
        Self {
            init_pose,
            current_pose: init_pose,
        }
    }

    pub fn init_pose(&self) -> Pose {
        self.init_pose
    }

    pub fn current_pose(&self) -> Pose {
        self.current_pose
    }
}

/// Pose state for every model bound to one session.
#[derive(Debug, Default)]
pub struct PoseStore {
    states: HashMap<ModelId, ModelPoseState>,
}

impl PoseStore {
    pub fn bind(&mut self, model_id: ModelId, init_pose: Pose) {
        self.states.insert(model_id, ModelPoseState::new(init_pose));
    }

    pub fn is_bound(&self, model_id: &ModelId) -> bool {
        self.states.contains_key(model_id)
    }

    pub fn state(&self, model_id: &ModelId) -> Option<&ModelPoseState> {
        self.states.get(model_id)
    }

    pub fn get(&self, model_id: &ModelId) -> Result<Pose, SessionError> {
        self.states
            .get(model_id)
            .map(ModelPoseState::current_pose)
            .ok_or_else(|| SessionError::NotBound(model_id.clone()))
    }

    pub fn set(&mut self, model_id: &ModelId, pose: Pose) -> Result<(), SessionError> {
        let state = self.state_mut(model_id)?;
        state.current_pose = pose;
        Ok(())
    }

    pub fn reset(&mut self, model_id: &ModelId) -> Result<Pose, SessionError> {
        let state = self.state_mut(model_id)?;
        state.current_pose = state.init_pose;
        Ok(state.current_pose)
    }

    /// Applies `commands` in order and stores the result only if it still decomposes.
    pub fn apply_motion(
        &mut self,
        model_id: &ModelId,
        commands: &[MotionCommand],
        rig: &dyn CameraRig,
    ) -> Result<Pose, SessionError> {
        let state = self.state_mut(model_id)?;
        let moved = commands
            .iter()
            .fold(state.current_pose, |pose, command| rig.apply(&pose, command));
        moved
            .decompose()
            .map_err(|source| SessionError::InvalidPose {
                model_id: model_id.clone(),
                source,
            })?;
        state.current_pose = moved;
        Ok(moved)
    }

    pub fn retain_only(&mut self, model_ids: &[ModelId]) {
        self.states.retain(|model_id, _| model_ids.contains(model_id));
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    fn state_mut(&mut self, model_id: &ModelId) -> Result<&mut ModelPoseState, SessionError> {
        self.states
            .get_mut(model_id)
            .ok_or_else(|| SessionError::NotBound(model_id.clone()))
    }
}

#[cfg(test)]
#[path = "tests/pose_store_tests.rs"]
mod tests;
