use shared::{
    domain::{ConnectionId, ModelId},
    error::{ApiError, ErrorCode},
    pose::PoseError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("unknown model {0}")]
    UnknownModel(ModelId),
    #[error("model {0} is not bound to this session")]
    NotBound(ModelId),
    #[error("no models are bound to this session")]
    NoModelsBound,
    #[error("{message}")]
    CollaboratorFailure { model_id: ModelId, message: String },
    #[error("pose for model {model_id} is unusable: {source}")]
    InvalidPose {
        model_id: ModelId,
        #[source]
        source: PoseError,
    },
    #[error("session {0} not found")]
    SessionNotFound(ConnectionId),
    #[error("session {0} already exists")]
    DuplicateSession(ConnectionId),
}

impl SessionError {
    pub fn collaborator(model_id: &ModelId, err: impl Into<anyhow::Error>) -> Self {
        let err = err.into();
        Self::CollaboratorFailure {
            model_id: model_id.clone(),
            message: format!("model {model_id}: {err:#}"),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::InvalidPayload(_) => ErrorCode::InvalidPayload,
            SessionError::UnknownModel(_) => ErrorCode::UnknownModel,
            SessionError::NotBound(_) | SessionError::NoModelsBound => ErrorCode::NotBound,
            SessionError::CollaboratorFailure { .. } => ErrorCode::CollaboratorFailure,
            SessionError::InvalidPose { .. } | SessionError::DuplicateSession(_) => {
                ErrorCode::Internal
            }
            SessionError::SessionNotFound(_) => ErrorCode::SessionNotFound,
        }
    }

    pub fn model_id(&self) -> Option<&ModelId> {
        match self {
            SessionError::UnknownModel(model_id)
            | SessionError::NotBound(model_id)
            | SessionError::CollaboratorFailure { model_id, .. }
            | SessionError::InvalidPose { model_id, .. } => Some(model_id),
            _ => None,
        }
    }
}

impl From<&SessionError> for ApiError {
    fn from(value: &SessionError) -> Self {
        ApiError::new(value.code(), value.to_string())
    }
}
