use crate::lifecycle::step::StepError;
use crate::topology::TopologyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StreamorError {
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for StreamorError {
    fn from(err: serde_json::Error) -> Self {
        StreamorError::Serialization(SerializationError::from(err))
    }
}

pub type Result<T, E = StreamorError> = std::result::Result<T, E>;
