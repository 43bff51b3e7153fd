//! Errores del core del pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::stage::Stage;
use urban_domain::DomainError;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CoreError {
    #[error("validation: {0}")] Validation(String),
    #[error("project {0} not found")] NotFound(Uuid),
    #[error("stage {stage} is waiting on {missing}")] DependencyNotReady { stage: Stage, missing: String },
    #[error("generation failed: {0}")] Generation(String),
    #[error("superseded by a newer input fingerprint")] ConflictSuperseded,
    #[error("project {0} is archived")] ProjectArchived(Uuid),
    #[error("storage: {0}")] Storage(String),
    #[error("internal: {0}")] Internal(String),
}

impl From<DomainError> for CoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::ValidationError(msg) => CoreError::Validation(msg),
            DomainError::SerializationError(msg) => CoreError::Internal(msg),
        }
    }
}
