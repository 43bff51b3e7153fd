//! Errores de persistencia.
//! Mapea fallas de IO y de serde a variantes semánticas de la capa de
//! almacenamiento; cruzan al core como `CoreError::Storage`.

use std::io;
use thiserror::Error;

use urban_core::CoreError;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("io: {0}")]
    Io(String),
}

impl From<io::Error> for PersistenceError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}

impl From<PersistenceError> for CoreError {
    fn from(err: PersistenceError) -> Self {
        CoreError::Storage(err.to_string())
    }
}
