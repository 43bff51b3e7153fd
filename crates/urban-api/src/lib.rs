//! urban-api
//!
//! Superficie HTTP del pipeline urbano sobre axum. Capa deliberadamente
//! delgada: traduce requests a llamadas sobre la fachada `UrbanPipeline` y
//! errores del core a respuestas `{ "detail": ... }` con el status que
//! corresponde.
//!
//! Módulos:
//! - `routes`: armado del `Router` y handlers por recurso.
//! - `dto`: shapes del wire (requests y responses) y su traducción a tipos
//!   de dominio.
//! - `error`: wrapper de error con mapeo a status HTTP.

use std::sync::Arc;

use urban_core::UrbanPipeline;

pub mod dto;
pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::router;

/// Estado compartido de la aplicación.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<UrbanPipeline>,
}

impl AppState {
    pub fn new(pipeline: UrbanPipeline) -> Self {
        Self { pipeline: Arc::new(pipeline) }
    }

    pub fn pipeline(&self) -> &UrbanPipeline {
        &self.pipeline
    }
}
