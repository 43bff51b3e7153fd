//! Binario del servidor HTTP del pipeline urbano.
//!
//! Arma el pipeline completo sobre los stores durables del directorio de
//! datos y lo expone vía axum en `URBANFLOW_BIND`. Las URLs publicadas usan
//! `URBANFLOW_PUBLIC_URL` como prefijo, así que debe apuntar a este proceso.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use urban_adapters::DeterministicEngine;
use urban_api::{router, AppState};
use urban_core::PipelineBuilder;
use urban_persistence::{FsArtifactIndexStore, FsObjectStore, FsProjectStore};

use crate::config::CONFIG;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let storage = &CONFIG.storage;
    let engine = Arc::new(DeterministicEngine::new());
    let objects = Arc::new(FsObjectStore::new(&storage.data_dir, storage.public_base_url.clone()));
    let pipeline = PipelineBuilder::new(engine, objects)
        .with_project_store(Arc::new(FsProjectStore::new(&storage.data_dir)))
        .with_artifact_store(Arc::new(FsArtifactIndexStore::new(&storage.data_dir)))
        .build();

    let app = router(AppState::new(pipeline));
    let listener = tokio::net::TcpListener::bind(&CONFIG.bind).await?;
    tracing::info!(bind = %CONFIG.bind,
                   data_dir = %storage.data_dir.display(),
                   public_url = %storage.public_base_url,
                   "urbanflow escuchando");
    axum::serve(listener, app).await?;
    Ok(())
}
