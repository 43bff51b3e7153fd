//! Handlers de generación de capas.
//!
//! GET y POST sobre `/projects/{id}/{stage}` son equivalentes salvo que el
//! POST admite un cuerpo con red vial auxiliar; ambos esperan el resultado
//! (cache hit, espera de un job en vuelo o cómputo nuevo, según el estado).

use axum::extract::{Path, State};
use axum::Json;
use urban_core::Stage;
use urban_domain::RoadNetwork;
use uuid::Uuid;

use crate::dto::{ApiJson, ComponentResponse, StageGenerateRequest, StageStatusResponse};
use crate::error::ApiError;
use crate::AppState;

pub async fn generate_get(State(state): State<AppState>,
                          Path((id, stage)): Path<(Uuid, String)>)
                          -> Result<Json<ComponentResponse>, ApiError> {
    run_generate(&state, id, &stage, None).await
}

pub async fn generate_post(State(state): State<AppState>,
                           Path((id, stage)): Path<(Uuid, String)>,
                           body: Option<ApiJson<StageGenerateRequest>>)
                           -> Result<Json<ComponentResponse>, ApiError> {
    let aux = match &body {
        Some(ApiJson(request)) => request.aux_roads()?,
        None => None,
    };
    run_generate(&state, id, &stage, aux).await
}

async fn run_generate(state: &AppState,
                      project_id: Uuid,
                      stage_name: &str,
                      aux_roads: Option<RoadNetwork>)
                      -> Result<Json<ComponentResponse>, ApiError> {
    let stage: Stage = stage_name.parse()?;
    let record = state.pipeline().generate(project_id, stage, aux_roads).await?;
    tracing::debug!(project = %project_id, %stage, location = %record.location, "capa servida");
    Ok(Json(ComponentResponse::from_record(&record)))
}

/// `GET /projects/{id}/{stage}/status`: estado vigente sin disparar cómputo.
pub async fn status(State(state): State<AppState>,
                    Path((id, stage)): Path<(Uuid, String)>)
                    -> Result<Json<StageStatusResponse>, ApiError> {
    let stage: Stage = stage.parse()?;
    let view = state.pipeline().stage_status(id, stage).await?;
    Ok(Json(StageStatusResponse::from_view(view)))
}
