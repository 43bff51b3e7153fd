//! Handlers del ciclo de vida de proyectos.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::dto::{ApiJson, ComponentResponse, CreateProjectRequest, ProjectDetail, ProjectResponse,
                 ProjectSummary, UpdateProjectRequest};
use crate::error::ApiError;
use crate::AppState;

/// `POST /projects`: registra el proyecto y, si trae geometría base, deja el
/// render del sitio listo. Responde 201 con la URL del mesh.
pub async fn create(State(state): State<AppState>,
                    ApiJson(body): ApiJson<CreateProjectRequest>)
                    -> Result<(StatusCode, Json<ProjectResponse>), ApiError> {
    let spec = body.into_new_project()?;
    let project = state.pipeline().create_project(spec).await?;
    tracing::info!(project = %project.id(), name = project.name(), "proyecto registrado");
    Ok((StatusCode::CREATED, Json(ProjectResponse::from_project(&project))))
}

/// `GET /projects`: resumen de todos los proyectos en orden de alta.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ProjectSummary>>, ApiError> {
    let projects = state.pipeline().list_projects().await?;
    Ok(Json(projects.iter().map(ProjectSummary::from_project).collect()))
}

/// `GET /projects/{id}`: detalle con ciclo de vida y fingerprint base.
pub async fn detail(State(state): State<AppState>,
                    Path(id): Path<Uuid>)
                    -> Result<Json<ProjectDetail>, ApiError> {
    let project = state.pipeline().get_project(id).await?;
    Ok(Json(ProjectDetail::from_project(&project)))
}

/// `PUT /projects/{id}`: patch parcial. Tocar geometría o parámetros renueva
/// el fingerprint base e invalida las capas derivadas.
pub async fn update(State(state): State<AppState>,
                    Path(id): Path<Uuid>,
                    ApiJson(body): ApiJson<UpdateProjectRequest>)
                    -> Result<Json<ProjectResponse>, ApiError> {
    let patch = body.into_patch()?;
    let project = state.pipeline().update_project(id, patch).await?;
    Ok(Json(ProjectResponse::from_project(&project)))
}

/// `DELETE /projects/{id}`: archiva (borrado blando) y cancela jobs en vuelo.
pub async fn archive(State(state): State<AppState>,
                     Path(id): Path<Uuid>)
                     -> Result<StatusCode, ApiError> {
    state.pipeline().archive_project(id).await?;
    tracing::info!(project = %id, "proyecto archivado");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /projects/{id}/site`: URL del render del sitio, si hay geometría base.
pub async fn site(State(state): State<AppState>,
                  Path(id): Path<Uuid>)
                  -> Result<Json<ComponentResponse>, ApiError> {
    let project = state.pipeline().get_project(id).await?;
    match project.site_file() {
        Some(file) => Ok(Json(ComponentResponse { file: file.to_string(),
                                                  lucky_sheet: None })),
        None => Err(ApiError::not_found(format!("project {id} has no site geometry"))),
    }
}
