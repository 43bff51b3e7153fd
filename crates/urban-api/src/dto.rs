//! Shapes del wire y su traducción a tipos de dominio.
//!
//! Los requests aceptan la geometría como GeoJSON (`Polygon` / `LineString`,
//! sueltos o envueltos en `Feature` / `FeatureCollection`); la traducción y
//! la validación viven en `urban-domain`. Los responses exponen URLs de
//! descarga, nunca rutas de disco.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, OptionalFromRequest, Request};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use urban_core::{ArtifactRecord, ArtifactStatus, CoreError, JobState, Stage, StageStatusView};
use urban_domain::{LifecycleState, NewProject, Project, ProjectParameters, ProjectPatch, RoadNetwork, SiteRing};

use crate::error::ApiError;

/// Nombre asignado cuando el alta no trae uno.
pub const DEFAULT_PROJECT_NAME: &str = "Proyecto sin nombre";

/// Extractor JSON que reporta cuerpos malformados con el mismo shape
/// `{ "detail": ... }` que el resto de los errores, en lugar de la
/// respuesta de texto plano de axum.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
    where S: Send + Sync,
          T: DeserializeOwned
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match <Json<T> as FromRequest<S>>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(reject(rejection)),
        }
    }
}

impl<S, T> OptionalFromRequest<S> for ApiJson<T>
    where S: Send + Sync,
          T: DeserializeOwned
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        match <Json<T> as OptionalFromRequest<S>>::from_request(req, state).await {
            Ok(Some(Json(value))) => Ok(Some(ApiJson(value))),
            Ok(None) => Ok(None),
            Err(rejection) => Err(reject(rejection)),
        }
    }
}

fn reject(rejection: JsonRejection) -> ApiError {
    ApiError::validation(format!("cuerpo inválido: {}", rejection.body_text()))
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub site: Option<Value>,
    pub roads: Option<Value>,
    pub parameters: Option<ProjectParameters>,
    pub metadata: Option<Value>,
}

impl CreateProjectRequest {
    /// Traduce el request a un alta de dominio, validando la geometría.
    pub fn into_new_project(self) -> Result<NewProject, CoreError> {
        let site = self.site.as_ref().map(SiteRing::from_geojson).transpose()?;
        let roads = self.roads.as_ref().map(RoadNetwork::from_geojson).transpose()?;
        Ok(NewProject { name: self.name.unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string()),
                        description: self.description,
                        site,
                        roads,
                        parameters: self.parameters,
                        metadata: self.metadata })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub site: Option<Value>,
    pub roads: Option<Value>,
    pub parameters: Option<ProjectParameters>,
    pub metadata: Option<Value>,
}

impl UpdateProjectRequest {
    pub fn into_patch(self) -> Result<ProjectPatch, CoreError> {
        let site = self.site.as_ref().map(SiteRing::from_geojson).transpose()?;
        let roads = self.roads.as_ref().map(RoadNetwork::from_geojson).transpose()?;
        Ok(ProjectPatch { name: self.name,
                          description: self.description,
                          site,
                          roads,
                          parameters: self.parameters,
                          metadata: self.metadata })
    }
}

/// Cuerpo opcional de un POST de capa: red vial auxiliar para `streets` y
/// `public`.
#[derive(Debug, Deserialize)]
pub struct StageGenerateRequest {
    pub roads: Option<Value>,
}

impl StageGenerateRequest {
    pub fn aux_roads(&self) -> Result<Option<RoadNetwork>, CoreError> {
        Ok(self.roads.as_ref().map(RoadNetwork::from_geojson).transpose()?)
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Respuesta del alta de proyecto.
#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub project_uuid: Uuid,
    pub project_name: String,
    pub file: Option<String>,
}

impl ProjectResponse {
    pub fn from_project(project: &Project) -> Self {
        Self { project_uuid: project.id(),
               project_name: project.name().to_string(),
               file: project.site_file().map(str::to_string) }
    }
}

/// Fila del listado de proyectos.
#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    pub project_uuid: Uuid,
    pub project_name: String,
    pub lifecycle: LifecycleState,
    pub updated_at: DateTime<Utc>,
}

impl ProjectSummary {
    pub fn from_project(project: &Project) -> Self {
        Self { project_uuid: project.id(),
               project_name: project.name().to_string(),
               lifecycle: project.lifecycle(),
               updated_at: project.updated_at() }
    }
}

/// Detalle de un proyecto.
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    pub project_uuid: Uuid,
    pub project_name: String,
    pub description: Option<String>,
    pub lifecycle: LifecycleState,
    pub base_fingerprint: Option<String>,
    pub file: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectDetail {
    pub fn from_project(project: &Project) -> Self {
        Self { project_uuid: project.id(),
               project_name: project.name().to_string(),
               description: project.description().map(str::to_string),
               lifecycle: project.lifecycle(),
               base_fingerprint: project.base_fingerprint().map(str::to_string),
               file: project.site_file().map(str::to_string),
               metadata: project.metadata().clone(),
               created_at: project.created_at(),
               updated_at: project.updated_at() }
    }
}

/// Respuesta de una capa generada: URL de la malla y, sólo para la capa que
/// lo produce, la hoja de indicadores.
#[derive(Debug, Serialize)]
pub struct ComponentResponse {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lucky_sheet: Option<Value>,
}

impl ComponentResponse {
    pub fn from_record(record: &ArtifactRecord) -> Self {
        Self { file: record.location.clone(),
               lucky_sheet: record.summary.clone() }
    }
}

/// Vista de estado de una capa sin disparar generación.
#[derive(Debug, Serialize)]
pub struct StageStatusResponse {
    pub stage: Stage,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl StageStatusResponse {
    pub fn from_view(view: StageStatusView) -> Self {
        Self { stage: view.stage,
               state: state_label(&view),
               file: view.location,
               generated_at: view.generated_at }
    }
}

/// Etiqueta de estado: un job vivo manda sobre el registro; sin job, decide
/// el estado del registro vigente.
fn state_label(view: &StageStatusView) -> &'static str {
    match view.job_state {
        Some(JobState::Queued) | Some(JobState::Running) => "running",
        _ => match view.status {
            None => "absent",
            Some(ArtifactStatus::Ready) => "fresh",
            Some(ArtifactStatus::Stale) => "stale",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view(status: Option<ArtifactStatus>, job_state: Option<JobState>) -> StageStatusView {
        StageStatusView { stage: Stage::Streets,
                          status,
                          fingerprint: None,
                          location: None,
                          generated_at: None,
                          job_state }
    }

    #[test]
    fn test_state_label_covers_the_four_states() {
        assert_eq!(state_label(&view(None, None)), "absent");
        assert_eq!(state_label(&view(Some(ArtifactStatus::Ready), None)), "fresh");
        assert_eq!(state_label(&view(Some(ArtifactStatus::Stale), None)), "stale");
        assert_eq!(state_label(&view(Some(ArtifactStatus::Stale), Some(JobState::Running))), "running");
        assert_eq!(state_label(&view(None, Some(JobState::Queued))), "running");
        // un job terminado no pisa el estado del registro
        assert_eq!(state_label(&view(Some(ArtifactStatus::Ready), Some(JobState::Succeeded))), "fresh");
    }

    #[test]
    fn test_create_request_defaults_the_name() {
        let request = CreateProjectRequest { name: None,
                                             description: None,
                                             site: None,
                                             roads: None,
                                             parameters: None,
                                             metadata: None };
        let spec = request.into_new_project().unwrap();
        assert_eq!(spec.name, DEFAULT_PROJECT_NAME);
    }

    #[test]
    fn test_create_request_rejects_malformed_geometry() {
        let request = CreateProjectRequest { name: Some("X".into()),
                                             description: None,
                                             site: Some(json!({ "type": "Point", "coordinates": [0.0, 0.0] })),
                                             roads: None,
                                             parameters: None,
                                             metadata: None };
        assert!(matches!(request.into_new_project(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_component_response_omits_absent_lucky_sheet() {
        let record = ArtifactRecord { project_id: Uuid::new_v4(),
                                      stage: Stage::Clusters,
                                      fingerprint: "fp".into(),
                                      content_hash: "ch".into(),
                                      location: "http://localhost:8000/files/x".into(),
                                      status: ArtifactStatus::Ready,
                                      payload: json!({}),
                                      summary: None,
                                      created_at: Utc::now() };
        let body = serde_json::to_value(ComponentResponse::from_record(&record)).unwrap();
        assert_eq!(body, json!({ "file": "http://localhost:8000/files/x" }));
    }
}
