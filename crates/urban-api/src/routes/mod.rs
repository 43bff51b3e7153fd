//! Tabla de rutas de la API.
//!
//! - `POST /projects`, `GET /projects`
//! - `GET | PUT | DELETE /projects/{id}`
//! - `GET /projects/{id}/site`
//! - `GET | POST /projects/{id}/{stage}` y `GET /projects/{id}/{stage}/status`
//! - `GET /files/{project_id}/{*path}`
//!
//! Los segmentos estáticos (`site`, `status`) tienen prioridad sobre la
//! captura `{stage}`, así que conviven sin ambigüedad.

mod files;
mod projects;
mod stages;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Construye el router completo con CORS permisivo y trazas por request.
pub fn router(state: AppState) -> Router {
    Router::new().route("/projects", get(projects::list).post(projects::create))
                 .route("/projects/{id}",
                        get(projects::detail).put(projects::update).delete(projects::archive))
                 .route("/projects/{id}/site", get(projects::site))
                 .route("/projects/{id}/{stage}", get(stages::generate_get).post(stages::generate_post))
                 .route("/projects/{id}/{stage}/status", get(stages::status))
                 .route("/files/{project_id}/{*path}", get(files::download))
                 .layer(TraceLayer::new_for_http())
                 .layer(CorsLayer::permissive())
                 .with_state(state)
}
