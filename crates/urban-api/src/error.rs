//! Error de la capa HTTP.
//!
//! Todo error sale al wire con el shape `{ "detail": <mensaje> }` y un
//! status derivado de la variante del core:
//! - `Validation` => 422, `NotFound` => 404
//! - `DependencyNotReady` / `ConflictSuperseded` / `ProjectArchived` => 409
//! - `Generation` => 502 (falla del motor; el artifact previo sigue servible)
//! - `Storage` / `Internal` => 500

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use urban_core::CoreError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self { status, detail: detail.into() }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match &err {
            CoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::DependencyNotReady { .. } => StatusCode::CONFLICT,
            CoreError::ConflictSuperseded => StatusCode::CONFLICT,
            CoreError::ProjectArchived(_) => StatusCode::CONFLICT,
            CoreError::Generation(_) => StatusCode::BAD_GATEWAY,
            CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, detail: err.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_core_variants_map_to_expected_status() {
        let cases = [(CoreError::Validation("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
                     (CoreError::NotFound(Uuid::new_v4()), StatusCode::NOT_FOUND),
                     (CoreError::ConflictSuperseded, StatusCode::CONFLICT),
                     (CoreError::ProjectArchived(Uuid::new_v4()), StatusCode::CONFLICT),
                     (CoreError::Generation("boom".into()), StatusCode::BAD_GATEWAY),
                     (CoreError::Storage("io".into()), StatusCode::INTERNAL_SERVER_ERROR),
                     (CoreError::Internal("bug".into()), StatusCode::INTERNAL_SERVER_ERROR)];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }
}
