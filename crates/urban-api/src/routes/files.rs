//! Descarga de archivos generados.
//!
//! Sirve los bytes tal como quedaron en el object store, con el media type
//! que corresponde a la extensión. La clave completa es
//! `{project_uuid}/{carpeta}/{fingerprint}/{archivo}`, o sea el sufijo de la
//! URL publicada en cada response de capa.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use urban_core::constants::{MEDIA_TYPE_GEOJSON, MEDIA_TYPE_GLTF};
use urban_core::CoreError;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

pub async fn download(State(state): State<AppState>,
                      Path((project_id, path)): Path<(Uuid, String)>)
                      -> Result<Response, ApiError> {
    let key = format!("{project_id}/{path}");
    let bytes = match state.pipeline().read_object(&key).await {
        Ok(bytes) => bytes,
        Err(CoreError::Storage(msg)) if msg.starts_with("missing object") => {
            return Err(ApiError::not_found(format!("File '{path}' not found.")));
        }
        Err(err) => return Err(err.into()),
    };
    Ok(([(header::CONTENT_TYPE, media_type_for(&key))], bytes).into_response())
}

/// Media type según extensión; el resto baja como binario genérico.
fn media_type_for(key: &str) -> &'static str {
    if key.ends_with(".gltf") {
        MEDIA_TYPE_GLTF
    } else if key.ends_with(".geojson") || key.ends_with(".json") {
        MEDIA_TYPE_GEOJSON
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_follows_extension() {
        assert_eq!(media_type_for("p/01-streets/ab12/streets.gltf"), MEDIA_TYPE_GLTF);
        assert_eq!(media_type_for("p/00-site/site.geojson"), MEDIA_TYPE_GEOJSON);
        assert_eq!(media_type_for("p/raw/blob.bin"), "application/octet-stream");
    }
}
