//! Registro de artifact del índice.
//!
//! Un `ArtifactRecord` es la versión más reciente comprometida de una capa
//! para un proyecto. Es inmutable una vez comprometido: una recomputación
//! produce un registro nuevo (con ubicación nueva) en lugar de mutar el
//! anterior. Campos clave:
//! - `fingerprint`: hash determinista de los insumos resueltos; la identidad
//!   de frescura.
//! - `content_hash`: hash del output producido (payload + bytes de malla);
//!   es lo que consumen los fingerprints de las capas dependientes.
//! - `payload`: resumen estructurado del output que las capas aguas abajo
//!   usan como insumo; los bytes de malla van al object store.
//! - `summary`: hoja de indicadores, sólo para la capa que la produce.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::stage::Stage;

/// Estado de servicio de un artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    /// Vigente: su fingerprint coincide con los insumos actuales.
    Ready,
    /// Invalidado: sigue descargable como último bueno conocido, pero no se
    /// devuelve como vigente.
    Stale,
}

/// Última versión comprometida de una capa para un proyecto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub project_id: Uuid,
    pub stage: Stage,
    pub fingerprint: String,
    pub content_hash: String,
    pub location: String,
    pub status: ArtifactStatus,
    pub payload: Value,
    pub summary: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    /// Un artifact está fresco si sigue `Ready` y su fingerprint almacenado
    /// coincide con el resuelto a partir de los insumos actuales.
    pub fn is_fresh(&self, resolved_fingerprint: &str) -> bool {
        self.status == ArtifactStatus::Ready && self.fingerprint == resolved_fingerprint
    }
}
