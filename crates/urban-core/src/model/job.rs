//! Registro efímero de una computación en vuelo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stage::Stage;

/// Estados de un job de generación.
///
/// Transiciones: `Queued -> Running -> Succeeded | Failed`. Un job nunca
/// vuelve atrás; un resultado supersedido se descarta sin transicionar a
/// `Succeeded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

/// Un job vive sólo mientras dura la computación; no se persiste. Tras un
/// reinicio todo se rederiva del estado de fingerprints del índice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: Uuid,
    pub project_id: Uuid,
    pub stage: Stage,
    pub fingerprint: String,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    pub fn new(project_id: Uuid, stage: Stage, fingerprint: impl Into<String>) -> Self {
        GenerationJob { id: Uuid::new_v4(),
                        project_id,
                        stage,
                        fingerprint: fingerprint.into(),
                        state: JobState::Queued,
                        created_at: Utc::now(),
                        started_at: None,
                        ended_at: None }
    }
}
