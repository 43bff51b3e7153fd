//! Índice de artifacts: registro durable por `(proyecto, capa)`.
//!
//! El índice guarda un único `ArtifactRecord` por clave. Un commit reemplaza
//! el registro anterior de forma atómica y reporta el content hash previo,
//! insumo para decidir si los dependientes se invalidan.
//!
//! Responsabilidades:
//! - `ArtifactIndexStore`: contrato de persistencia (get / put / list).
//! - `InMemoryArtifactIndexStore`: implementación volátil para tests y CLI.
//! - `ArtifactIndex`: fachada con serialización por clave de las escrituras.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::model::{ArtifactRecord, ArtifactStatus};
use crate::stage::Stage;

/// Resultado de un commit: registro escrito + content hash del anterior.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub record: ArtifactRecord,
    pub previous_content_hash: Option<String>,
}

impl CommitOutcome {
    /// `true` si el contenido cambió respecto al registro previo.
    pub fn content_changed(&self) -> bool {
        self.previous_content_hash
            .as_deref()
            .map(|prev| prev != self.record.content_hash)
            .unwrap_or(true)
    }
}

/// Persistencia del índice de artifacts.
#[async_trait]
pub trait ArtifactIndexStore: Send + Sync {
    /// Registro vigente para `(proyecto, capa)`, si existe.
    async fn get(&self, project_id: Uuid, stage: Stage) -> Result<Option<ArtifactRecord>, CoreError>;
    /// Inserta o reemplaza el registro de su clave.
    async fn put(&self, record: ArtifactRecord) -> Result<(), CoreError>;
    /// Registros de un proyecto, en orden de pipeline.
    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<ArtifactRecord>, CoreError>;
}

/// Implementación en memoria sobre `DashMap`.
pub struct InMemoryArtifactIndexStore {
    inner: DashMap<(Uuid, Stage), ArtifactRecord>,
}

impl InMemoryArtifactIndexStore {
    pub fn new() -> Self {
        Self { inner: DashMap::new() }
    }
}

impl Default for InMemoryArtifactIndexStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactIndexStore for InMemoryArtifactIndexStore {
    async fn get(&self, project_id: Uuid, stage: Stage) -> Result<Option<ArtifactRecord>, CoreError> {
        Ok(self.inner.get(&(project_id, stage)).map(|r| r.clone()))
    }

    async fn put(&self, record: ArtifactRecord) -> Result<(), CoreError> {
        self.inner.insert((record.project_id, record.stage), record);
        Ok(())
    }

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<ArtifactRecord>, CoreError> {
        let mut records: Vec<ArtifactRecord> = self.inner
                                                   .iter()
                                                   .filter(|e| e.key().0 == project_id)
                                                   .map(|e| e.value().clone())
                                                   .collect();
        records.sort_by_key(|r| r.stage);
        Ok(records)
    }
}

/// Fachada del índice: serializa las escrituras de cada clave con un mutex
/// propio, de modo que commit e invalidación no se pisen entre tareas.
pub struct ArtifactIndex {
    store: Arc<dyn ArtifactIndexStore>,
    locks: DashMap<(Uuid, Stage), Arc<Mutex<()>>>,
}

impl ArtifactIndex {
    pub fn new(store: Arc<dyn ArtifactIndexStore>) -> Self {
        Self { store, locks: DashMap::new() }
    }

    fn key_lock(&self, project_id: Uuid, stage: Stage) -> Arc<Mutex<()>> {
        self.locks
            .entry((project_id, stage))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Registro vigente de `(proyecto, capa)`.
    pub async fn get_latest(&self, project_id: Uuid, stage: Stage) -> Result<Option<ArtifactRecord>, CoreError> {
        self.store.get(project_id, stage).await
    }

    /// Registros del proyecto en orden de pipeline.
    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<ArtifactRecord>, CoreError> {
        self.store.list_for_project(project_id).await
    }

    /// Reemplaza el registro de la clave y devuelve el content hash del
    /// registro desplazado. La escritura anterior queda intacta si `put` falla.
    pub async fn commit(&self, record: ArtifactRecord) -> Result<CommitOutcome, CoreError> {
        let lock = self.key_lock(record.project_id, record.stage);
        let _guard = lock.lock().await;
        let previous = self.store.get(record.project_id, record.stage).await?;
        self.store.put(record.clone()).await?;
        Ok(CommitOutcome { record,
                           previous_content_hash: previous.map(|r| r.content_hash) })
    }

    /// Marca `Stale` el registro de la clave. Devuelve `true` si había un
    /// registro `Ready` que transicionó; `false` si no había nada que marcar.
    pub async fn mark_stale(&self, project_id: Uuid, stage: Stage) -> Result<bool, CoreError> {
        let lock = self.key_lock(project_id, stage);
        let _guard = lock.lock().await;
        match self.store.get(project_id, stage).await? {
            Some(mut record) if record.status == ArtifactStatus::Ready => {
                record.status = ArtifactStatus::Stale;
                self.store.put(record).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Revalida un registro marcado `Stale` cuyo fingerprint almacenado sigue
    /// coincidiendo con el resuelto: los insumos no cambiaron en los hechos,
    /// así que vuelve a `Ready` sin recomputar. Devuelve el registro vigente
    /// sólo si el fingerprint coincide.
    pub async fn revalidate(&self,
                            project_id: Uuid,
                            stage: Stage,
                            resolved_fingerprint: &str)
                            -> Result<Option<ArtifactRecord>, CoreError> {
        let lock = self.key_lock(project_id, stage);
        let _guard = lock.lock().await;
        match self.store.get(project_id, stage).await? {
            Some(mut record) if record.fingerprint == resolved_fingerprint => {
                if record.status == ArtifactStatus::Stale {
                    record.status = ArtifactStatus::Ready;
                    self.store.put(record.clone()).await?;
                }
                Ok(Some(record))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn record(project_id: Uuid, stage: Stage, fingerprint: &str, content_hash: &str) -> ArtifactRecord {
        ArtifactRecord { project_id,
                         stage,
                         fingerprint: fingerprint.to_string(),
                         content_hash: content_hash.to_string(),
                         location: format!("{project_id}/{}/x.gltf", stage.folder_name()),
                         status: ArtifactStatus::Ready,
                         payload: json!({}),
                         summary: None,
                         created_at: Utc::now() }
    }

    #[tokio::test]
    async fn test_commit_reports_previous_content_hash() {
        let index = ArtifactIndex::new(Arc::new(InMemoryArtifactIndexStore::new()));
        let project = Uuid::new_v4();

        let first = index.commit(record(project, Stage::Streets, "fp-a", "content-a"))
                         .await
                         .ok()
                         .filter(|o| o.previous_content_hash.is_none() && o.content_changed());
        assert!(first.is_some());

        let second = index.commit(record(project, Stage::Streets, "fp-b", "content-a")).await;
        let outcome = second.ok().filter(|o| !o.content_changed());
        assert!(outcome.is_some(), "mismo contenido no debe contar como cambio");

        let third = index.commit(record(project, Stage::Streets, "fp-c", "content-c")).await;
        assert!(third.ok().filter(|o| o.content_changed()).is_some());
    }

    #[tokio::test]
    async fn test_mark_stale_only_flips_ready_records() {
        let index = ArtifactIndex::new(Arc::new(InMemoryArtifactIndexStore::new()));
        let project = Uuid::new_v4();

        assert_eq!(index.mark_stale(project, Stage::Clusters).await.ok(), Some(false));

        index.commit(record(project, Stage::Clusters, "fp", "content"))
             .await
             .ok();
        assert_eq!(index.mark_stale(project, Stage::Clusters).await.ok(), Some(true));
        assert_eq!(index.mark_stale(project, Stage::Clusters).await.ok(), Some(false));

        let stored = index.get_latest(project, Stage::Clusters).await.ok().flatten();
        assert_eq!(stored.map(|r| r.status), Some(ArtifactStatus::Stale));
    }

    #[tokio::test]
    async fn test_revalidate_recovers_stale_record_on_matching_fingerprint() {
        let index = ArtifactIndex::new(Arc::new(InMemoryArtifactIndexStore::new()));
        let project = Uuid::new_v4();
        index.commit(record(project, Stage::Subdivision, "fp-a", "content")).await.ok();
        index.mark_stale(project, Stage::Subdivision).await.ok();

        assert!(index.revalidate(project, Stage::Subdivision, "fp-other")
                     .await
                     .unwrap_or(None)
                     .is_none());
        let recovered = index.revalidate(project, Stage::Subdivision, "fp-a").await.unwrap_or(None);
        assert_eq!(recovered.map(|r| r.status), Some(ArtifactStatus::Ready));
    }

    #[tokio::test]
    async fn test_list_for_project_orders_by_pipeline() {
        let index = ArtifactIndex::new(Arc::new(InMemoryArtifactIndexStore::new()));
        let project = Uuid::new_v4();
        for stage in [Stage::Footprint, Stage::Streets, Stage::Subdivision] {
            index.commit(record(project, stage, "fp", "content")).await.ok();
        }
        index.commit(record(Uuid::new_v4(), Stage::Streets, "fp", "content"))
             .await
             .ok();

        let listed = index.list_for_project(project).await.unwrap_or_default();
        let stages: Vec<Stage> = listed.iter().map(|r| r.stage).collect();
        assert_eq!(stages, vec![Stage::Streets, Stage::Subdivision, Stage::Footprint]);
    }
}
