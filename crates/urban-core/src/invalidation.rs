//! Propagación de staleness sobre el grafo de capas.
//!
//! Marcar `Stale` nunca borra artifacts: el registro y su mesh siguen
//! servibles hasta que una regeneración los reemplace.

use std::sync::Arc;

use uuid::Uuid;

use crate::errors::CoreError;
use crate::index::ArtifactIndex;
use crate::stage::{InvalidationOrigin, Stage, StageGraph};

pub struct InvalidationManager {
    index: Arc<ArtifactIndex>,
}

impl InvalidationManager {
    pub fn new(index: Arc<ArtifactIndex>) -> Self {
        Self { index }
    }

    /// Marca `Stale` la clausura de invalidación del origen, en orden
    /// topológico. Devuelve las capas cuyo registro transicionó.
    pub async fn invalidate(&self, project_id: Uuid, origin: InvalidationOrigin) -> Result<Vec<Stage>, CoreError> {
        let mut flipped = Vec::new();
        for stage in StageGraph::invalidation_closure(origin) {
            if self.index.mark_stale(project_id, stage).await? {
                flipped.push(stage);
            }
        }
        Ok(flipped)
    }

    /// Invalidación por cambio de geometría base: afecta todas las capas.
    pub async fn invalidate_from_base(&self, project_id: Uuid) -> Result<Vec<Stage>, CoreError> {
        self.invalidate(project_id, InvalidationOrigin::BaseGeometry).await
    }

    /// Invalidación por cambio del contenido de una capa: afecta sólo a sus
    /// dependientes transitivos.
    pub async fn invalidate_from_stage(&self, project_id: Uuid, stage: Stage) -> Result<Vec<Stage>, CoreError> {
        self.invalidate(project_id, InvalidationOrigin::Stage(stage)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ArtifactIndexStore, InMemoryArtifactIndexStore};
    use crate::model::{ArtifactRecord, ArtifactStatus};
    use chrono::Utc;
    use serde_json::json;

    async fn seed(index: &ArtifactIndex, project_id: Uuid, stages: &[Stage]) {
        for stage in stages {
            index.commit(ArtifactRecord { project_id,
                                          stage: *stage,
                                          fingerprint: "fp".into(),
                                          content_hash: "content".into(),
                                          location: format!("{project_id}/{}/x.gltf", stage.folder_name()),
                                          status: ArtifactStatus::Ready,
                                          payload: json!({}),
                                          summary: None,
                                          created_at: Utc::now() })
                 .await
                 .ok();
        }
    }

    #[tokio::test]
    async fn test_base_change_invalidates_every_ready_stage() {
        let store = Arc::new(InMemoryArtifactIndexStore::new());
        let index = Arc::new(ArtifactIndex::new(store));
        let manager = InvalidationManager::new(index.clone());
        let project = Uuid::new_v4();
        seed(&index, project, &Stage::ALL).await;

        let flipped = manager.invalidate_from_base(project).await.unwrap_or_default();
        assert_eq!(flipped.len(), Stage::ALL.len());
        for stage in Stage::ALL {
            let record = index.get_latest(project, stage).await.ok().flatten();
            assert_eq!(record.map(|r| r.status), Some(ArtifactStatus::Stale));
        }
    }

    #[tokio::test]
    async fn test_stage_change_spares_unrelated_branches() {
        let store = Arc::new(InMemoryArtifactIndexStore::new());
        let index = Arc::new(ArtifactIndex::new(store.clone()));
        let manager = InvalidationManager::new(index.clone());
        let project = Uuid::new_v4();
        seed(&index, project, &Stage::ALL).await;

        let flipped = manager.invalidate_from_stage(project, Stage::Subdivision)
                             .await
                             .unwrap_or_default();
        assert_eq!(flipped, vec![Stage::Footprint, Stage::BuildingStart, Stage::BuildingMax]);

        for stage in [Stage::Streets, Stage::Clusters, Stage::Public, Stage::Subdivision] {
            let record = store.get(project, stage).await.ok().flatten();
            assert_eq!(record.map(|r| r.status), Some(ArtifactStatus::Ready), "{stage} no debía cambiar");
        }
    }

    #[tokio::test]
    async fn test_missing_records_are_skipped() {
        let store = Arc::new(InMemoryArtifactIndexStore::new());
        let index = Arc::new(ArtifactIndex::new(store));
        let manager = InvalidationManager::new(index.clone());
        let project = Uuid::new_v4();
        seed(&index, project, &[Stage::Streets]).await;

        let flipped = manager.invalidate_from_base(project).await.unwrap_or_default();
        assert_eq!(flipped, vec![Stage::Streets]);
    }
}
