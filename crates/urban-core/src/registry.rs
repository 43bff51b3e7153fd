//! Registro de proyectos: alta, consulta, mutación y archivado.
//!
//! El registro es dueño del ciclo de vida del proyecto y del render del
//! sitio. Reglas que custodia:
//! - Alta atómica: si el render del sitio falla, no queda registro a medias.
//! - Mutación serializada por proyecto (lock propio por `Uuid`).
//! - Cambio de fingerprint base => invalidación de todas las capas.
//! - `Archived` es terminal: rechaza mutaciones posteriores.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use urban_domain::{NewProject, Project, ProjectPatch};

use crate::constants::MEDIA_TYPE_GLTF;
use crate::engine::GeometryEngine;
use crate::errors::CoreError;
use crate::invalidation::InvalidationManager;
use crate::storage::{site_object_key, ObjectStore};

/// Persistencia de proyectos.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Alta de un proyecto nuevo. Falla si el id ya existe.
    async fn insert(&self, project: Project) -> Result<(), CoreError>;
    /// Reemplaza un proyecto existente.
    async fn save(&self, project: Project) -> Result<(), CoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<Project>, CoreError>;
    async fn list(&self) -> Result<Vec<Project>, CoreError>;
}

/// Implementación en memoria sobre `DashMap`.
pub struct InMemoryProjectStore {
    inner: DashMap<Uuid, Project>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self { inner: DashMap::new() }
    }
}

impl Default for InMemoryProjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn insert(&self, project: Project) -> Result<(), CoreError> {
        match self.inner.entry(project.id()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(CoreError::Internal(format!("project {} already registered", project.id())))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(project);
                Ok(())
            }
        }
    }

    async fn save(&self, project: Project) -> Result<(), CoreError> {
        self.inner.insert(project.id(), project);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Project>, CoreError> {
        Ok(self.inner.get(&id).map(|p| p.clone()))
    }

    async fn list(&self) -> Result<Vec<Project>, CoreError> {
        let mut projects: Vec<Project> = self.inner.iter().map(|e| e.value().clone()).collect();
        projects.sort_by_key(|p| p.created_at());
        Ok(projects)
    }
}

pub struct ProjectRegistry {
    store: Arc<dyn ProjectStore>,
    engine: Arc<dyn GeometryEngine>,
    objects: Arc<dyn ObjectStore>,
    invalidation: Arc<InvalidationManager>,
    update_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ProjectRegistry {
    pub fn new(store: Arc<dyn ProjectStore>,
               engine: Arc<dyn GeometryEngine>,
               objects: Arc<dyn ObjectStore>,
               invalidation: Arc<InvalidationManager>)
               -> Self {
        Self { store,
               engine,
               objects,
               invalidation,
               update_locks: DashMap::new() }
    }

    fn update_lock(&self, id: Uuid) -> Arc<Mutex<()>> {
        self.update_locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Renderiza el sitio y lo publica en el object store. Devuelve la URL
    /// emitida, o `None` si el proyecto aún no tiene geometría base.
    async fn render_site_file(&self, project: &Project) -> Result<Option<String>, CoreError> {
        let (Some(site), Some(base_fingerprint)) = (project.site(), project.base_fingerprint()) else {
            return Ok(None);
        };
        let mesh = self.engine
                       .render_site(site, project.roads(), project.parameters())
                       .await
                       .map_err(|err| CoreError::Generation(err.to_string()))?;
        let key = site_object_key(project.id(), base_fingerprint);
        let stored = self.objects.put(&key, mesh, MEDIA_TYPE_GLTF).await?;
        Ok(Some(stored.url))
    }

    /// Alta de proyecto. Con geometría base el sitio se renderiza antes de
    /// registrar: o quedan registro y malla, o ninguno.
    ///
    /// # Errores
    /// `Validation` si nombre/geometría/parámetros no validan; `Generation`
    /// si el render del sitio falla.
    pub async fn create_project(&self, spec: NewProject) -> Result<Project, CoreError> {
        let mut project = Project::new(spec)?;
        if let Some(url) = self.render_site_file(&project).await? {
            project = project.promoted_ready(url)?;
        }
        self.store.insert(project.clone()).await?;
        Ok(project)
    }

    pub async fn get_project(&self, id: Uuid) -> Result<Project, CoreError> {
        self.store.get(id).await?.ok_or(CoreError::NotFound(id))
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, CoreError> {
        self.store.list().await
    }

    /// Mutación parcial. Si el patch cambia el fingerprint base se re-renderiza
    /// el sitio y se marcan `Stale` todas las capas del proyecto.
    ///
    /// # Errores
    /// `ProjectArchived` si el proyecto está archivado; `Validation` si el
    /// patch no valida.
    pub async fn update_project(&self, id: Uuid, patch: ProjectPatch) -> Result<Project, CoreError> {
        let lock = self.update_lock(id);
        let _guard = lock.lock().await;

        let current = self.get_project(id).await?;
        if current.is_archived() {
            return Err(CoreError::ProjectArchived(id));
        }
        let fingerprint_before = current.base_fingerprint().map(str::to_string);
        let mut updated = current.apply(patch)?;
        if updated.site_file().is_none() {
            if let Some(url) = self.render_site_file(&updated).await? {
                updated = updated.promoted_ready(url)?;
            }
        }
        self.store.save(updated.clone()).await?;

        let fingerprint_changed = updated.base_fingerprint().map(str::to_string) != fingerprint_before;
        if fingerprint_changed {
            self.invalidation.invalidate_from_base(id).await?;
        }
        Ok(updated)
    }

    /// Archiva el proyecto. Idempotente; los artifacts existentes se conservan
    /// y siguen siendo legibles.
    pub async fn archive_project(&self, id: Uuid) -> Result<Project, CoreError> {
        let lock = self.update_lock(id);
        let _guard = lock.lock().await;

        let archived = self.get_project(id).await?.archived();
        self.store.save(archived.clone()).await?;
        Ok(archived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, EngineOutput};
    use crate::index::{ArtifactIndex, InMemoryArtifactIndexStore};
    use crate::model::{ArtifactRecord, ArtifactStatus, ResolvedInputs};
    use crate::stage::Stage;
    use crate::storage::InMemoryObjectStore;
    use chrono::Utc;
    use serde_json::json;
    use urban_domain::{Point, ProjectParameters, RoadNetwork, SiteRing};

    struct StubEngine;

    #[async_trait]
    impl GeometryEngine for StubEngine {
        async fn compute(&self, _stage: Stage, _inputs: &ResolvedInputs) -> Result<EngineOutput, EngineError> {
            Ok(EngineOutput { mesh: b"mesh".to_vec(),
                              payload: json!({}),
                              summary: None })
        }

        async fn render_site(&self,
                             _site: &SiteRing,
                             _roads: Option<&RoadNetwork>,
                             _parameters: &ProjectParameters)
                             -> Result<Vec<u8>, EngineError> {
            Ok(b"site-mesh".to_vec())
        }
    }

    fn site() -> SiteRing {
        SiteRing::new(vec![Point::new(0.0, 0.0),
                           Point::new(0.002, 0.0),
                           Point::new(0.002, 0.001),
                           Point::new(0.0, 0.001)]).unwrap()
    }

    fn fixture() -> (ProjectRegistry, Arc<ArtifactIndex>) {
        let index = Arc::new(ArtifactIndex::new(Arc::new(InMemoryArtifactIndexStore::new())));
        let registry = ProjectRegistry::new(Arc::new(InMemoryProjectStore::new()),
                                            Arc::new(StubEngine),
                                            Arc::new(InMemoryObjectStore::new()),
                                            Arc::new(InvalidationManager::new(index.clone())));
        (registry, index)
    }

    #[tokio::test]
    async fn test_create_with_geometry_promotes_to_ready() {
        let (registry, _) = fixture();
        let project = registry.create_project(NewProject { name: "Centro".into(),
                                                           site: Some(site()),
                                                           ..NewProject::default() })
                              .await
                              .unwrap();
        assert_eq!(project.lifecycle(), urban_domain::LifecycleState::Ready);
        assert!(project.site_file().is_some());
        assert!(project.base_fingerprint().is_some());

        let fetched = registry.get_project(project.id()).await.unwrap();
        assert_eq!(fetched, project);
    }

    #[tokio::test]
    async fn test_create_without_geometry_stays_draft() {
        let (registry, _) = fixture();
        let project = registry.create_project(NewProject { name: "Borrador".into(),
                                                           ..NewProject::default() })
                              .await
                              .unwrap();
        assert_eq!(project.lifecycle(), urban_domain::LifecycleState::Draft);
        assert!(project.site_file().is_none());
    }

    #[tokio::test]
    async fn test_geometry_update_invalidates_all_stages() {
        let (registry, index) = fixture();
        let project = registry.create_project(NewProject { name: "Centro".into(),
                                                           site: Some(site()),
                                                           ..NewProject::default() })
                              .await
                              .unwrap();
        index.commit(ArtifactRecord { project_id: project.id(),
                                      stage: Stage::Streets,
                                      fingerprint: "fp".into(),
                                      content_hash: "content".into(),
                                      location: "x".into(),
                                      status: ArtifactStatus::Ready,
                                      payload: json!({}),
                                      summary: None,
                                      created_at: Utc::now() })
             .await
             .ok();

        let moved = SiteRing::new(vec![Point::new(0.0, 0.0),
                                       Point::new(0.004, 0.0),
                                       Point::new(0.004, 0.002),
                                       Point::new(0.0, 0.002)]).unwrap();
        let updated = registry.update_project(project.id(),
                                              ProjectPatch { site: Some(moved),
                                                             ..ProjectPatch::default() })
                              .await
                              .unwrap();
        assert_ne!(updated.base_fingerprint(), project.base_fingerprint());
        assert!(updated.site_file().is_some(), "el sitio se re-renderiza tras el cambio");

        let record = index.get_latest(project.id(), Stage::Streets).await.unwrap();
        assert_eq!(record.map(|r| r.status), Some(ArtifactStatus::Stale));
    }

    #[tokio::test]
    async fn test_rename_keeps_artifacts_fresh() {
        let (registry, index) = fixture();
        let project = registry.create_project(NewProject { name: "Centro".into(),
                                                           site: Some(site()),
                                                           ..NewProject::default() })
                              .await
                              .unwrap();
        index.commit(ArtifactRecord { project_id: project.id(),
                                      stage: Stage::Streets,
                                      fingerprint: "fp".into(),
                                      content_hash: "content".into(),
                                      location: "x".into(),
                                      status: ArtifactStatus::Ready,
                                      payload: json!({}),
                                      summary: None,
                                      created_at: Utc::now() })
             .await
             .ok();

        let updated = registry.update_project(project.id(),
                                              ProjectPatch { name: Some("Centro Norte".into()),
                                                             ..ProjectPatch::default() })
                              .await
                              .unwrap();
        assert_eq!(updated.base_fingerprint(), project.base_fingerprint());
        assert_eq!(updated.site_file(), project.site_file());

        let record = index.get_latest(project.id(), Stage::Streets).await.unwrap();
        assert_eq!(record.map(|r| r.status), Some(ArtifactStatus::Ready));
    }

    #[tokio::test]
    async fn test_archived_project_rejects_updates() {
        let (registry, _) = fixture();
        let project = registry.create_project(NewProject { name: "Centro".into(),
                                                           site: Some(site()),
                                                           ..NewProject::default() })
                              .await
                              .unwrap();
        let archived = registry.archive_project(project.id()).await.unwrap();
        assert!(archived.is_archived());

        let err = registry.update_project(project.id(),
                                          ProjectPatch { name: Some("x".into()),
                                                         ..ProjectPatch::default() })
                          .await
                          .unwrap_err();
        assert_eq!(err, CoreError::ProjectArchived(project.id()));

        // archivar de nuevo es inocuo
        assert!(registry.archive_project(project.id()).await.unwrap().is_archived());
    }

    #[tokio::test]
    async fn test_missing_project_is_not_found() {
        let (registry, _) = fixture();
        let id = Uuid::new_v4();
        assert_eq!(registry.get_project(id).await.unwrap_err(), CoreError::NotFound(id));
    }
}
