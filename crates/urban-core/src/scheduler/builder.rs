//! Armado del pipeline: builder + fachada.
//!
//! `PipelineBuilder` cablea motor, object store y stores de persistencia
//! (en memoria por defecto) y entrega una `UrbanPipeline` lista para usar.
//! La fachada reúne las operaciones de proyecto y de generación en una sola
//! superficie; archivar pasa por aquí porque combina registro y scheduler.

use std::sync::Arc;

use uuid::Uuid;

use urban_domain::{NewProject, Project, ProjectPatch, RoadNetwork};

use crate::engine::GeometryEngine;
use crate::errors::CoreError;
use crate::event::JobEvent;
use crate::index::{ArtifactIndex, ArtifactIndexStore, InMemoryArtifactIndexStore};
use crate::invalidation::InvalidationManager;
use crate::model::ArtifactRecord;
use crate::registry::{InMemoryProjectStore, ProjectRegistry, ProjectStore};
use crate::scheduler::core::{GenerationScheduler, StageStatusView};
use crate::stage::Stage;
use crate::storage::ObjectStore;

pub struct PipelineBuilder {
    engine: Arc<dyn GeometryEngine>,
    objects: Arc<dyn ObjectStore>,
    projects: Option<Arc<dyn ProjectStore>>,
    artifacts: Option<Arc<dyn ArtifactIndexStore>>,
}

impl PipelineBuilder {
    pub fn new(engine: Arc<dyn GeometryEngine>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { engine,
               objects,
               projects: None,
               artifacts: None }
    }

    /// Store de proyectos a usar; en memoria si no se define.
    pub fn with_project_store(mut self, store: Arc<dyn ProjectStore>) -> Self {
        self.projects = Some(store);
        self
    }

    /// Store del índice de artifacts a usar; en memoria si no se define.
    pub fn with_artifact_store(mut self, store: Arc<dyn ArtifactIndexStore>) -> Self {
        self.artifacts = Some(store);
        self
    }

    pub fn build(self) -> UrbanPipeline {
        let artifacts = self.artifacts
                            .unwrap_or_else(|| Arc::new(InMemoryArtifactIndexStore::new()));
        let projects = self.projects
                           .unwrap_or_else(|| Arc::new(InMemoryProjectStore::new()));

        let index = Arc::new(ArtifactIndex::new(artifacts));
        let invalidation = Arc::new(InvalidationManager::new(index.clone()));
        let registry = Arc::new(ProjectRegistry::new(projects,
                                                     self.engine.clone(),
                                                     self.objects.clone(),
                                                     invalidation.clone()));
        let scheduler = GenerationScheduler::new(registry.clone(),
                                                 index.clone(),
                                                 invalidation,
                                                 self.engine,
                                                 self.objects.clone());
        UrbanPipeline { registry,
                        scheduler,
                        index,
                        objects: self.objects }
    }
}

/// Fachada del pipeline urbano: proyectos, generación y consultas.
#[derive(Clone)]
pub struct UrbanPipeline {
    registry: Arc<ProjectRegistry>,
    scheduler: GenerationScheduler,
    index: Arc<ArtifactIndex>,
    objects: Arc<dyn ObjectStore>,
}

impl UrbanPipeline {
    pub async fn create_project(&self, spec: NewProject) -> Result<Project, CoreError> {
        self.registry.create_project(spec).await
    }

    pub async fn get_project(&self, id: Uuid) -> Result<Project, CoreError> {
        self.registry.get_project(id).await
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, CoreError> {
        self.registry.list_projects().await
    }

    pub async fn update_project(&self, id: Uuid, patch: ProjectPatch) -> Result<Project, CoreError> {
        self.registry.update_project(id, patch).await
    }

    /// Archiva el proyecto y descarta sus jobs en vuelo.
    pub async fn archive_project(&self, id: Uuid) -> Result<Project, CoreError> {
        let archived = self.registry.archive_project(id).await?;
        self.scheduler.cancel_project(id);
        Ok(archived)
    }

    /// Genera (o sirve de cache) el artifact de una capa.
    pub async fn generate(&self,
                          project_id: Uuid,
                          stage: Stage,
                          aux_roads: Option<RoadNetwork>)
                          -> Result<ArtifactRecord, CoreError> {
        self.scheduler.request_stage(project_id, stage, aux_roads).await
    }

    /// Registro vigente de una capa sin disparar generación.
    pub async fn artifact(&self, project_id: Uuid, stage: Stage) -> Result<Option<ArtifactRecord>, CoreError> {
        self.registry.get_project(project_id).await?;
        self.index.get_latest(project_id, stage).await
    }

    pub async fn stage_status(&self, project_id: Uuid, stage: Stage) -> Result<StageStatusView, CoreError> {
        self.scheduler.stage_status(project_id, stage).await
    }

    pub async fn project_status(&self, project_id: Uuid) -> Result<Vec<StageStatusView>, CoreError> {
        self.scheduler.project_status(project_id).await
    }

    pub fn job_events(&self, project_id: Uuid) -> Vec<JobEvent> {
        self.scheduler.job_events(project_id)
    }

    /// Lee un objeto publicado (mallas del sitio y de capas).
    pub async fn read_object(&self, key: &str) -> Result<Vec<u8>, CoreError> {
        self.objects.get(key).await
    }

    pub fn registry(&self) -> &Arc<ProjectRegistry> {
        &self.registry
    }

    pub fn scheduler(&self) -> &GenerationScheduler {
        &self.scheduler
    }

    pub fn index(&self) -> &Arc<ArtifactIndex> {
        &self.index
    }
}
