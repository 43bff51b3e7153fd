//! Scheduler de generación: una computación por `(proyecto, capa, fingerprint)`.
//!
//! Secuencia de un request:
//! 1. Cargar el proyecto y validar (archivado, geometría base, vías auxiliares).
//! 2. Recorrer la cadena de ancestros en orden topológico.
//! 3. Por capa: resolver insumos, calcular fingerprint, consultar el índice.
//! 4. Cache hit => devolver el registro vigente sin computar.
//! 5. Job en vuelo con el mismo fingerprint => acoplarse y esperar su resultado.
//! 6. Job en vuelo con otro fingerprint => supersederlo y despachar el nuevo.
//!
//! La región atómica de deduplicación es la entry del `DashMap` de jobs en
//! vuelo: decidir acoplarse/supersede/despachar y publicar la entry ocurre
//! sin ceder el control, por lo que dos requests idénticos concurrentes no
//! pueden despachar dos jobs. El commit va guardado por un lock por clave:
//! un job supersedido o un proyecto archivado a mitad de cómputo descartan
//! su resultado sin tocar el índice.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::json;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use urban_domain::{Project, RoadNetwork};

use crate::constants::{JOB_LOG_CAPACITY, MEDIA_TYPE_GLTF, PIPELINE_VERSION, SUPERSEDE_RETRIES};
use crate::engine::GeometryEngine;
use crate::errors::CoreError;
use crate::event::{JobEvent, JobEventKind, JobLog};
use crate::hashing::{hash_bytes, hash_value};
use crate::index::ArtifactIndex;
use crate::invalidation::InvalidationManager;
use crate::model::{ArtifactRecord, ArtifactStatus, GenerationJob, JobState, ResolvedInputs, StageFingerprintInput};
use crate::registry::ProjectRegistry;
use crate::stage::{Stage, StageGraph, StageInput};
use crate::storage::{stage_object_key, ObjectStore};

type JobKey = (Uuid, Stage);

/// Progreso de un job publicado por su canal `watch`.
#[derive(Debug, Clone)]
pub enum JobProgress {
    Pending,
    Finished(Result<ArtifactRecord, CoreError>),
}

/// Job en vuelo: el registro del job, su canal de progreso y el handle para
/// abortarlo. Vive en el mapa entre el despacho y el commit (o descarte).
struct InFlight {
    job: GenerationJob,
    progress: watch::Sender<JobProgress>,
    abort: tokio::task::AbortHandle,
}

/// Insumos resueltos + fingerprint de una capa, listos para despachar.
struct PreparedStage {
    inputs: ResolvedInputs,
    fingerprint: String,
}

/// Vista de estado de una capa para consultas.
#[derive(Debug, Clone, Serialize)]
pub struct StageStatusView {
    pub stage: Stage,
    pub status: Option<ArtifactStatus>,
    pub fingerprint: Option<String>,
    pub location: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
    pub job_state: Option<JobState>,
}

struct Inner {
    registry: Arc<ProjectRegistry>,
    index: Arc<ArtifactIndex>,
    invalidation: Arc<InvalidationManager>,
    engine: Arc<dyn GeometryEngine>,
    objects: Arc<dyn ObjectStore>,
    in_flight: DashMap<JobKey, InFlight>,
    commit_locks: DashMap<JobKey, Arc<Mutex<()>>>,
    job_log: JobLog,
}

/// Scheduler compartible entre tareas; clonar es barato.
#[derive(Clone)]
pub struct GenerationScheduler {
    inner: Arc<Inner>,
}

impl GenerationScheduler {
    pub fn new(registry: Arc<ProjectRegistry>,
               index: Arc<ArtifactIndex>,
               invalidation: Arc<InvalidationManager>,
               engine: Arc<dyn GeometryEngine>,
               objects: Arc<dyn ObjectStore>)
               -> Self {
        Self { inner: Arc::new(Inner { registry,
                                       index,
                                       invalidation,
                                       engine,
                                       objects,
                                       in_flight: DashMap::new(),
                                       commit_locks: DashMap::new(),
                                       job_log: JobLog::new(JOB_LOG_CAPACITY) }) }
    }

    /// Punto de entrada de generación: asegura la cadena de ancestros y luego
    /// la capa pedida. Devuelve el registro vigente (recién computado o cache).
    ///
    /// # Argumentos
    /// * `aux_roads` - Red vial auxiliar del request; sólo válida para capas
    ///   que la aceptan y aplicada únicamente a la capa pedida
    ///
    /// # Errores
    /// `ProjectArchived`, `DependencyNotReady` sin geometría base,
    /// `Validation` si la aux no corresponde, `Generation` si el motor falla,
    /// `ConflictSuperseded` si el request fue desplazado repetidamente por
    /// inputs más nuevos.
    pub async fn request_stage(&self,
                               project_id: Uuid,
                               stage: Stage,
                               aux_roads: Option<RoadNetwork>)
                               -> Result<ArtifactRecord, CoreError> {
        let project = self.inner.registry.get_project(project_id).await?;
        if project.is_archived() {
            return Err(CoreError::ProjectArchived(project_id));
        }
        if !project.has_base_geometry() {
            return Err(CoreError::DependencyNotReady { stage,
                                                       missing: "base geometry".into() });
        }
        if aux_roads.is_some() && !stage.accepts_aux_roads() {
            return Err(CoreError::Validation(format!("stage {stage} does not accept an auxiliary road network")));
        }

        for ancestor in StageGraph::ancestor_chain(stage) {
            self.ensure_stage(project_id, ancestor, None).await?;
        }
        self.ensure_stage(project_id, stage, aux_roads.as_ref()).await
    }

    /// Asegura el registro fresco de una capa: cache hit, acople a un job en
    /// vuelo o despacho. Ante un supersede re-resuelve insumos y reintenta,
    /// acotado; el estado del proyecto se relee en cada intento.
    async fn ensure_stage(&self,
                          project_id: Uuid,
                          stage: Stage,
                          aux_roads: Option<&RoadNetwork>)
                          -> Result<ArtifactRecord, CoreError> {
        let mut attempts = 0;
        loop {
            let project = self.inner.registry.get_project(project_id).await?;
            if project.is_archived() {
                return Err(CoreError::ProjectArchived(project_id));
            }
            let prepared = self.prepare(&project, stage, aux_roads).await?;

            // Cache hit por fingerprint. Cubre también el registro marcado
            // `Stale` en bloque cuyo fingerprint resuelto no cambió: los
            // upstream reprodujeron el mismo contenido, no hay que recomputar.
            if let Some(record) = self.inner.index.revalidate(project_id, stage, &prepared.fingerprint).await? {
                return Ok(record);
            }

            let rx = self.join_or_dispatch(project_id, stage, prepared);
            match Self::await_job(rx).await {
                Err(CoreError::ConflictSuperseded) => {
                    attempts += 1;
                    if attempts >= SUPERSEDE_RETRIES {
                        return Err(CoreError::ConflictSuperseded);
                    }
                }
                outcome => return outcome,
            }
        }
    }

    /// Resuelve los insumos declarados de la capa y calcula su fingerprint.
    ///
    /// Los upstream aportan su *content hash* al fingerprint: una
    /// recomputación aguas arriba que reproduce el mismo contenido deja a
    /// esta capa fresca.
    async fn prepare(&self,
                     project: &Project,
                     stage: Stage,
                     aux_roads: Option<&RoadNetwork>)
                     -> Result<PreparedStage, CoreError> {
        let site = project.site()
                          .cloned()
                          .ok_or_else(|| CoreError::DependencyNotReady { stage,
                                                                         missing: "base geometry".into() })?;

        let mut base_declared = false;
        let mut upstream_pairs: Vec<(String, String)> = Vec::new();
        let mut upstream_payloads = std::collections::BTreeMap::new();
        for input in StageGraph::dependencies_of(stage) {
            match input {
                StageInput::BaseGeometry => base_declared = true,
                StageInput::Upstream(dep) => {
                    let record = self.inner
                                     .index
                                     .get_latest(project.id(), *dep)
                                     .await?
                                     .ok_or_else(|| CoreError::DependencyNotReady { stage, missing: dep.to_string() })?;
                    upstream_pairs.push((dep.as_str().to_string(), record.content_hash.clone()));
                    upstream_payloads.insert(*dep, record.payload.clone());
                }
            }
        }

        let aux_fingerprint = aux_roads.map(|roads| hash_value(&roads.to_geojson()));
        let fingerprint = StageFingerprintInput { pipeline_version: PIPELINE_VERSION,
                                                  stage: stage.as_str(),
                                                  base_fingerprint: if base_declared {
                                                      project.base_fingerprint()
                                                  } else {
                                                      None
                                                  },
                                                  upstream: &upstream_pairs,
                                                  aux_fingerprint: aux_fingerprint.as_deref() }.hash();

        Ok(PreparedStage { inputs: ResolvedInputs { site,
                                                    roads: project.roads().cloned(),
                                                    parameters: project.parameters().clone(),
                                                    upstream: upstream_payloads,
                                                    aux_roads: aux_roads.cloned() },
                           fingerprint })
    }

    /// Región atómica de deduplicación. Dentro de la entry no hay `await`:
    /// decidir y publicar el job es indivisible para otros requests.
    fn join_or_dispatch(&self, project_id: Uuid, stage: Stage, prepared: PreparedStage) -> watch::Receiver<JobProgress> {
        match self.inner.in_flight.entry((project_id, stage)) {
            Entry::Occupied(mut entry) => {
                if entry.get().job.fingerprint == prepared.fingerprint {
                    return entry.get().progress.subscribe();
                }
                // Supersede: los inputs vigentes desplazan al job en vuelo
                let (inflight, rx) = self.spawn_job(project_id, stage, prepared);
                let old = entry.insert(inflight);
                old.abort.abort();
                self.inner.job_log.append(old.job.id,
                                          project_id,
                                          stage,
                                          JobEventKind::JobDiscarded { reason: "superseded by newer inputs".to_string() });
                old.progress.send_replace(JobProgress::Finished(Err(CoreError::ConflictSuperseded)));
                rx
            }
            Entry::Vacant(slot) => {
                let (inflight, rx) = self.spawn_job(project_id, stage, prepared);
                slot.insert(inflight);
                rx
            }
        }
    }

    fn spawn_job(&self, project_id: Uuid, stage: Stage, prepared: PreparedStage) -> (InFlight, watch::Receiver<JobProgress>) {
        let job = GenerationJob::new(project_id, stage, prepared.fingerprint.clone());
        let (tx, rx) = watch::channel(JobProgress::Pending);
        self.inner.job_log.append(job.id,
                                  project_id,
                                  stage,
                                  JobEventKind::JobQueued { fingerprint: job.fingerprint.clone() });

        let scheduler = self.clone();
        let task_job = job.clone();
        let task_tx = tx.clone();
        let handle = tokio::spawn(async move {
            scheduler.run_job(task_job, prepared.inputs, task_tx).await;
        });

        (InFlight { job,
                    progress: tx,
                    abort: handle.abort_handle() },
         rx)
    }

    async fn run_job(&self, job: GenerationJob, inputs: ResolvedInputs, tx: watch::Sender<JobProgress>) {
        let key = (job.project_id, job.stage);
        if let Some(mut entry) = self.inner.in_flight.get_mut(&key) {
            if entry.job.id == job.id {
                entry.job.state = JobState::Running;
                entry.job.started_at = Some(Utc::now());
            }
        }
        self.inner.job_log.append(job.id, job.project_id, job.stage, JobEventKind::JobStarted);

        match self.execute(&job, inputs).await {
            Ok(record) => {
                self.inner.job_log.append(job.id,
                                          job.project_id,
                                          job.stage,
                                          JobEventKind::JobFinished { fingerprint: record.fingerprint.clone(),
                                                                      content_hash: record.content_hash.clone() });
                tx.send_replace(JobProgress::Finished(Ok(record)));
            }
            Err(err) => {
                match err {
                    // descartes: el evento ya quedó en el log dentro del guard
                    CoreError::ConflictSuperseded | CoreError::ProjectArchived(_) => {}
                    ref failure => {
                        self.inner.job_log.append(job.id,
                                                  job.project_id,
                                                  job.stage,
                                                  JobEventKind::JobFailed { error: failure.to_string() });
                    }
                }
                self.inner.in_flight.remove_if(&key, |_, inflight| inflight.job.id == job.id);
                tx.send_replace(JobProgress::Finished(Err(err)));
            }
        }
    }

    /// Computa, publica el mesh y hace el commit guardado. Ante fallo del
    /// motor el índice no se toca: el artifact previo queda servible.
    async fn execute(&self, job: &GenerationJob, inputs: ResolvedInputs) -> Result<ArtifactRecord, CoreError> {
        let output = self.inner
                         .engine
                         .compute(job.stage, &inputs)
                         .await
                         .map_err(|err| CoreError::Generation(err.to_string()))?;

        let content_hash = hash_value(&json!({
            "payload": output.payload,
            "mesh": hash_bytes(&output.mesh),
        }));
        let object_key = stage_object_key(job.project_id, job.stage, &job.fingerprint);
        let stored = self.inner.objects.put(&object_key, output.mesh, MEDIA_TYPE_GLTF).await?;

        let record = ArtifactRecord { project_id: job.project_id,
                                      stage: job.stage,
                                      fingerprint: job.fingerprint.clone(),
                                      content_hash,
                                      location: stored.url,
                                      status: ArtifactStatus::Ready,
                                      payload: output.payload,
                                      summary: output.summary,
                                      created_at: Utc::now() };
        self.guarded_commit(job, record).await
    }

    /// Commit bajo lock por clave. Verifica que el job siga siendo el vigente
    /// y que el proyecto no se haya archivado; recién entonces escribe el
    /// índice y, si el contenido cambió, marca `Stale` a los dependientes.
    async fn guarded_commit(&self, job: &GenerationJob, record: ArtifactRecord) -> Result<ArtifactRecord, CoreError> {
        let key = (job.project_id, job.stage);
        let lock = self.commit_lock(key);
        let _guard = lock.lock().await;

        let still_current = self.inner
                                .in_flight
                                .get(&key)
                                .map(|inflight| inflight.job.id == job.id)
                                .unwrap_or(false);
        if !still_current {
            self.inner.job_log.append(job.id,
                                      job.project_id,
                                      job.stage,
                                      JobEventKind::JobDiscarded { reason: "stale result at commit".to_string() });
            return Err(CoreError::ConflictSuperseded);
        }

        let project = self.inner.registry.get_project(job.project_id).await?;
        if project.is_archived() {
            self.inner.job_log.append(job.id,
                                      job.project_id,
                                      job.stage,
                                      JobEventKind::JobDiscarded { reason: "project archived".to_string() });
            self.inner.in_flight.remove_if(&key, |_, inflight| inflight.job.id == job.id);
            return Err(CoreError::ProjectArchived(job.project_id));
        }

        let outcome = self.inner.index.commit(record).await?;
        self.inner.in_flight.remove_if(&key, |_, inflight| inflight.job.id == job.id);
        if outcome.content_changed() {
            self.inner.invalidation.invalidate_from_stage(job.project_id, job.stage).await?;
        }
        Ok(outcome.record)
    }

    fn commit_lock(&self, key: JobKey) -> Arc<Mutex<()>> {
        self.inner
            .commit_locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Espera el desenlace de un job por su canal de progreso.
    async fn await_job(mut rx: watch::Receiver<JobProgress>) -> Result<ArtifactRecord, CoreError> {
        loop {
            let current = rx.borrow_and_update().clone();
            if let JobProgress::Finished(outcome) = current {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // el emisor murió sin publicar resultado
                let last = rx.borrow().clone();
                return match last {
                    JobProgress::Finished(outcome) => outcome,
                    JobProgress::Pending => Err(CoreError::Generation("generation was cancelled".to_string())),
                };
            }
        }
    }

    /// Aborta y descarta los jobs en vuelo del proyecto. Los que esperaban
    /// reciben `ProjectArchived`.
    pub fn cancel_project(&self, project_id: Uuid) {
        let keys: Vec<JobKey> = self.inner
                                    .in_flight
                                    .iter()
                                    .filter(|entry| entry.key().0 == project_id)
                                    .map(|entry| *entry.key())
                                    .collect();
        for key in keys {
            if let Some((_, inflight)) = self.inner.in_flight.remove(&key) {
                inflight.abort.abort();
                self.inner.job_log.append(inflight.job.id,
                                          project_id,
                                          key.1,
                                          JobEventKind::JobDiscarded { reason: "project archived".to_string() });
                inflight.progress
                        .send_replace(JobProgress::Finished(Err(CoreError::ProjectArchived(project_id))));
            }
        }
    }

    /// Estado de una capa: registro vigente + job en vuelo, si lo hay. El
    /// estado terminal del último job se reconstruye del log.
    pub async fn stage_status(&self, project_id: Uuid, stage: Stage) -> Result<StageStatusView, CoreError> {
        self.inner.registry.get_project(project_id).await?;
        let record = self.inner.index.get_latest(project_id, stage).await?;
        let live = self.inner
                       .in_flight
                       .get(&(project_id, stage))
                       .map(|inflight| inflight.job.state);
        let job_state = live.or_else(|| {
                                self.inner
                                    .job_log
                                    .list_for(project_id)
                                    .iter()
                                    .rev()
                                    .find(|event| event.stage == stage)
                                    .and_then(|event| match &event.kind {
                                        JobEventKind::JobFinished { .. } => Some(JobState::Succeeded),
                                        JobEventKind::JobFailed { .. } | JobEventKind::JobDiscarded { .. } => {
                                            Some(JobState::Failed)
                                        }
                                        JobEventKind::JobQueued { .. } | JobEventKind::JobStarted => None,
                                    })
                            });
        Ok(StageStatusView { stage,
                             status: record.as_ref().map(|r| r.status),
                             fingerprint: record.as_ref().map(|r| r.fingerprint.clone()),
                             location: record.as_ref().map(|r| r.location.clone()),
                             generated_at: record.as_ref().map(|r| r.created_at),
                             job_state })
    }

    /// Estado de las siete capas del proyecto, en orden de pipeline.
    pub async fn project_status(&self, project_id: Uuid) -> Result<Vec<StageStatusView>, CoreError> {
        let mut views = Vec::with_capacity(Stage::ALL.len());
        for stage in Stage::ALL {
            views.push(self.stage_status(project_id, stage).await?);
        }
        Ok(views)
    }

    /// Ventana de eventos de jobs del proyecto.
    pub fn job_events(&self, project_id: Uuid) -> Vec<JobEvent> {
        self.inner.job_log.list_for(project_id)
    }
}
