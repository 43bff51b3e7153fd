//! urban-core: scheduler determinista del pipeline de geometría urbana
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod index;
pub mod invalidation;
pub mod model;
pub mod registry;
pub mod scheduler;
pub mod stage;
pub mod storage;

pub use engine::{EngineError, EngineOutput, GeometryEngine};
pub use errors::CoreError;
pub use event::{JobEvent, JobEventKind, JobLog};
pub use index::{ArtifactIndex, ArtifactIndexStore, CommitOutcome, InMemoryArtifactIndexStore};
pub use invalidation::InvalidationManager;
pub use model::{ArtifactRecord, ArtifactStatus, GenerationJob, JobState, ResolvedInputs, StageFingerprintInput};
pub use registry::{InMemoryProjectStore, ProjectRegistry, ProjectStore};
pub use scheduler::{GenerationScheduler, JobProgress, PipelineBuilder, StageStatusView, UrbanPipeline};
pub use stage::{InvalidationOrigin, Stage, StageGraph, StageInput};
pub use storage::{site_object_key, stage_object_key, InMemoryObjectStore, ObjectStore, StoredObject};
