//! Modelos neutrales del pipeline: artifacts, fingerprints, jobs e insumos
//! resueltos.

pub mod artifact;
pub mod fingerprint;
pub mod job;
pub mod resolved;

pub use artifact::{ArtifactRecord, ArtifactStatus};
pub use fingerprint::StageFingerprintInput;
pub use job::{GenerationJob, JobState};
pub use resolved::ResolvedInputs;
