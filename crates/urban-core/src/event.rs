//! Log de eventos de jobs (auditoría en memoria).
//!
//! El estado del pipeline vive en registros con fingerprint, no en un event
//! log; este módulo sólo conserva una ventana acotada de transiciones de
//! jobs para observabilidad y tests (p. ej. verificar que dos requests
//! idénticos concurrentes produjeron un único `JobStarted`).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

use crate::stage::Stage;

/// Transiciones observables de un job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum JobEventKind {
    JobQueued { fingerprint: String },
    JobStarted,
    JobFinished { fingerprint: String, content_hash: String },
    JobFailed { error: String },
    JobDiscarded { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct JobEvent {
    pub seq: u64,
    pub job_id: Uuid,
    pub project_id: Uuid,
    pub stage: Stage,
    pub kind: JobEventKind,
    pub ts: DateTime<Utc>,
}

/// Buffer circular de eventos, acotado por capacidad.
pub struct JobLog {
    inner: Mutex<LogState>,
    capacity: usize,
}

struct LogState {
    events: VecDeque<JobEvent>,
    next_seq: u64,
}

impl JobLog {
    pub fn new(capacity: usize) -> Self {
        JobLog { inner: Mutex::new(LogState { events: VecDeque::new(),
                                              next_seq: 0 }),
                 capacity }
    }

    pub fn append(&self, job_id: Uuid, project_id: Uuid, stage: Stage, kind: JobEventKind) {
        let Ok(mut state) = self.inner.lock() else {
            return;
        };
        let seq = state.next_seq;
        state.next_seq += 1;
        state.events.push_back(JobEvent { seq,
                                          job_id,
                                          project_id,
                                          stage,
                                          kind,
                                          ts: Utc::now() });
        while state.events.len() > self.capacity {
            state.events.pop_front();
        }
    }

    /// Eventos de un proyecto en orden ascendente por seq.
    pub fn list_for(&self, project_id: Uuid) -> Vec<JobEvent> {
        match self.inner.lock() {
            Ok(state) => state.events.iter().filter(|event| event.project_id == project_id).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_is_bounded_and_ordered() {
        let log = JobLog::new(3);
        let project = Uuid::new_v4();
        for i in 0..5u8 {
            log.append(Uuid::new_v4(), project, Stage::Streets, JobEventKind::JobFailed { error: format!("e{i}") });
        }
        let events = log.list_for(project);
        assert_eq!(events.len(), 3);
        assert!(events.windows(2).all(|pair| pair[0].seq < pair[1].seq));
        assert_eq!(events[0].kind, JobEventKind::JobFailed { error: "e2".to_string() });
    }

    #[test]
    fn test_list_filters_by_project() {
        let log = JobLog::new(8);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        log.append(Uuid::new_v4(), a, Stage::Clusters, JobEventKind::JobStarted);
        log.append(Uuid::new_v4(), b, Stage::Clusters, JobEventKind::JobStarted);
        assert_eq!(log.list_for(a).len(), 1);
        assert_eq!(log.list_for(b).len(), 1);
    }
}
