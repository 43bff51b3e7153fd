//! Recuperación tras reinicio: un store recién construido sobre el mismo
//! directorio de datos debe ver exactamente el estado comprometido antes del
//! corte, sin pasos de reparación.

use chrono::Utc;
use serde_json::json;
use tempfile::tempdir;
use urban_core::{stage_object_key, ArtifactIndex, ArtifactIndexStore, ArtifactRecord, ArtifactStatus, ObjectStore,
                 ProjectStore, Stage};
use urban_domain::{NewProject, Point, Project, SiteRing};
use urban_persistence::{FsArtifactIndexStore, FsObjectStore, FsProjectStore};

use std::sync::Arc;

fn site() -> SiteRing {
    SiteRing::new(vec![Point::new(0.0, 0.0),
                       Point::new(0.002, 0.0),
                       Point::new(0.002, 0.001),
                       Point::new(0.0, 0.001)]).unwrap()
}

fn project(name: &str) -> Project {
    Project::new(NewProject { name: name.to_string(),
                              site: Some(site()),
                              ..NewProject::default() }).unwrap()
}

fn record(project_id: uuid::Uuid, stage: Stage, fingerprint: &str) -> ArtifactRecord {
    ArtifactRecord { project_id,
                     stage,
                     fingerprint: fingerprint.to_string(),
                     content_hash: format!("content-{fingerprint}"),
                     location: stage_object_key(project_id, stage, fingerprint),
                     status: ArtifactStatus::Ready,
                     payload: json!({ "schema_version": 1 }),
                     summary: None,
                     created_at: Utc::now() }
}

#[tokio::test]
async fn projects_survive_a_store_reopen() {
    let dir = tempdir().unwrap();
    let original = project("Barrio Norte");

    {
        let store = FsProjectStore::new(dir.path());
        store.insert(original.clone()).await.unwrap();
    }

    let reopened = FsProjectStore::new(dir.path());
    let loaded = reopened.get(original.id()).await.unwrap().unwrap();
    assert_eq!(loaded.id(), original.id());
    assert_eq!(loaded.name(), original.name());
    assert_eq!(loaded.base_fingerprint(), original.base_fingerprint());
    assert_eq!(loaded.lifecycle(), original.lifecycle());
    assert_eq!(loaded.created_at(), original.created_at());
}

#[tokio::test]
async fn index_records_survive_a_store_reopen() {
    let dir = tempdir().unwrap();
    let project_id = uuid::Uuid::new_v4();
    let committed = record(project_id, Stage::Clusters, "fp-abc");

    {
        let store = FsArtifactIndexStore::new(dir.path());
        store.put(committed.clone()).await.unwrap();
    }

    let reopened = FsArtifactIndexStore::new(dir.path());
    let loaded = reopened.get(project_id, Stage::Clusters).await.unwrap();
    assert_eq!(loaded, Some(committed));
    assert_eq!(reopened.get(project_id, Stage::Streets).await.unwrap(), None);
}

#[tokio::test]
async fn stale_marks_survive_a_store_reopen() {
    let dir = tempdir().unwrap();
    let project_id = uuid::Uuid::new_v4();

    {
        let index = ArtifactIndex::new(Arc::new(FsArtifactIndexStore::new(dir.path())));
        index.commit(record(project_id, Stage::Streets, "fp-a")).await.unwrap();
        index.mark_stale(project_id, Stage::Streets).await.unwrap();
    }

    let index = ArtifactIndex::new(Arc::new(FsArtifactIndexStore::new(dir.path())));
    let loaded = index.get_latest(project_id, Stage::Streets).await.unwrap().unwrap();
    assert_eq!(loaded.status, ArtifactStatus::Stale);

    // el fingerprint persistido permite revalidar sin recomputar
    let recovered = index.revalidate(project_id, Stage::Streets, "fp-a").await.unwrap();
    assert_eq!(recovered.map(|r| r.status), Some(ArtifactStatus::Ready));
}

#[tokio::test]
async fn objects_survive_a_store_reopen_and_keep_their_url() {
    let dir = tempdir().unwrap();
    let project_id = uuid::Uuid::new_v4();
    let key = stage_object_key(project_id, Stage::Streets, "fp-abc");

    let issued = {
        let store = FsObjectStore::new(dir.path(), "http://localhost:8000");
        store.put(&key, b"glTF-bytes".to_vec(), "model/gltf+json").await.unwrap()
    };

    let reopened = FsObjectStore::new(dir.path(), "http://localhost:8000");
    assert_eq!(reopened.get(&key).await.unwrap(), b"glTF-bytes");
    assert_eq!(issued.url, format!("http://localhost:8000/files/{key}"));
}

#[tokio::test]
async fn interrupted_writes_do_not_shadow_committed_state() {
    let dir = tempdir().unwrap();
    let project_id = uuid::Uuid::new_v4();
    let committed = record(project_id, Stage::Subdivision, "fp-good");

    let store = FsArtifactIndexStore::new(dir.path());
    store.put(committed.clone()).await.unwrap();

    // simula un proceso muerto a mitad de escritura: queda un .tmp huérfano
    let orphan = dir.path()
                    .join("projects")
                    .join(project_id.to_string())
                    .join("artifacts")
                    .join("04-subdivision.json.tmp");
    std::fs::write(&orphan, b"{ truncado").unwrap();

    let reopened = FsArtifactIndexStore::new(dir.path());
    assert_eq!(reopened.get(project_id, Stage::Subdivision).await.unwrap(), Some(committed.clone()));
    let listed = reopened.list_for_project(project_id).await.unwrap();
    assert_eq!(listed, vec![committed]);
}
