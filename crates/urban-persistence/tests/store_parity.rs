//! Paridad entre backends: el comportamiento observable de los stores en
//! disco debe ser idéntico al de los stores en memoria del core, de modo que
//! el resto del sistema no pueda distinguir sobre cuál corre.

use chrono::Utc;
use serde_json::json;
use tempfile::tempdir;
use urban_core::{ArtifactIndexStore, ArtifactRecord, ArtifactStatus, InMemoryArtifactIndexStore, InMemoryObjectStore,
                 InMemoryProjectStore, ObjectStore, ProjectStore, Stage};
use urban_domain::{NewProject, Point, Project, SiteRing};
use urban_persistence::{FsArtifactIndexStore, FsObjectStore, FsProjectStore};

use std::time::Duration;

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
                     location: format!("{project_id}/{}/x.gltf", stage.folder_name()),
                     status: ArtifactStatus::Ready,
                     payload: json!({ "schema_version": 1 }),
                     summary: None,
                     created_at: Utc::now() }
}

async fn exercise_project_store(store: &dyn ProjectStore) -> bool {
    let first = project("Primero");
    let second = project("Segundo");
    store.insert(first.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    store.insert(second.clone()).await.unwrap();

    let duplicate_rejected = store.insert(first.clone()).await.is_err();

    let renamed = first.apply(urban_domain::ProjectPatch { name: Some("Primero bis".to_string()),
                                                           ..urban_domain::ProjectPatch::default() })
                       .unwrap();
    store.save(renamed).await.unwrap();

    let listed: Vec<uuid::Uuid> = store.list().await.unwrap().iter().map(|p| p.id()).collect();
    assert_eq!(listed, vec![first.id(), second.id()], "listado en orden de alta");
    assert_eq!(store.get(first.id()).await.unwrap().map(|p| p.name().to_string()),
               Some("Primero bis".to_string()));
    assert_eq!(store.get(uuid::Uuid::new_v4()).await.unwrap(), None);

    duplicate_rejected
}

#[tokio::test]
async fn project_stores_behave_identically() {
    let dir = tempdir().unwrap();
    let fs_dup = exercise_project_store(&FsProjectStore::new(dir.path())).await;
    let mem_dup = exercise_project_store(&InMemoryProjectStore::new()).await;

    assert!(fs_dup && mem_dup, "ambos backends rechazan el alta duplicada");
}

async fn exercise_index_store(store: &dyn ArtifactIndexStore) -> Vec<(Stage, String)> {
    let project_id = uuid::Uuid::new_v4();
    // compromete fuera de orden; el listado debe volver en orden de pipeline
    for stage in [Stage::Footprint, Stage::Streets, Stage::Subdivision] {
        store.put(record(project_id, stage, "fp-1")).await.unwrap();
    }
    // un segundo put reemplaza el registro de su clave
    store.put(record(project_id, Stage::Streets, "fp-2")).await.unwrap();
    store.put(record(uuid::Uuid::new_v4(), Stage::Clusters, "fp-x")).await.unwrap();

    assert_eq!(store.get(project_id, Stage::Public).await.unwrap(), None);

    store.list_for_project(project_id)
         .await
         .unwrap()
         .into_iter()
         .map(|r| (r.stage, r.fingerprint))
         .collect()
}

#[tokio::test]
async fn index_stores_behave_identically() {
    let dir = tempdir().unwrap();
    let fs_view = exercise_index_store(&FsArtifactIndexStore::new(dir.path())).await;
    let mem_view = exercise_index_store(&InMemoryArtifactIndexStore::new()).await;

    let expected = vec![(Stage::Streets, "fp-2".to_string()),
                        (Stage::Subdivision, "fp-1".to_string()),
                        (Stage::Footprint, "fp-1".to_string())];
    assert_eq!(fs_view, expected);
    assert_eq!(mem_view, expected);
}

#[tokio::test]
async fn object_stores_report_missing_objects_the_same_way() {
    let dir = tempdir().unwrap();
    let fs_store = FsObjectStore::new(dir.path(), "http://localhost:8000");
    let mem_store = InMemoryObjectStore::new();

    let fs_err = fs_store.get("p/01-streets/abc/streets.gltf").await.unwrap_err();
    let mem_err = mem_store.get("p/01-streets/abc/streets.gltf").await.unwrap_err();
    assert_eq!(fs_err, mem_err, "mismo error de negocio ante un objeto ausente");

    fs_store.put("p/01-streets/abc/streets.gltf", b"m".to_vec(), "model/gltf+json")
            .await
            .unwrap();
    mem_store.put("p/01-streets/abc/streets.gltf", b"m".to_vec(), "model/gltf+json")
             .await
             .unwrap();
    assert_eq!(fs_store.get("p/01-streets/abc/streets.gltf").await.unwrap(),
               mem_store.get("p/01-streets/abc/streets.gltf").await.unwrap());
}
