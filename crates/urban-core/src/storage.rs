//! Contrato del object store y layout de claves.
//!
//! Las claves están versionadas por fingerprint: una recomputación escribe en
//! una ruta nueva, nunca sobre una URL ya emitida.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::constants::SITE_FOLDER;
use crate::errors::CoreError;
use crate::stage::Stage;

/// Objeto almacenado: clave interna + URL pública emitida.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

/// Almacenamiento de bytes, durable y versionado.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<StoredObject, CoreError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, CoreError>;
}

/// Object store volátil con URLs `memory://`, para tests y la CLI.
pub struct InMemoryObjectStore {
    inner: DashMap<String, Vec<u8>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self { inner: DashMap::new() }
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<StoredObject, CoreError> {
        self.inner.insert(key.to_string(), bytes);
        Ok(StoredObject { key: key.to_string(),
                          url: format!("memory://{key}") })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, CoreError> {
        self.inner
            .get(key)
            .map(|bytes| bytes.clone())
            .ok_or_else(|| CoreError::Storage(format!("missing object {key}")))
    }
}

fn short_fingerprint(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}

/// Clave del render del sitio, versionada por fingerprint base.
pub fn site_object_key(project_id: Uuid, base_fingerprint: &str) -> String {
    format!("{project_id}/{SITE_FOLDER}/{}/site.gltf", short_fingerprint(base_fingerprint))
}

/// Clave del artifact de una capa, versionada por su fingerprint de insumos.
pub fn stage_object_key(project_id: Uuid, stage: Stage, fingerprint: &str) -> String {
    format!("{project_id}/{}/{}/{}.gltf",
            stage.folder_name(),
            short_fingerprint(fingerprint),
            stage.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_versioned_by_fingerprint() {
        let project = Uuid::new_v4();
        let a = stage_object_key(project, Stage::Streets, "aaaaaaaaaaaaaaaa");
        let b = stage_object_key(project, Stage::Streets, "bbbbbbbbbbbbbbbb");
        assert_ne!(a, b);
        assert!(a.contains("01-streets/aaaaaaaaaaaa/streets.gltf"));
        assert!(site_object_key(project, "cccccccccccccccc").contains("00-site/cccccccccccc/site.gltf"));
    }
}
