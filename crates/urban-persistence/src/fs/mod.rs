//! Implementaciones en filesystem de los contratos de persistencia del core.
//!
//! Objetivo general del módulo:
//! - Proveer una capa durable en disco con paridad 1:1 respecto a los
//!   backends en memoria de `urban-core`.
//! - Resistir cortes a mitad de escritura: toda escritura usa el patrón
//!   write-rename (tmp + `sync_all` + `rename`), de modo que el registro
//!   previo queda intacto si el proceso muere a mitad de camino.
//! - Aislar el layout en disco del resto del sistema: nadie fuera de este
//!   módulo conoce rutas.
//!
//! Layout bajo el directorio de datos:
//! - `projects/<uuid>/project.json`: registro del proyecto.
//! - `projects/<uuid>/artifacts/<NN-capa>.json`: registro vigente por capa.
//! - `objects/<clave>`: bytes publicados (mallas glTF), con la clave
//!   versionada por fingerprint que emite el core.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use urban_core::{ArtifactIndexStore, ArtifactRecord, CoreError, ObjectStore, ProjectStore, Stage, StoredObject};
use urban_domain::Project;

use crate::error::PersistenceError;

const PROJECTS_DIR: &str = "projects";
const ARTIFACTS_DIR: &str = "artifacts";
const OBJECTS_DIR: &str = "objects";

/// Escritura atómica write-rename: escribe en `<ruta>.tmp`, sincroniza a
/// disco y renombra sobre la ruta final. Crea los directorios intermedios.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut file = fs::File::create(&tmp_path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    fs::rename(&tmp_path, path).await?;
    Ok(())
}

/// Lectura que distingue "no existe" de fallas reales de IO.
async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, PersistenceError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Store de proyectos sobre disco: un `project.json` por proyecto.
pub struct FsProjectStore {
    root: PathBuf,
}

impl FsProjectStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { root: data_dir.into() }
    }

    fn project_file(&self, id: Uuid) -> PathBuf {
        self.root.join(PROJECTS_DIR).join(id.to_string()).join("project.json")
    }
}

#[async_trait]
impl ProjectStore for FsProjectStore {
    async fn insert(&self, project: Project) -> Result<(), CoreError> {
        let path = self.project_file(project.id());
        if read_optional(&path).await?.is_some() {
            return Err(CoreError::Internal(format!("project {} already registered", project.id())));
        }
        let bytes = serde_json::to_vec_pretty(&project).map_err(PersistenceError::from)?;
        write_atomic(&path, &bytes).await?;
        debug!("proyecto {} registrado en {}", project.id(), path.display());
        Ok(())
    }

    async fn save(&self, project: Project) -> Result<(), CoreError> {
        let path = self.project_file(project.id());
        let bytes = serde_json::to_vec_pretty(&project).map_err(PersistenceError::from)?;
        write_atomic(&path, &bytes).await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Project>, CoreError> {
        match read_optional(&self.project_file(id)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(PersistenceError::from)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Project>, CoreError> {
        let dir = self.root.join(PROJECTS_DIR);
        let mut projects = Vec::new();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(projects),
            Err(err) => return Err(PersistenceError::from(err).into()),
        };
        while let Some(entry) = entries.next_entry().await.map_err(PersistenceError::from)? {
            if !entry.file_type().await.map_err(PersistenceError::from)?.is_dir() {
                continue;
            }
            match read_optional(&entry.path().join("project.json")).await? {
                Some(bytes) => projects.push(serde_json::from_slice::<Project>(&bytes).map_err(PersistenceError::from)?),
                // un directorio sin registro es una alta interrumpida; se ignora
                None => warn!("directorio de proyecto sin registro: {}", entry.path().display()),
            }
        }
        projects.sort_by_key(|p| p.created_at());
        Ok(projects)
    }
}

/// Store del índice de artifacts: un JSON por `(proyecto, capa)`, nombrado
/// por la carpeta de la capa para que el directorio liste en orden de
/// pipeline.
pub struct FsArtifactIndexStore {
    root: PathBuf,
}

impl FsArtifactIndexStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { root: data_dir.into() }
    }

    fn record_file(&self, project_id: Uuid, stage: Stage) -> PathBuf {
        self.root
            .join(PROJECTS_DIR)
            .join(project_id.to_string())
            .join(ARTIFACTS_DIR)
            .join(format!("{}.json", stage.folder_name()))
    }
}

#[async_trait]
impl ArtifactIndexStore for FsArtifactIndexStore {
    async fn get(&self, project_id: Uuid, stage: Stage) -> Result<Option<ArtifactRecord>, CoreError> {
        match read_optional(&self.record_file(project_id, stage)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(PersistenceError::from)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, record: ArtifactRecord) -> Result<(), CoreError> {
        let path = self.record_file(record.project_id, record.stage);
        let bytes = serde_json::to_vec_pretty(&record).map_err(PersistenceError::from)?;
        write_atomic(&path, &bytes).await?;
        debug!("artifact {}/{} comprometido ({})", record.project_id, record.stage, record.fingerprint);
        Ok(())
    }

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<ArtifactRecord>, CoreError> {
        let dir = self.root.join(PROJECTS_DIR).join(project_id.to_string()).join(ARTIFACTS_DIR);
        let mut records: Vec<ArtifactRecord> = Vec::new();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(records),
            Err(err) => return Err(PersistenceError::from(err).into()),
        };
        while let Some(entry) = entries.next_entry().await.map_err(PersistenceError::from)? {
            let path = entry.path();
            // descarta temporales huérfanos de escrituras interrumpidas
            if path.extension().map(|ext| ext != "json").unwrap_or(true) {
                continue;
            }
            let bytes = fs::read(&path).await.map_err(PersistenceError::from)?;
            records.push(serde_json::from_slice::<ArtifactRecord>(&bytes).map_err(PersistenceError::from)?);
        }
        records.sort_by_key(|r| r.stage);
        Ok(records)
    }
}

/// Object store sobre disco. Las claves versionadas por fingerprint que
/// genera el core se mapean 1:1 a rutas bajo `objects/`; la URL emitida
/// apunta a la ruta de descarga del API (`/files/<clave>`).
pub struct FsObjectStore {
    root:            PathBuf,
    public_base_url: String,
}

impl FsObjectStore {
    pub fn new(data_dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self { root:            data_dir.into(),
               public_base_url: public_base_url.into().trim_end_matches('/').to_string() }
    }

    /// Traducción clave -> ruta. Rechaza componentes vacíos, `.`/`..` y
    /// separadores alternos: la clave viene de requests de descarga y no
    /// debe poder escapar de `objects/`.
    fn object_path(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        if key.is_empty() {
            return Err(PersistenceError::InvalidKey("empty key".to_string()));
        }
        let mut path = self.root.join(OBJECTS_DIR);
        for component in key.split('/') {
            if component.is_empty() || component == "." || component == ".." || component.contains('\\') {
                return Err(PersistenceError::InvalidKey(key.to_string()));
            }
            path.push(component);
        }
        Ok(path)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<StoredObject, CoreError> {
        let path = self.object_path(key)?;
        write_atomic(&path, &bytes).await?;
        debug!("objeto {key} escrito ({} bytes, {content_type})", bytes.len());
        Ok(StoredObject { key: key.to_string(),
                          url: format!("{}/files/{key}", self.public_base_url) })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, CoreError> {
        let path = self.object_path(key)?;
        read_optional(&path).await?
                            .ok_or_else(|| CoreError::Storage(format!("missing object {key}")))
    }
}
