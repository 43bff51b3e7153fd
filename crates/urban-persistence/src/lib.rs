//! urban-persistence
//!
//! Implementaciones durables en disco de los contratos de persistencia de
//! `urban-core` (`ProjectStore`, `ArtifactIndexStore`, `ObjectStore`), con
//! paridad 1:1 respecto a los backends en memoria del core: mismo
//! comportamiento observable, mismo orden de listados, mismos errores de
//! negocio.
//!
//! Módulos:
//! - `fs`: stores sobre filesystem con escrituras atómicas write-rename.
//! - `config`: carga de configuración desde variables de entorno / `.env`.
//! - `error`: mapeo de fallas de IO y serde a variantes semánticas.

pub mod config;
pub mod error;
pub mod fs;

pub use config::{init_dotenv, StorageConfig};
pub use error::PersistenceError;
pub use fs::{FsArtifactIndexStore, FsObjectStore, FsProjectStore};
