//! Constantes del pipeline.

/// Versión del pipeline; entra a todo fingerprint de capa. Cambiarla invalida
/// cualquier artifact previo.
pub const PIPELINE_VERSION: &str = "U1.0";

/// Carpeta del render del sitio (la capa cero no derivada).
pub const SITE_FOLDER: &str = "00-site";

/// Media types de los archivos servidos.
pub const MEDIA_TYPE_GLTF: &str = "model/gltf+json";
pub const MEDIA_TYPE_GEOJSON: &str = "application/geo+json";

/// Reintentos de un waiter cuyo job fue supersedido antes de rendirse.
pub const SUPERSEDE_RETRIES: usize = 3;

/// Capacidad del log de eventos de jobs en memoria.
pub const JOB_LOG_CAPACITY: usize = 1024;
