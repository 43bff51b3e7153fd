//! Configuración central del servidor.
//! Carga variables de entorno (.env) y expone una estructura inmutable (`CONFIG`).

use once_cell::sync::Lazy;
use std::env;

use urban_persistence::StorageConfig;

/// Configuración global de la aplicación.
pub struct AppConfig {
    /// Dirección de escucha del servidor HTTP.
    pub bind: String,
    /// Almacenamiento durable: directorio de datos y URL pública de descarga.
    pub storage: StorageConfig,
}

/// Instancia global perezosa de configuración, evaluada una sola vez.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    urban_persistence::init_dotenv();
    let bind = env::var("URBANFLOW_BIND").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    AppConfig { bind,
                storage: StorageConfig::from_env() }
});
