//! Carga de configuración de almacenamiento desde variables de entorno.
//! Convención `URBANFLOW_*` con valores por defecto aptos para desarrollo.

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub public_base_url: String,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        let data_dir = env::var("URBANFLOW_DATA_DIR").map(PathBuf::from)
                                                     .unwrap_or_else(|_| PathBuf::from("data"));
        let public_base_url = env::var("URBANFLOW_PUBLIC_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
        Self { data_dir, public_base_url }
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
