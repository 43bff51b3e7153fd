//! Contrato del motor de geometría externo.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::model::ResolvedInputs;
use crate::stage::Stage;
use urban_domain::{ProjectParameters, RoadNetwork, SiteRing};

/// Fallas tipadas del motor. `DegenerateGeometry` es determinista (mismo
/// input volverá a fallar); el resto puede ser transitorio. Este nivel no
/// reintenta en ningún caso.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error("{0}")]
    Failure(String),
}

/// Output de una computación de capa: los bytes de la malla (van al object
/// store), el payload derivado (lo consumen las capas dependientes) y el
/// resumen numérico cuando la capa lo produce.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub mesh: Vec<u8>,
    pub payload: Value,
    pub summary: Option<Value>,
}

/// Motor de geometría, stateless por llamada.
#[async_trait]
pub trait GeometryEngine: Send + Sync {
    /// Computa el artifact de una capa a partir de los insumos resueltos.
    async fn compute(&self, stage: Stage, inputs: &ResolvedInputs) -> Result<EngineOutput, EngineError>;

    /// Renderiza la geometría base como malla del sitio.
    async fn render_site(&self,
                         site: &SiteRing,
                         roads: Option<&RoadNetwork>,
                         parameters: &ProjectParameters)
                         -> Result<Vec<u8>, EngineError>;
}
