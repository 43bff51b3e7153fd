//! Insumos resueltos entregados al motor de geometría.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::stage::Stage;
use urban_domain::{ProjectParameters, RoadNetwork, SiteRing};

/// Contexto de ejecución de una capa: la geometría base del proyecto, los
/// payloads de las capas aguas arriba declaradas y la red vial auxiliar del
/// request cuando la capa la acepta. El motor es stateless: todo lo que
/// necesita viaja aquí.
#[derive(Debug, Clone)]
pub struct ResolvedInputs {
    pub site: SiteRing,
    pub roads: Option<RoadNetwork>,
    pub parameters: ProjectParameters,
    pub upstream: BTreeMap<Stage, Value>,
    pub aux_roads: Option<RoadNetwork>,
}

impl ResolvedInputs {
    /// La red vial efectiva de la capa: la auxiliar del request cuando vino,
    /// si no la base del proyecto.
    pub fn effective_roads(&self) -> Option<&RoadNetwork> {
        self.aux_roads.as_ref().or(self.roads.as_ref())
    }

    /// Payload de una capa aguas arriba declarada.
    pub fn upstream_payload(&self, stage: Stage) -> Option<&Value> {
        self.upstream.get(&stage)
    }
}
