//! Motor de geometría determinista.
//!
//! Cada capa tiene su constructor puro (`build`) que recibe los insumos
//! resueltos y devuelve malla glTF, payload estructurado y, en
//! `building_max`, el resumen numérico. El dispatch vive en
//! `DeterministicEngine`, la implementación por defecto de `GeometryEngine`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use urban_core::{EngineError, EngineOutput, GeometryEngine, ResolvedInputs, Stage};
use urban_domain::{ProjectParameters, RoadNetwork, SiteRing};

use crate::gltf::MeshBuilder;

pub mod context;
pub mod features;

mod clusters;
mod footprint;
mod massing;
mod public_space;
mod site;
mod streets;
mod subdivision;

/// Motor por defecto del pipeline: geometría derivada localmente, sin estado
/// entre llamadas.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicEngine;

impl DeterministicEngine {
    pub fn new() -> Self {
        DeterministicEngine
    }
}

#[async_trait]
impl GeometryEngine for DeterministicEngine {
    async fn compute(&self, stage: Stage, inputs: &ResolvedInputs) -> Result<EngineOutput, EngineError> {
        match stage {
            Stage::Streets => streets::build(inputs),
            Stage::Clusters => clusters::build(inputs),
            Stage::Public => public_space::build(inputs),
            Stage::Subdivision => subdivision::build(inputs),
            Stage::Footprint => footprint::build(inputs),
            Stage::BuildingStart => massing::build_start(inputs),
            Stage::BuildingMax => massing::build_max(inputs),
        }
    }

    async fn render_site(&self,
                         site: &SiteRing,
                         roads: Option<&RoadNetwork>,
                         parameters: &ProjectParameters)
                         -> Result<Vec<u8>, EngineError> {
        site::render(site, roads, parameters)
    }
}

// Cierre común de un constructor de capa: malla y payload serializados.
pub(crate) fn finish_payload<T: Serialize>(mesh: MeshBuilder,
                                           name: &str,
                                           payload: &T,
                                           summary: Option<Value>)
                                           -> Result<EngineOutput, EngineError> {
    let mesh = mesh.build(name)
                   .map_err(|err| EngineError::Failure(format!("glTF de {name} inserializable: {err}")))?;
    let payload = serde_json::to_value(payload)
        .map_err(|err| EngineError::Failure(format!("payload de {name} inserializable: {err}")))?;
    Ok(EngineOutput { mesh,
                      payload,
                      summary })
}

pub(crate) fn parse_upstream<T: DeserializeOwned>(inputs: &ResolvedInputs, stage: Stage) -> Result<T, EngineError> {
    let value = inputs.upstream_payload(stage)
                      .ok_or_else(|| EngineError::Failure(format!("falta el payload de la capa {}", stage.as_str())))?;
    serde_json::from_value(value.clone())
        .map_err(|err| EngineError::Failure(format!("payload de {} ilegible: {err}", stage.as_str())))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;

    use urban_core::{ResolvedInputs, Stage};
    use urban_domain::{Point, ProjectParameters, RoadLine, RoadNetwork, SiteRing};

    use super::{clusters, footprint, massing, streets, subdivision};

    /// Cuadrado de `side_deg` grados de lado anclado en el origen.
    pub(crate) fn site_square_of(side_deg: f64) -> SiteRing {
        SiteRing::new(vec![Point::new(0.0, 0.0),
                           Point::new(side_deg, 0.0),
                           Point::new(side_deg, side_deg),
                           Point::new(0.0, side_deg)]).unwrap()
    }

    /// Sitio de referencia de ~200 m de lado en el ecuador.
    pub(crate) fn site_square() -> SiteRing {
        site_square_of(0.0018)
    }

    /// Una vía que cruza el sitio en diagonal completa: clasifica como arteria.
    pub(crate) fn roads_diagonal() -> RoadNetwork {
        RoadNetwork::new(vec![RoadLine::new(vec![Point::new(0.0, 0.0), Point::new(0.0018, 0.0018)]).unwrap()]).unwrap()
    }

    pub(crate) fn inputs_for(site: SiteRing, roads: Option<RoadNetwork>) -> ResolvedInputs {
        ResolvedInputs { site,
                         roads,
                         parameters: ProjectParameters::default(),
                         upstream: BTreeMap::new(),
                         aux_roads: None }
    }

    /// Encadena constructores aguas arriba y deja sus payloads en los
    /// insumos, en el orden dado.
    pub(crate) fn with_stage_payloads(mut inputs: ResolvedInputs, stages: &[Stage]) -> ResolvedInputs {
        for stage in stages {
            let output = match stage {
                Stage::Streets => streets::build(&inputs),
                Stage::Clusters => clusters::build(&inputs),
                Stage::Subdivision => subdivision::build(&inputs),
                Stage::Footprint => footprint::build(&inputs),
                Stage::BuildingStart => massing::build_start(&inputs),
                other => panic!("capa sin constructor encadenable: {other:?}"),
            }.unwrap();
            inputs.upstream.insert(*stage, output.payload);
        }
        inputs
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{inputs_for, site_square};
    use super::*;

    #[tokio::test]
    async fn test_engine_dispatches_every_stage() {
        let engine = DeterministicEngine::new();
        let inputs = inputs_for(site_square(), None);
        for stage in Stage::ALL {
            let result = engine.compute(stage, &inputs).await;
            match stage {
                Stage::Streets | Stage::Clusters | Stage::Public => {
                    let output = result.unwrap();
                    assert!(!output.mesh.is_empty(), "{stage:?}");
                }
                // Las capas con aguas arriba fallan sin payload previo
                _ => {
                    assert!(matches!(result, Err(EngineError::Failure(_))), "{stage:?}");
                }
            }
        }
    }

    #[tokio::test]
    async fn test_engine_pipeline_end_to_end() {
        let engine = DeterministicEngine::new();
        let mut inputs = inputs_for(site_square(), None);
        let order = [Stage::Streets,
                     Stage::Clusters,
                     Stage::Public,
                     Stage::Subdivision,
                     Stage::Footprint,
                     Stage::BuildingStart,
                     Stage::BuildingMax];
        for stage in order {
            let output = engine.compute(stage, &inputs).await.unwrap();
            assert_eq!(output.summary.is_some(), stage.has_summary(), "{stage:?}");
            inputs.upstream.insert(stage, output.payload);
        }
    }

    #[tokio::test]
    async fn test_render_site_is_deterministic() {
        let engine = DeterministicEngine::new();
        let params = ProjectParameters::default();
        let a = engine.render_site(&site_square(), None, &params).await.unwrap();
        let b = engine.render_site(&site_square(), None, &params).await.unwrap();
        assert_eq!(a, b);
    }
}
