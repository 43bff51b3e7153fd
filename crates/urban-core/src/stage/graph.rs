//! Grafo estático de dependencias entre capas.
//!
//! Estructura pura de consulta, sin estado mutable. La usan el scheduler
//! (para resolver insumos antes de calcular un fingerprint) y el invalidador
//! (para recorrer la clausura de dependientes). Cada capa declara su conjunto
//! de insumos; donde el contrato externo no fija una dependencia cruzada, se
//! asume la cadena mínima declarada aquí.

use serde::{Deserialize, Serialize};

use super::Stage;

/// Insumo declarado de una capa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageInput {
    /// La geometría base del proyecto (sitio + vías + parámetros).
    BaseGeometry,
    /// El artifact de otra capa.
    Upstream(Stage),
}

/// Origen de una invalidación.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationOrigin {
    BaseGeometry,
    Stage(Stage),
}

/// Tabla de dependencias del pipeline.
pub struct StageGraph;

impl StageGraph {
    /// Insumos declarados de una capa.
    pub fn dependencies_of(stage: Stage) -> &'static [StageInput] {
        match stage {
            Stage::Streets => &[StageInput::BaseGeometry],
            Stage::Clusters => &[StageInput::BaseGeometry],
            Stage::Public => &[StageInput::BaseGeometry],
            Stage::Subdivision => &[StageInput::Upstream(Stage::Clusters)],
            Stage::Footprint => &[StageInput::Upstream(Stage::Subdivision)],
            Stage::BuildingStart => &[StageInput::Upstream(Stage::Footprint)],
            Stage::BuildingMax => &[StageInput::Upstream(Stage::BuildingStart)],
        }
    }

    /// Capas que consumen directamente el output de `stage`.
    pub fn dependents_of(stage: Stage) -> Vec<Stage> {
        Stage::ALL.into_iter()
                  .filter(|candidate| {
                      Self::dependencies_of(*candidate).iter()
                                                       .any(|input| *input == StageInput::Upstream(stage))
                  })
                  .collect()
    }

    /// Orden topológico completo del pipeline.
    pub fn topological_order() -> [Stage; 7] {
        Stage::ALL
    }

    /// Ancestros estrictos de una capa, en orden topológico.
    pub fn ancestor_chain(stage: Stage) -> Vec<Stage> {
        let mut member = [false; 7];
        let mut pending = vec![stage];
        while let Some(current) = pending.pop() {
            for input in Self::dependencies_of(current) {
                if let StageInput::Upstream(dep) = input {
                    let idx = Self::position(*dep);
                    if !member[idx] {
                        member[idx] = true;
                        pending.push(*dep);
                    }
                }
            }
        }
        Stage::ALL.into_iter()
                  .filter(|candidate| member[Self::position(*candidate)] && *candidate != stage)
                  .collect()
    }

    /// Clausura de capas afectadas por una invalidación, en orden topológico.
    /// Para `BaseGeometry` es el pipeline completo (toda capa depende de la
    /// base directa o transitivamente); para una capa, sus dependientes
    /// estrictos.
    pub fn invalidation_closure(origin: InvalidationOrigin) -> Vec<Stage> {
        let mut member = [false; 7];
        let mut pending: Vec<Stage> = match origin {
            InvalidationOrigin::BaseGeometry => {
                Stage::ALL.into_iter()
                          .filter(|stage| Self::dependencies_of(*stage).contains(&StageInput::BaseGeometry))
                          .collect()
            }
            InvalidationOrigin::Stage(stage) => Self::dependents_of(stage),
        };
        for stage in &pending {
            member[Self::position(*stage)] = true;
        }
        while let Some(current) = pending.pop() {
            for dependent in Self::dependents_of(current) {
                let idx = Self::position(dependent);
                if !member[idx] {
                    member[idx] = true;
                    pending.push(dependent);
                }
            }
        }
        Stage::ALL.into_iter()
                  .filter(|candidate| member[Self::position(*candidate)])
                  .collect()
    }

    fn position(stage: Stage) -> usize {
        stage.folder_index() as usize - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_dependencies() {
        assert_eq!(StageGraph::dependencies_of(Stage::Streets), &[StageInput::BaseGeometry]);
        assert_eq!(StageGraph::dependencies_of(Stage::Subdivision), &[StageInput::Upstream(Stage::Clusters)]);
        assert_eq!(StageGraph::dependencies_of(Stage::BuildingMax), &[StageInput::Upstream(Stage::BuildingStart)]);
    }

    #[test]
    fn test_dependents_are_inverse_of_dependencies() {
        assert_eq!(StageGraph::dependents_of(Stage::Clusters), vec![Stage::Subdivision]);
        assert_eq!(StageGraph::dependents_of(Stage::BuildingMax), Vec::<Stage>::new());
        for stage in Stage::ALL {
            for dependent in StageGraph::dependents_of(stage) {
                assert!(StageGraph::dependencies_of(dependent).contains(&StageInput::Upstream(stage)));
            }
        }
    }

    #[test]
    fn test_ancestor_chain_is_topological() {
        assert_eq!(StageGraph::ancestor_chain(Stage::Streets), Vec::<Stage>::new());
        assert_eq!(StageGraph::ancestor_chain(Stage::Subdivision), vec![Stage::Clusters]);
        assert_eq!(StageGraph::ancestor_chain(Stage::BuildingMax),
                   vec![Stage::Clusters, Stage::Subdivision, Stage::Footprint, Stage::BuildingStart]);
    }

    #[test]
    fn test_base_invalidation_reaches_every_stage() {
        let closure = StageGraph::invalidation_closure(InvalidationOrigin::BaseGeometry);
        assert_eq!(closure, Stage::ALL.to_vec());
    }

    #[test]
    fn test_stage_invalidation_is_strict_dependents() {
        let closure = StageGraph::invalidation_closure(InvalidationOrigin::Stage(Stage::Subdivision));
        assert_eq!(closure, vec![Stage::Footprint, Stage::BuildingStart, Stage::BuildingMax]);
        assert!(StageGraph::invalidation_closure(InvalidationOrigin::Stage(Stage::BuildingMax)).is_empty());
        assert!(StageGraph::invalidation_closure(InvalidationOrigin::Stage(Stage::Streets)).is_empty());
    }
}
