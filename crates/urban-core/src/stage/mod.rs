//! Enumeración cerrada de capas derivadas del pipeline urbano.
//!
//! Las siete capas se derivan de la geometría base del proyecto en el orden
//! topológico declarado por el grafo (`graph::StageGraph`). La capa cero
//! (`00-site`, el render del sitio) no pertenece al enum: es un render de la
//! entrada, no una derivación.

pub mod graph;

pub use graph::{InvalidationOrigin, StageGraph, StageInput};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

/// Capa derivada del pipeline. El orden de declaración es el orden
/// topológico de recomputación.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Streets,
    Clusters,
    Public,
    Subdivision,
    Footprint,
    BuildingStart,
    BuildingMax,
}

impl Stage {
    /// Todas las capas en orden topológico.
    pub const ALL: [Stage; 7] = [Stage::Streets,
                                 Stage::Clusters,
                                 Stage::Public,
                                 Stage::Subdivision,
                                 Stage::Footprint,
                                 Stage::BuildingStart,
                                 Stage::BuildingMax];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Streets => "streets",
            Stage::Clusters => "clusters",
            Stage::Public => "public",
            Stage::Subdivision => "subdivision",
            Stage::Footprint => "footprint",
            Stage::BuildingStart => "building_start",
            Stage::BuildingMax => "building_max",
        }
    }

    /// Índice de carpeta en disco; el 00 queda reservado para el sitio.
    pub fn folder_index(&self) -> u8 {
        match self {
            Stage::Streets => 1,
            Stage::Clusters => 2,
            Stage::Public => 3,
            Stage::Subdivision => 4,
            Stage::Footprint => 5,
            Stage::BuildingStart => 6,
            Stage::BuildingMax => 7,
        }
    }

    /// Nombre de carpeta `NN-<capa>` (p. ej. `04-subdivision`).
    pub fn folder_name(&self) -> String {
        format!("{:02}-{}", self.folder_index(), self.as_str())
    }

    /// Las capas que aceptan una red vial auxiliar en el request.
    pub fn accepts_aux_roads(&self) -> bool {
        matches!(self, Stage::Streets | Stage::Public)
    }

    /// `building_max` entrega además un resumen numérico estructurado.
    pub fn has_summary(&self) -> bool {
        matches!(self, Stage::BuildingMax)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "streets" => Ok(Stage::Streets),
            "clusters" => Ok(Stage::Clusters),
            "public" => Ok(Stage::Public),
            "subdivision" => Ok(Stage::Subdivision),
            "footprint" => Ok(Stage::Footprint),
            "building_start" => Ok(Stage::BuildingStart),
            "building_max" => Ok(Stage::BuildingMax),
            other => Err(CoreError::Validation(format!("unknown stage: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert!("sideways".parse::<Stage>().is_err());
    }

    #[test]
    fn test_folder_names_follow_site() {
        assert_eq!(Stage::Streets.folder_name(), "01-streets");
        assert_eq!(Stage::BuildingMax.folder_name(), "07-building_max");
    }

    #[test]
    fn test_aux_and_summary_flags() {
        assert!(Stage::Streets.accepts_aux_roads());
        assert!(Stage::Public.accepts_aux_roads());
        assert!(!Stage::Clusters.accepts_aux_roads());
        assert!(Stage::BuildingMax.has_summary());
        assert!(!Stage::Clusters.has_summary());
    }
}
