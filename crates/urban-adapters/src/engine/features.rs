//! Payloads estructurados que viajan entre capas.
//!
//! Cada constructor de capa serializa su payload con estos tipos y el
//! consumidor aguas abajo lo deserializa desde `ResolvedInputs::upstream`.
//! Los polígonos van como pares `[x, y]` en metros locales, abiertos y
//! antihorarios. `schema_version` permite evolucionar el contrato.

use serde::{Deserialize, Serialize};

use super::context::RoadClass;
use crate::geometry_ops::Vec2;

pub const PAYLOAD_SCHEMA_VERSION: u32 = 1;

/// Celda de la partición en macro-manzanas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    OnGrid,
    OffGrid,
}

/// Organización interna de un cluster fuera de grilla.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffGridType {
    Type1,
    Type2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadFeature {
    pub class: RoadClass,
    pub width_m: f64,
    pub length_m: f64,
    pub path: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetsPayload {
    pub roads: Vec<RoadFeature>,
    pub total_length_m: f64,
    pub schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellFeature {
    pub id: u32,
    pub kind: CellKind,
    /// Clase de la vía de frente más cercana; decide la configuración de lotes.
    pub frontage: RoadClass,
    pub polygon: Vec<[f64; 2]>,
    pub area_m2: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClustersPayload {
    pub cells: Vec<CellFeature>,
    pub cell_count: u32,
    pub schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicSpacePayload {
    pub sidewalk_count: u32,
    pub sidewalk_length_m: f64,
    pub tree_count: u32,
    pub trees: Vec<[f64; 2]>,
    pub open_space_area_m2: f64,
    pub amenity_area_m2: f64,
    pub schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotFeature {
    pub id: u32,
    pub cell_id: u32,
    pub kind: CellKind,
    pub frontage: RoadClass,
    /// Sólo para lotes fuera de grilla.
    pub cluster_type: Option<OffGridType>,
    pub corner: bool,
    pub polygon: Vec<[f64; 2]>,
    pub area_m2: f64,
    pub floors_allowed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubdivisionPayload {
    pub lots: Vec<LotFeature>,
    pub lots_total: u32,
    pub schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootprintFeature {
    pub lot_id: u32,
    pub kind: CellKind,
    pub frontage: RoadClass,
    pub cluster_type: Option<OffGridType>,
    pub corner: bool,
    pub polygon: Vec<[f64; 2]>,
    pub area_m2: f64,
    pub floors_allowed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootprintPayload {
    pub footprints: Vec<FootprintFeature>,
    pub lots_total: u32,
    pub footprint_area_m2: f64,
    pub schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingFeature {
    pub lot_id: u32,
    /// Huella completa del lote; envolvente máxima de la masa.
    pub footprint: Vec<[f64; 2]>,
    /// Volumen efectivamente construido en esta capa.
    pub built: Vec<[f64; 2]>,
    pub floors_allowed: u32,
    pub floors_built: u32,
    pub height_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MassingPayload {
    pub buildings: Vec<BuildingFeature>,
    pub lots_total: u32,
    pub buildings_total: u32,
    pub gross_floor_area_m2: f64,
    pub schema_version: u32,
}

/// Polígono local a pares serializables.
pub fn polygon_to_pairs(poly: &[Vec2]) -> Vec<[f64; 2]> {
    poly.iter().map(|v| [v.x, v.y]).collect()
}

/// Pares serializados a polígono local.
pub fn pairs_to_polygon(pairs: &[[f64; 2]]) -> Vec<Vec2> {
    pairs.iter().map(|p| Vec2::new(p[0], p[1])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_enums_serialize_snake_case() {
        assert_eq!(serde_json::to_value(CellKind::OnGrid).unwrap(), "on_grid");
        assert_eq!(serde_json::to_value(RoadClass::Secondary).unwrap(), "secondary");
    }

    #[test]
    fn test_clusters_payload_round_trip() {
        let payload = ClustersPayload { cells: vec![CellFeature { id: 0,
                                                                  kind: CellKind::OnGrid,
                                                                  frontage: RoadClass::Artery,
                                                                  polygon: vec![[0.0, 0.0], [90.0, 0.0], [90.0, 130.0], [0.0, 130.0]],
                                                                  area_m2: 11_700.0 }],
                                        cell_count: 1,
                                        schema_version: PAYLOAD_SCHEMA_VERSION };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["cells"][0]["kind"], "on_grid");
        let back: ClustersPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back.cells[0].id, 0);
        assert_eq!(back.cells[0].polygon.len(), 4);
    }
}
