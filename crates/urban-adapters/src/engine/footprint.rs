//! Capa `footprint`: huella edificable de cada lote tras aplicar retiros.
//!
//! Los retiros (frente, fondo y laterales) salen de la configuración del
//! tipo de lote. Un lote que los retiros consumen por completo queda sin
//! huella y no aparece en el payload; no es un error.

use urban_core::{EngineError, EngineOutput, ResolvedInputs, Stage};
use urban_domain::parameters::Tissue;

use super::context::RoadClass;
use super::features::{pairs_to_polygon, polygon_to_pairs, CellKind, FootprintFeature, FootprintPayload, LotFeature,
                      OffGridType, SubdivisionPayload, PAYLOAD_SCHEMA_VERSION};
use super::{finish_payload, parse_upstream};
use crate::geometry_ops::{self, axis_rect, shrink_toward_centroid, Vec2};
use crate::gltf::MeshBuilder;

const PLATE_Z: f64 = 0.25;
const MIN_FOOTPRINT_AREA_M2: f64 = 1.0;

struct Setbacks {
    front_m: f64,
    side_m: f64,
    rear_m: f64,
}

pub fn build(inputs: &ResolvedInputs) -> Result<EngineOutput, EngineError> {
    let subdivision: SubdivisionPayload = parse_upstream(inputs, Stage::Subdivision)?;
    let tissue = &inputs.parameters.tissue;

    let mut mesh = MeshBuilder::new();
    let mut footprints = Vec::with_capacity(subdivision.lots.len());
    let mut footprint_area_m2 = 0.0;
    for lot in &subdivision.lots {
        let setbacks = setbacks_for(tissue, lot);
        let Some(polygon) = inset_lot(&pairs_to_polygon(&lot.polygon), &setbacks) else {
            continue;
        };
        let area_m2 = geometry_ops::polygon_area(&polygon);
        footprint_area_m2 += area_m2;
        mesh.push_polygon(&polygon, PLATE_Z);
        footprints.push(FootprintFeature { lot_id: lot.id,
                                           kind: lot.kind,
                                           frontage: lot.frontage,
                                           cluster_type: lot.cluster_type,
                                           corner: lot.corner,
                                           polygon: polygon_to_pairs(&polygon),
                                           area_m2,
                                           floors_allowed: lot.floors_allowed });
    }

    let payload = FootprintPayload { footprints,
                                     lots_total: subdivision.lots_total,
                                     footprint_area_m2,
                                     schema_version: PAYLOAD_SCHEMA_VERSION };
    finish_payload(mesh, "footprint", &payload, None)
}

fn setbacks_for(tissue: &Tissue, lot: &LotFeature) -> Setbacks {
    let mut setbacks = match (lot.kind, lot.cluster_type) {
        (CellKind::OnGrid, _) => {
            let config = match lot.frontage {
                RoadClass::Artery => &tissue.on_grid_lots_on_arteries,
                RoadClass::Secondary => &tissue.on_grid_lots_on_secondaries,
                RoadClass::Local => &tissue.on_grid_lots_on_locals,
            };
            Setbacks { front_m: config.front_setback_m,
                       side_m: config.side_margins_m,
                       rear_m: config.rear_setback_m }
        }
        (CellKind::OffGrid, Some(OffGridType::Type2)) => {
            // El tipo 2 construye a línea: sin retiros propios
            Setbacks { front_m: 0.0,
                       side_m: 0.0,
                       rear_m: 0.0 }
        }
        (CellKind::OffGrid, _) => {
            let config = &tissue.off_grid_cluster_type_1;
            Setbacks { front_m: config.front_setback_m,
                       side_m: config.side_margins_m,
                       rear_m: config.rear_setback_m }
        }
    };
    if tissue.fire_protection.fire_proof_partitions_with_6m_margins {
        setbacks.side_m = setbacks.side_m.max(6.0);
    }
    setbacks
}

// Retiro exacto por eje para lotes rectangulares; contracción al centroide
// para los recortados irregulares.
fn inset_lot(polygon: &[Vec2], setbacks: &Setbacks) -> Option<Vec<Vec2>> {
    if let Some((min, max)) = axis_rect(polygon) {
        let x0 = min.x + setbacks.side_m;
        let x1 = max.x - setbacks.side_m;
        let y0 = min.y + setbacks.front_m;
        let y1 = max.y - setbacks.rear_m;
        if x1 - x0 <= 0.0 || y1 - y0 <= 0.0 {
            return None;
        }
        let rect = vec![Vec2::new(x0, y0), Vec2::new(x1, y0), Vec2::new(x1, y1), Vec2::new(x0, y1)];
        if geometry_ops::polygon_area(&rect) < MIN_FOOTPRINT_AREA_M2 {
            return None;
        }
        return Some(rect);
    }
    let margin = (setbacks.front_m + setbacks.rear_m + 2.0 * setbacks.side_m) / 4.0;
    let inner = shrink_toward_centroid(polygon, margin);
    if geometry_ops::polygon_area(&inner) < MIN_FOOTPRINT_AREA_M2 {
        return None;
    }
    Some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{inputs_for, site_square, with_stage_payloads};

    #[test]
    fn test_footprints_inset_by_setbacks() {
        let inputs = with_stage_payloads(inputs_for(site_square(), None), &[Stage::Clusters, Stage::Subdivision]);
        let output = build(&inputs).unwrap();
        let payload: FootprintPayload = serde_json::from_value(output.payload).unwrap();
        // Lotes locales de 10x20 con retiro de fondo de 3 m -> huellas de 10x17
        assert_eq!(payload.footprints.len(), 72);
        assert_eq!(payload.lots_total, 72);
        for footprint in &payload.footprints {
            assert!((footprint.area_m2 - 170.0).abs() < 1e-6);
        }
        assert!((payload.footprint_area_m2 - 72.0 * 170.0).abs() < 1e-6);
    }

    #[test]
    fn test_fire_protection_consumes_narrow_lots() {
        let mut inputs = with_stage_payloads(inputs_for(site_square(), None), &[Stage::Clusters, Stage::Subdivision]);
        inputs.parameters.tissue.fire_protection.fire_proof_partitions_with_6m_margins = true;
        let output = build(&inputs).unwrap();
        let payload: FootprintPayload = serde_json::from_value(output.payload).unwrap();
        // Lotes locales de 10 m de ancho no admiten 6 m de margen por lado
        assert!(payload.footprints.is_empty());
        assert_eq!(payload.footprint_area_m2, 0.0);
        assert_eq!(payload.lots_total, 72);
    }
}
