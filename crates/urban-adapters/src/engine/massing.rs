//! Capas `building_start` y `building_max`: masas edificadas.
//!
//! `building_start` aplica a cada huella los porcentajes de edificación
//! inicial (ancho, fondo y pisos) del tipo de lote; `building_max` extruye
//! la envolvente completa y produce el resumen numérico del proyecto. Los
//! prismas se generan en paralelo y se funden en orden estable.

use rayon::prelude::*;

use urban_core::{EngineError, EngineOutput, ResolvedInputs, Stage};
use urban_domain::parameters::{InitialBuildingPercent, StarterBuildings};
use urban_domain::LuckySheet;

use super::context::{RoadClass, SiteContext};
use super::features::{pairs_to_polygon, polygon_to_pairs, BuildingFeature, CellKind, FootprintFeature,
                      FootprintPayload, MassingPayload, OffGridType, PAYLOAD_SCHEMA_VERSION};
use super::{finish_payload, parse_upstream};
use crate::geometry_ops::{self, axis_rect, polygon_centroid, Vec2};
use crate::gltf::MeshBuilder;

const BASE_Z: f64 = 0.30;
const FLOOR_HEIGHT_M: f64 = 3.0;
const DWELLING_AREA_M2: f64 = 80.0;

pub fn build_start(inputs: &ResolvedInputs) -> Result<EngineOutput, EngineError> {
    let footprint: FootprintPayload = parse_upstream(inputs, Stage::Footprint)?;
    let starters = &inputs.parameters.starter_buildings;

    let mut buildings = Vec::with_capacity(footprint.footprints.len());
    let mut gross_floor_area_m2 = 0.0;
    for fp in &footprint.footprints {
        let percent = starter_percent(starters, fp);
        let full = pairs_to_polygon(&fp.polygon);
        let built = scaled_footprint(&full, percent.initial_width_percent, percent.initial_depth_percent);
        let floors_built = scaled_floors(fp.floors_allowed, percent.initial_floors_percent);
        if floors_built > 0 {
            gross_floor_area_m2 += geometry_ops::polygon_area(&built).abs() * f64::from(floors_built);
        }
        buildings.push(BuildingFeature { lot_id: fp.lot_id,
                                         footprint: fp.polygon.clone(),
                                         built: polygon_to_pairs(&built),
                                         floors_allowed: fp.floors_allowed,
                                         floors_built,
                                         height_m: f64::from(floors_built) * FLOOR_HEIGHT_M });
    }

    let mesh = extrude_buildings(buildings.iter()
                                          .filter(|b| b.floors_built > 0)
                                          .map(|b| (pairs_to_polygon(&b.built), b.height_m))
                                          .collect());

    let payload = MassingPayload { buildings_total: buildings.iter().filter(|b| b.floors_built > 0).count() as u32,
                                   buildings,
                                   lots_total: footprint.lots_total,
                                   gross_floor_area_m2,
                                   schema_version: PAYLOAD_SCHEMA_VERSION };
    finish_payload(mesh, "building_start", &payload, None)
}

pub fn build_max(inputs: &ResolvedInputs) -> Result<EngineOutput, EngineError> {
    let ctx = SiteContext::from_inputs(inputs)?;
    let start: MassingPayload = parse_upstream(inputs, Stage::BuildingStart)?;

    let mut buildings = Vec::with_capacity(start.buildings.len());
    let mut gross_floor_area_m2 = 0.0;
    let mut footprint_area_m2 = 0.0;
    let mut floors_max = 0u32;
    for building in &start.buildings {
        let area = geometry_ops::polygon_area(&pairs_to_polygon(&building.footprint)).abs();
        footprint_area_m2 += area;
        gross_floor_area_m2 += area * f64::from(building.floors_allowed);
        floors_max = floors_max.max(building.floors_allowed);
        buildings.push(BuildingFeature { lot_id: building.lot_id,
                                         footprint: building.footprint.clone(),
                                         built: building.footprint.clone(),
                                         floors_allowed: building.floors_allowed,
                                         floors_built: building.floors_allowed,
                                         height_m: f64::from(building.floors_allowed) * FLOOR_HEIGHT_M });
    }

    let mesh = extrude_buildings(buildings.iter()
                                          .filter(|b| b.floors_built > 0)
                                          .map(|b| (pairs_to_polygon(&b.built), b.height_m))
                                          .collect());

    let sheet = LuckySheet { site_area_m2: ctx.area_m2,
                             lots_total: start.lots_total,
                             footprint_area_m2,
                             gross_floor_area_m2,
                             floor_area_ratio: gross_floor_area_m2 / ctx.area_m2,
                             coverage_ratio: footprint_area_m2 / ctx.area_m2,
                             floors_max,
                             estimated_dwellings: (gross_floor_area_m2 / DWELLING_AREA_M2).round() as u32,
                             schema_version: 1 };
    let summary = serde_json::to_value(&sheet)
        .map_err(|err| EngineError::Failure(format!("resumen inserializable: {err}")))?;

    let payload = MassingPayload { buildings_total: buildings.len() as u32,
                                   buildings,
                                   lots_total: start.lots_total,
                                   gross_floor_area_m2,
                                   schema_version: PAYLOAD_SCHEMA_VERSION };
    finish_payload(mesh, "building_max", &payload, Some(summary))
}

fn starter_percent<'a>(starters: &'a StarterBuildings, fp: &FootprintFeature) -> &'a InitialBuildingPercent {
    match (fp.kind, fp.cluster_type) {
        (CellKind::OffGrid, Some(OffGridType::Type2)) => &starters.off_grid_cluster_type_2,
        (CellKind::OffGrid, _) => &starters.off_grid_cluster_type_1,
        (CellKind::OnGrid, _) => match fp.frontage {
            RoadClass::Artery => {
                let tier = &starters.on_grid_lots_on_arteries;
                if fp.corner {
                    &tier.corner_with_other_artery
                } else {
                    &tier.regular_lot
                }
            }
            RoadClass::Secondary => {
                let tier = &starters.on_grid_lots_on_secondaries;
                if fp.corner {
                    &tier.corner_with_other_secondary
                } else {
                    &tier.regular_lot
                }
            }
            RoadClass::Local => {
                let tier = &starters.on_grid_lots_on_locals;
                if fp.corner {
                    &tier.corner_with_other_local
                } else {
                    &tier.regular_lot
                }
            }
        },
    }
}

fn scaled_floors(base: u32, percent: f64) -> u32 {
    (f64::from(base) * percent / 100.0).round() as u32
}

// Escala por eje para huellas rectangulares; escala uniforme al centroide
// conservando la proporción de área para las irregulares.
fn scaled_footprint(polygon: &[Vec2], width_percent: f64, depth_percent: f64) -> Vec<Vec2> {
    let wf = (width_percent / 100.0).clamp(0.0, 1.0);
    let df = (depth_percent / 100.0).clamp(0.0, 1.0);
    if let Some((min, max)) = axis_rect(polygon) {
        let cx = (min.x + max.x) / 2.0;
        let cy = (min.y + max.y) / 2.0;
        let hw = (max.x - min.x) / 2.0 * wf;
        let hh = (max.y - min.y) / 2.0 * df;
        return vec![Vec2::new(cx - hw, cy - hh),
                    Vec2::new(cx + hw, cy - hh),
                    Vec2::new(cx + hw, cy + hh),
                    Vec2::new(cx - hw, cy + hh)];
    }
    let factor = (wf * df).sqrt();
    let c = polygon_centroid(polygon);
    polygon.iter().map(|v| c.add(v.sub(c).scale(factor))).collect()
}

// Prismas en paralelo, fundidos en el orden de entrada.
fn extrude_buildings(prisms: Vec<(Vec<Vec2>, f64)>) -> MeshBuilder {
    let fragments: Vec<MeshBuilder> = prisms.par_iter()
                                            .map(|(polygon, height)| {
                                                let mut fragment = MeshBuilder::new();
                                                fragment.push_prism(polygon, BASE_Z, BASE_Z + height);
                                                fragment
                                            })
                                            .collect();
    let mut mesh = MeshBuilder::new();
    for fragment in fragments {
        mesh.append(fragment);
    }
    mesh
}
