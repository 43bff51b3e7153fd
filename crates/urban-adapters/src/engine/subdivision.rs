//! Capa `subdivision`: loteo de las macro-manzanas.
//!
//! Cada celda `on_grid` se lotea en dos franjas de frente según la
//! configuración de su clase vial; cada celda `off_grid` se organiza
//! alrededor de un sendero interno (tipo 1) o de un cul-de-sac (tipo 2,
//! cuando la celda es angosta). Los lotes de esquina en grilla reciben el
//! bono de pisos por intersección.

use urban_core::{EngineError, EngineOutput, ResolvedInputs, Stage};
use urban_domain::parameters::{LotConfig, Tissue};

use super::context::RoadClass;
use super::features::{pairs_to_polygon, polygon_to_pairs, CellFeature, CellKind, ClustersPayload, LotFeature,
                      OffGridType, SubdivisionPayload, PAYLOAD_SCHEMA_VERSION};
use super::{finish_payload, parse_upstream};
use crate::geometry_ops::{self, bounding_box, clip_polygon, shrink_toward_centroid, Vec2};
use crate::gltf::MeshBuilder;

const PLATE_Z: f64 = 0.20;
const LOT_GAP_M: f64 = 0.4;
// Fracción mínima del área nominal para conservar un lote recortado
const KEEP_RATIO: f64 = 0.5;

pub fn build(inputs: &ResolvedInputs) -> Result<EngineOutput, EngineError> {
    let clusters: ClustersPayload = parse_upstream(inputs, Stage::Clusters)?;
    let tissue = &inputs.parameters.tissue;

    let mut mesh = MeshBuilder::new();
    let mut lots: Vec<LotFeature> = Vec::new();
    for cell in &clusters.cells {
        let polygon = pairs_to_polygon(&cell.polygon);
        let candidates = match cell.kind {
            CellKind::OnGrid => on_grid_lots(&polygon, cell, tissue),
            CellKind::OffGrid => off_grid_lots(&polygon, inputs, tissue),
        };
        for candidate in candidates {
            let id = lots.len() as u32;
            let plate = shrink_toward_centroid(&candidate.polygon, LOT_GAP_M);
            mesh.push_polygon(&plate, PLATE_Z);
            lots.push(LotFeature { id,
                                   cell_id: cell.id,
                                   kind: cell.kind,
                                   frontage: cell.frontage,
                                   cluster_type: candidate.cluster_type,
                                   corner: candidate.corner,
                                   area_m2: geometry_ops::polygon_area(&candidate.polygon),
                                   polygon: polygon_to_pairs(&candidate.polygon),
                                   floors_allowed: candidate.floors_allowed });
        }
    }
    if lots.is_empty() {
        return Err(EngineError::DegenerateGeometry("ningún lote cabe en la partición configurada".to_string()));
    }

    let payload = SubdivisionPayload { lots_total: lots.len() as u32,
                                       lots,
                                       schema_version: PAYLOAD_SCHEMA_VERSION };
    finish_payload(mesh, "subdivision", &payload, None)
}

struct LotCandidate {
    polygon: Vec<Vec2>,
    corner: bool,
    floors_allowed: u32,
    cluster_type: Option<OffGridType>,
}

fn on_grid_config<'a>(tissue: &'a Tissue, frontage: RoadClass) -> &'a LotConfig {
    match frontage {
        RoadClass::Artery => &tissue.on_grid_lots_on_arteries,
        RoadClass::Secondary => &tissue.on_grid_lots_on_secondaries,
        RoadClass::Local => &tissue.on_grid_lots_on_locals,
    }
}

fn corner_bonus_percent(tissue: &Tissue, frontage: RoadClass) -> f64 {
    match frontage {
        RoadClass::Artery => tissue.corner_bonus.with_artery_percent,
        RoadClass::Secondary => tissue.corner_bonus.with_secondary_percent,
        RoadClass::Local => tissue.corner_bonus.with_local_percent,
    }
}

fn bonus_floors(base: u32, percent: f64) -> u32 {
    (f64::from(base) * (1.0 + percent / 100.0)).round() as u32
}

// Dos franjas de lotes sobre los bordes largos de la celda. El fondo se
// acota a media celda para que las franjas no se solapen.
fn on_grid_lots(polygon: &[Vec2], cell: &CellFeature, tissue: &Tissue) -> Vec<LotCandidate> {
    let config = on_grid_config(tissue, cell.frontage);
    let (min, max) = bounding_box(polygon);
    let height = max.y - min.y;
    let depth = config.depth_m.min(height / 2.0);
    if depth <= 0.0 || config.width_m <= 0.0 {
        return Vec::new();
    }

    let rows = [(min.y, min.y + depth), (max.y - depth, max.y)];
    let mut candidates = Vec::new();
    for (y0, y1) in rows {
        let row = slot_row(polygon, min.x, max.x, y0, y1, config.width_m, depth);
        let last = row.len().saturating_sub(1);
        for (i, lot_polygon) in row.into_iter().enumerate() {
            let corner = i == 0 || i == last;
            let floors_allowed = if corner {
                bonus_floors(config.number_of_floors, corner_bonus_percent(tissue, cell.frontage))
            } else {
                config.number_of_floors
            };
            candidates.push(LotCandidate { polygon: lot_polygon,
                                           corner,
                                           floors_allowed,
                                           cluster_type: None });
        }
    }
    candidates
}

// Celdas interiores: tipo 1 alrededor de un sendero interno horizontal,
// tipo 2 en torno a un cul-de-sac vertical cuando la celda es angosta.
fn off_grid_lots(polygon: &[Vec2], inputs: &ResolvedInputs, tissue: &Tissue) -> Vec<LotCandidate> {
    let partitions = &inputs.parameters.neighbourhood.off_grid_partitions;
    let type1 = &tissue.off_grid_cluster_type_1;
    let type2 = &tissue.off_grid_cluster_type_2;
    let (min, max) = bounding_box(polygon);
    let narrow_limit = 2.0 * partitions.lot_depth_along_path_m + type1.internal_path_width_m;
    let short_side = (max.x - min.x).min(max.y - min.y);

    let mut candidates = Vec::new();
    if short_side < narrow_limit {
        // Tipo 2: columnas de lotes a ambos lados del cul-de-sac central
        let center_x = (min.x + max.x) / 2.0;
        let depth = type2.lot_depth_behind_cul_de_sac_m;
        let columns = [(center_x - type2.cul_de_sac_width_m / 2.0 - depth, center_x - type2.cul_de_sac_width_m / 2.0),
                       (center_x + type2.cul_de_sac_width_m / 2.0, center_x + type2.cul_de_sac_width_m / 2.0 + depth)];
        for (x0, x1) in columns {
            let column = slot_column(polygon, x0, x1, min.y, max.y, type2.lot_width_m, depth);
            let last = column.len().saturating_sub(1);
            for (i, lot_polygon) in column.into_iter().enumerate() {
                candidates.push(LotCandidate { polygon: lot_polygon,
                                               corner: i == 0 || i == last,
                                               floors_allowed: type1.number_of_floors,
                                               cluster_type: Some(OffGridType::Type2) });
            }
        }
    } else {
        // Tipo 1: dos hileras flanqueando el sendero interno
        let path_half = type1.internal_path_width_m / 2.0;
        let center_y = (min.y + max.y) / 2.0;
        let depth = partitions.lot_depth_along_path_m;
        let rows = [(center_y - path_half - depth, center_y - path_half), (center_y + path_half, center_y + path_half + depth)];
        for (y0, y1) in rows {
            let row = slot_row(polygon, min.x, max.x, y0, y1, type1.lot_width_m, depth);
            let last = row.len().saturating_sub(1);
            for (i, lot_polygon) in row.into_iter().enumerate() {
                candidates.push(LotCandidate { polygon: lot_polygon,
                                               corner: i == 0 || i == last,
                                               floors_allowed: type1.number_of_floors,
                                               cluster_type: Some(OffGridType::Type1) });
            }
        }
    }
    candidates
}

// Ranuras de ancho `width` a lo largo de x, recortadas a la celda. Conserva
// las que retienen al menos `KEEP_RATIO` del área nominal.
fn slot_row(polygon: &[Vec2], x0: f64, x1: f64, y0: f64, y1: f64, width: f64, depth: f64) -> Vec<Vec<Vec2>> {
    let nominal = width * depth;
    let mut kept = Vec::new();
    let mut x = x0;
    while x < x1 - 1e-9 {
        let right = (x + width).min(x1);
        let rect = [Vec2::new(x, y0), Vec2::new(right, y0), Vec2::new(right, y1), Vec2::new(x, y1)];
        let mut clipped = clip_polygon(polygon, &rect);
        if geometry_ops::polygon_area(&clipped).abs() >= KEEP_RATIO * nominal {
            geometry_ops::ensure_ccw(&mut clipped);
            kept.push(clipped);
        }
        x = right;
    }
    kept
}

// Variante vertical: ranuras a lo largo de y.
fn slot_column(polygon: &[Vec2], x0: f64, x1: f64, y0: f64, y1: f64, width: f64, depth: f64) -> Vec<Vec<Vec2>> {
    let nominal = width * depth;
    let mut kept = Vec::new();
    let mut y = y0;
    while y < y1 - 1e-9 {
        let top = (y + width).min(y1);
        let rect = [Vec2::new(x0, y), Vec2::new(x1, y), Vec2::new(x1, top), Vec2::new(x0, top)];
        let mut clipped = clip_polygon(polygon, &rect);
        if geometry_ops::polygon_area(&clipped).abs() >= KEEP_RATIO * nominal {
            geometry_ops::ensure_ccw(&mut clipped);
            kept.push(clipped);
        }
        y = top;
    }
    kept
}
