//! Capa `clusters`: partición del sitio en macro-manzanas.
//!
//! La grilla usa el bloque tipo de la vialidad local: franjas de lotes en
//! grilla sobre los frentes y clusters fuera de grilla en el interior. Una
//! celda es `on_grid` cuando toca el borde del sitio o una vía clasificada;
//! las celdas interiores quedan `off_grid`.

use urban_core::{EngineError, EngineOutput, ResolvedInputs};

use super::context::SiteContext;
use super::features::{polygon_to_pairs, CellFeature, CellKind, ClustersPayload, PAYLOAD_SCHEMA_VERSION};
use super::finish_payload;
use crate::geometry_ops::{self, distance_to_path, distance_to_ring, grid_cells, shrink_toward_centroid, Vec2};
use crate::gltf::MeshBuilder;

const PLATE_Z: f64 = 0.10;
const STREET_GAP_M: f64 = 1.0;
const BOUNDARY_TOUCH_M: f64 = 0.5;

pub fn build(inputs: &ResolvedInputs) -> Result<EngineOutput, EngineError> {
    let ctx = SiteContext::from_inputs(inputs)?;
    let (block_w, block_h) = block_dimensions(inputs);

    let mut polygons = grid_cells(&ctx.boundary, block_w, block_h);
    if polygons.is_empty() {
        // Sitio menor a un bloque: una sola celda con todo el contorno
        polygons.push(ctx.boundary.clone());
    }

    let mut mesh = MeshBuilder::new();
    let mut cells = Vec::with_capacity(polygons.len());
    for (id, polygon) in polygons.iter().enumerate() {
        let kind = cell_kind(polygon, &ctx);
        let centroid = geometry_ops::polygon_centroid(polygon);
        let plate = shrink_toward_centroid(polygon, STREET_GAP_M);
        mesh.push_polygon(&plate, PLATE_Z);
        cells.push(CellFeature { id: id as u32,
                                 kind,
                                 frontage: ctx.nearest_road_class(centroid),
                                 polygon: polygon_to_pairs(polygon),
                                 area_m2: geometry_ops::polygon_area(polygon) });
    }

    let payload = ClustersPayload { cell_count: cells.len() as u32,
                                    cells,
                                    schema_version: PAYLOAD_SCHEMA_VERSION };
    finish_payload(mesh, "clusters", &payload, None)
}

// Bloque tipo derivado del tier local: interior de clusters fuera de grilla
// más dos franjas de lotes de frente.
fn block_dimensions(inputs: &ResolvedInputs) -> (f64, f64) {
    let neighbourhood = &inputs.parameters.neighbourhood;
    let structure = &neighbourhood.urban_block_structure.along_locals;
    let interior_depth = structure.off_grid_clusters_in_depth_m * neighbourhood.off_grid_partitions.cluster_depth_m;
    let block_h = interior_depth + 2.0 * neighbourhood.on_grid_partitions.depth_along_locals_m;
    let block_w = structure.off_grid_clusters_in_width_m * neighbourhood.off_grid_partitions.cluster_width_m;
    (block_w.max(1.0), block_h.max(1.0))
}

fn cell_kind(polygon: &[Vec2], ctx: &SiteContext) -> CellKind {
    let touches_boundary = polygon.iter().any(|v| distance_to_ring(*v, &ctx.boundary) < BOUNDARY_TOUCH_M);
    let touches_road = ctx.roads.iter().any(|road| {
        polygon.iter().any(|v| distance_to_path(*v, &road.path) <= road.width_m / 2.0 + STREET_GAP_M)
    });
    if touches_boundary || touches_road {
        CellKind::OnGrid
    } else {
        CellKind::OffGrid
    }
}
