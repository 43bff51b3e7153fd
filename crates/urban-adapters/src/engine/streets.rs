//! Capa `streets`: planchas de rodadura de la red vial clasificada.

use urban_core::{EngineError, EngineOutput, ResolvedInputs};

use super::context::{ClassifiedRoad, RoadClass, SiteContext};
use super::features::{polygon_to_pairs, RoadFeature, StreetsPayload, PAYLOAD_SCHEMA_VERSION};
use super::finish_payload;
use crate::geometry_ops::ribbon;
use crate::gltf::MeshBuilder;

const PLATE_Z: f64 = 0.05;

pub fn build(inputs: &ResolvedInputs) -> Result<EngineOutput, EngineError> {
    let ctx = SiteContext::from_inputs(inputs)?;
    let roads = effective_streets(&ctx, inputs);

    let mut mesh = MeshBuilder::new();
    let mut features = Vec::with_capacity(roads.len());
    let mut total_length_m = 0.0;
    for road in &roads {
        for quad in ribbon(&road.path, road.width_m) {
            mesh.push_quad(&quad, PLATE_Z);
        }
        let length_m = road.length_m();
        total_length_m += length_m;
        features.push(RoadFeature { class: road.class,
                                    width_m: road.width_m,
                                    length_m,
                                    path: polygon_to_pairs(&road.path) });
    }

    let payload = StreetsPayload { roads: features,
                                   total_length_m,
                                   schema_version: PAYLOAD_SCHEMA_VERSION };
    finish_payload(mesh, "streets", &payload, None)
}

// Sin red vial declarada, la calle es el anillo perimetral del sitio como
// vía local cerrada.
fn effective_streets(ctx: &SiteContext, inputs: &ResolvedInputs) -> Vec<ClassifiedRoad> {
    if !ctx.roads.is_empty() {
        return ctx.roads.clone();
    }
    let mut loop_path = ctx.boundary.clone();
    if let Some(first) = loop_path.first().copied() {
        loop_path.push(first);
    }
    vec![ClassifiedRoad { class: RoadClass::Local,
                          width_m: inputs.parameters.neighbourhood.public_roads.width_of_locals_m,
                          path: loop_path }]
}
