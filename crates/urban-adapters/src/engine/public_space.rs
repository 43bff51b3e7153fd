//! Capa `public`: veredas, arbolado y reservas de espacio abierto.
//!
//! Depende sólo de la geometría base: las veredas acompañan la red vial
//! clasificada (o el perímetro del sitio cuando no hay red) y el arbolado se
//! distribuye sobre ellas al espaciamiento configurado. Las reservas de
//! espacio abierto y equipamiento se dimensionan como porcentaje del área
//! del sitio.

use urban_core::{EngineError, EngineOutput, ResolvedInputs};

use super::context::SiteContext;
use super::features::{PublicSpacePayload, PAYLOAD_SCHEMA_VERSION};
use super::finish_payload;
use crate::geometry_ops::{self, clip_polygon, offset_path, points_along, ribbon, shrink_toward_centroid, Vec2};
use crate::gltf::MeshBuilder;

const PLATE_Z: f64 = 0.15;
const TREE_TRUNK_M: f64 = 0.6;

pub fn build(inputs: &ResolvedInputs) -> Result<EngineOutput, EngineError> {
    let ctx = SiteContext::from_inputs(inputs)?;
    let spaces = &inputs.parameters.neighbourhood.public_spaces;
    let sidewalk_w = spaces.street_section.sidewalk_width_m;

    let sidewalks = sidewalk_paths(&ctx, sidewalk_w);
    let mut mesh = MeshBuilder::new();
    let mut sidewalk_length_m = 0.0;
    for path in &sidewalks {
        sidewalk_length_m += geometry_ops::path_length(path);
        for quad in ribbon(path, sidewalk_w) {
            mesh.push_quad(&quad, PLATE_Z);
        }
    }

    let mut trees = Vec::new();
    if spaces.trees.show_trees_frontend {
        for path in &sidewalks {
            for p in points_along(path, spaces.trees.tree_spacing_m, spaces.trees.tree_spacing_m / 2.0) {
                let h = TREE_TRUNK_M / 2.0;
                let trunk = [Vec2::new(p.x - h, p.y - h),
                             Vec2::new(p.x + h, p.y - h),
                             Vec2::new(p.x + h, p.y + h),
                             Vec2::new(p.x - h, p.y + h)];
                mesh.push_prism(&trunk, PLATE_Z, PLATE_Z + spaces.trees.initial_tree_height_m);
                trees.push([p.x, p.y]);
            }
        }
    }

    let open_space_area_m2 = reserve_plate(&mut mesh,
                                           &ctx,
                                           octagon_of_area(geometry_ops::polygon_centroid(&ctx.boundary),
                                                           spaces.open_spaces.open_space_percentage / 100.0 * ctx.area_m2));
    let amenity_area_m2 = reserve_plate(&mut mesh,
                                        &ctx,
                                        amenity_square(&ctx, spaces.amenities.amenities_percentage / 100.0 * ctx.area_m2));

    let payload = PublicSpacePayload { sidewalk_count: sidewalks.len() as u32,
                                       sidewalk_length_m,
                                       tree_count: trees.len() as u32,
                                       trees,
                                       open_space_area_m2,
                                       amenity_area_m2,
                                       schema_version: PAYLOAD_SCHEMA_VERSION };
    finish_payload(mesh, "public", &payload, None)
}

// Dos veredas por vía, desplazadas media calzada más media vereda. Sin red
// vial, una vereda anular siguiendo el perímetro.
fn sidewalk_paths(ctx: &SiteContext, sidewalk_w: f64) -> Vec<Vec<Vec2>> {
    if ctx.roads.is_empty() {
        let mut ring = shrink_toward_centroid(&ctx.boundary, sidewalk_w / 2.0);
        if let Some(first) = ring.first().copied() {
            ring.push(first);
        }
        return vec![ring];
    }
    let mut paths = Vec::with_capacity(ctx.roads.len() * 2);
    for road in &ctx.roads {
        let offset = road.width_m / 2.0 + sidewalk_w / 2.0;
        paths.push(offset_path(&road.path, offset));
        paths.push(offset_path(&road.path, -offset));
    }
    paths
}

// Recorta la reserva al sitio y la agrega como plancha. Área cero si la
// reserva no aplica.
fn reserve_plate(mesh: &mut MeshBuilder, ctx: &SiteContext, plate: Option<Vec<Vec2>>) -> f64 {
    let Some(plate) = plate else {
        return 0.0;
    };
    let clipped = clip_polygon(&ctx.boundary, &plate);
    let area = geometry_ops::polygon_area(&clipped).abs();
    if area > 0.0 {
        mesh.push_polygon(&clipped, PLATE_Z);
    }
    area
}

fn octagon_of_area(center: Vec2, target_area_m2: f64) -> Option<Vec<Vec2>> {
    if target_area_m2 <= 0.0 {
        return None;
    }
    // Octógono regular de circunradio r: área = 2·√2·r²
    let r = (target_area_m2 / (2.0 * std::f64::consts::SQRT_2)).sqrt();
    let octagon = (0..8).map(|i| {
                          let angle = std::f64::consts::PI / 8.0 + f64::from(i) * std::f64::consts::FRAC_PI_4;
                          Vec2::new(center.x + r * angle.cos(), center.y + r * angle.sin())
                      })
                      .collect();
    Some(octagon)
}

// Cuadrado de equipamiento a medio camino entre el centroide y el primer
// vértice del sitio, para no superponerse con el espacio abierto central.
fn amenity_square(ctx: &SiteContext, target_area_m2: f64) -> Option<Vec<Vec2>> {
    if target_area_m2 <= 0.0 {
        return None;
    }
    let centroid = geometry_ops::polygon_centroid(&ctx.boundary);
    let anchor = ctx.boundary[0];
    let center = centroid.add(anchor.sub(centroid).scale(0.5));
    let half = target_area_m2.sqrt() / 2.0;
    Some(vec![Vec2::new(center.x - half, center.y - half),
              Vec2::new(center.x + half, center.y - half),
              Vec2::new(center.x + half, center.y + half),
              Vec2::new(center.x - half, center.y + half)])
}
