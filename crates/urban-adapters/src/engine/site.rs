//! Malla del sitio: plancha del terreno más la rodadura de la red vial.

use urban_core::EngineError;
use urban_domain::{ProjectParameters, RoadNetwork, SiteRing};

use super::context::SiteContext;
use crate::geometry_ops::ribbon;
use crate::gltf::MeshBuilder;

const ROAD_Z: f64 = 0.02;

pub fn render(site: &SiteRing,
              roads: Option<&RoadNetwork>,
              parameters: &ProjectParameters)
              -> Result<Vec<u8>, EngineError> {
    let ctx = SiteContext::new(site, roads, parameters)?;
    let mut mesh = MeshBuilder::new();
    if !mesh.push_polygon(&ctx.boundary, 0.0) {
        return Err(EngineError::DegenerateGeometry("el contorno del sitio no se pudo triangular".to_string()));
    }
    for road in &ctx.roads {
        for quad in ribbon(&road.path, road.width_m) {
            mesh.push_quad(&quad, ROAD_Z);
        }
    }
    mesh.build("site")
        .map_err(|err| EngineError::Failure(format!("glTF del sitio inserializable: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{roads_diagonal, site_square};
    use serde_json::Value;

    #[test]
    fn test_site_render_emits_terrain_plate() {
        let bytes = render(&site_square(), None, &ProjectParameters::default()).unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc["meshes"][0]["name"], "site");
        assert_eq!(doc["accessors"][0]["count"], 4);
    }

    #[test]
    fn test_site_render_includes_road_ribbons() {
        let without = render(&site_square(), None, &ProjectParameters::default()).unwrap();
        let with = render(&site_square(), Some(&roads_diagonal()), &ProjectParameters::default()).unwrap();
        assert!(with.len() > without.len());
    }
}
