//! Contexto de sitio compartido por los constructores de capa.
//!
//! Resuelve una sola vez por computación:
//! - el marco métrico local y el contorno antihorario del sitio,
//! - la clasificación de la red vial efectiva en arterias, secundarias y
//!   locales con sus anchos de parámetro,
//! - el área del sitio en m².

use serde::{Deserialize, Serialize};

use urban_core::{EngineError, ResolvedInputs};
use urban_domain::{ProjectParameters, RoadNetwork, SiteRing};

use crate::geometry_ops::{self, LocalFrame, Vec2};

/// Jerarquía vial. Gobierna anchos, profundidades de partición y configuración
/// de lotes de frente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadClass {
    Artery,
    Secondary,
    Local,
}

/// Una vía clasificada en coordenadas locales.
#[derive(Debug, Clone)]
pub struct ClassifiedRoad {
    pub class: RoadClass,
    pub width_m: f64,
    pub path: Vec<Vec2>,
}

impl ClassifiedRoad {
    pub fn length_m(&self) -> f64 {
        geometry_ops::path_length(&self.path)
    }
}

/// Insumos geométricos resueltos de la computación.
pub struct SiteContext {
    pub frame: LocalFrame,
    pub boundary: Vec<Vec2>,
    pub roads: Vec<ClassifiedRoad>,
    pub area_m2: f64,
}

// Umbrales de clasificación: largo de la vía relativo a la diagonal de la
// caja del sitio.
const ARTERY_LENGTH_RATIO: f64 = 0.75;
const SECONDARY_LENGTH_RATIO: f64 = 0.35;

impl SiteContext {
    /// Construye el contexto de una computación de capa.
    pub fn from_inputs(inputs: &ResolvedInputs) -> Result<Self, EngineError> {
        Self::new(&inputs.site, inputs.effective_roads(), &inputs.parameters)
    }

    /// Proyecta el sitio al marco local y clasifica la red vial.
    ///
    /// # Errores
    /// Retorna `EngineError::DegenerateGeometry` si el sitio proyectado
    /// colapsa a área nula (por ejemplo en latitudes polares).
    pub fn new(site: &SiteRing,
               network: Option<&RoadNetwork>,
               parameters: &ProjectParameters)
               -> Result<Self, EngineError> {
        let frame = LocalFrame::for_site(site);
        let mut boundary = frame.ring_to_local(site);
        geometry_ops::ensure_ccw(&mut boundary);
        let area_m2 = geometry_ops::polygon_area(&boundary);
        if area_m2 <= 0.0 {
            return Err(EngineError::DegenerateGeometry("el sitio proyectado tiene área nula".to_string()));
        }

        let (min, max) = geometry_ops::bounding_box(&boundary);
        let diagonal = max.sub(min).length();
        let widths = &parameters.neighbourhood.public_roads;
        let roads = network.map(|network| {
                               network.lines()
                                      .iter()
                                      .map(|line| {
                                          let path = frame.path_to_local(line);
                                          let class = classify(geometry_ops::path_length(&path), diagonal);
                                          let width_m = match class {
                                              RoadClass::Artery => widths.width_of_arteries_m,
                                              RoadClass::Secondary => widths.width_of_secondaries_m,
                                              RoadClass::Local => widths.width_of_locals_m,
                                          };
                                          ClassifiedRoad { class, width_m, path }
                                      })
                                      .collect()
                           })
                           .unwrap_or_default();

        Ok(SiteContext { frame,
                         boundary,
                         roads,
                         area_m2 })
    }

    /// Clase de la vía más cercana al punto; `Local` si no hay red vial.
    pub fn nearest_road_class(&self, p: Vec2) -> RoadClass {
        self.roads
            .iter()
            .map(|road| (geometry_ops::distance_to_path(p, &road.path), road.class))
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, class)| class)
            .unwrap_or(RoadClass::Local)
    }

    /// Distancia mínima del punto a cualquier vía clasificada.
    pub fn distance_to_roads(&self, p: Vec2) -> f64 {
        self.roads
            .iter()
            .map(|road| geometry_ops::distance_to_path(p, &road.path))
            .fold(f64::INFINITY, f64::min)
    }
}

fn classify(length_m: f64, site_diagonal_m: f64) -> RoadClass {
    if site_diagonal_m <= 0.0 {
        return RoadClass::Local;
    }
    let ratio = length_m / site_diagonal_m;
    if ratio >= ARTERY_LENGTH_RATIO {
        RoadClass::Artery
    } else if ratio >= SECONDARY_LENGTH_RATIO {
        RoadClass::Secondary
    } else {
        RoadClass::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use urban_domain::{Point, ProjectParameters, RoadLine, RoadNetwork, SiteRing};

    fn inputs_with_roads(roads: Option<RoadNetwork>) -> ResolvedInputs {
        // Cuadrado de ~200 m de lado en el ecuador
        let site = SiteRing::new(vec![Point::new(0.0, 0.0),
                                      Point::new(0.0018, 0.0),
                                      Point::new(0.0018, 0.0018),
                                      Point::new(0.0, 0.0018)]).unwrap();
        ResolvedInputs { site,
                         roads,
                         parameters: ProjectParameters::default(),
                         upstream: BTreeMap::new(),
                         aux_roads: None }
    }

    #[test]
    fn test_context_projects_site_to_meters() {
        let ctx = SiteContext::from_inputs(&inputs_with_roads(None)).unwrap();
        assert!((ctx.area_m2 - 200.376_f64.powi(2)).abs() / ctx.area_m2 < 0.01);
        assert!(ctx.roads.is_empty());
        assert_eq!(ctx.nearest_road_class(Vec2::new(10.0, 10.0)), RoadClass::Local);
    }

    #[test]
    fn test_roads_classified_by_relative_length() {
        // Diagonal completa, media vía horizontal y un tramo corto
        let network = RoadNetwork::new(vec![
            RoadLine::new(vec![Point::new(0.0, 0.0), Point::new(0.0018, 0.0018)]).unwrap(),
            RoadLine::new(vec![Point::new(0.0, 0.0009), Point::new(0.0009, 0.0009)]).unwrap(),
            RoadLine::new(vec![Point::new(0.0004, 0.0004), Point::new(0.0005, 0.0004)]).unwrap(),
        ]).unwrap();
        let ctx = SiteContext::from_inputs(&inputs_with_roads(Some(network))).unwrap();
        let classes: Vec<RoadClass> = ctx.roads.iter().map(|r| r.class).collect();
        assert_eq!(classes, vec![RoadClass::Artery, RoadClass::Secondary, RoadClass::Local]);
        assert_eq!(ctx.roads[0].width_m, 20.0);
        assert_eq!(ctx.roads[1].width_m, 15.0);
        assert_eq!(ctx.roads[2].width_m, 10.0);
    }

    #[test]
    fn test_nearest_road_class_picks_closest_path() {
        let network = RoadNetwork::new(vec![
            RoadLine::new(vec![Point::new(0.0, 0.0), Point::new(0.0018, 0.0)]).unwrap(),
            RoadLine::new(vec![Point::new(0.0, 0.0018), Point::new(0.0009, 0.0018)]).unwrap(),
        ]).unwrap();
        let ctx = SiteContext::from_inputs(&inputs_with_roads(Some(network))).unwrap();
        // Cerca del borde inferior domina la vía larga (artery)
        assert_eq!(ctx.nearest_road_class(Vec2::new(100.0, 5.0)), RoadClass::Artery);
        // Cerca del borde superior domina la vía corta (secondary)
        assert_eq!(ctx.nearest_road_class(Vec2::new(50.0, 195.0)), RoadClass::Secondary);
    }
}
