//! Geometría de entrada del pipeline urbano.
//!
//! Este módulo define los tipos geométricos base (`Point`, `SiteRing`,
//! `RoadLine`, `RoadNetwork`) y su validación. Reglas clave:
//! - Los constructores validan; nunca circula geometría sin validar.
//! - El anillo del sitio se normaliza a forma abierta (sin vértice de cierre
//!   repetido) y debe ser simple (sin auto-intersecciones).
//! - Las coordenadas son lon/lat en grados y deben ser finitas y estar dentro
//!   de los límites geográficos.
//! - La entrada acepta GeoJSON como geometría directa, `Feature` o
//!   `FeatureCollection`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::DomainError;

const LON_MIN: f64 = -180.0;
const LON_MAX: f64 = 180.0;
const LAT_MIN: f64 = -90.0;
const LAT_MAX: f64 = 90.0;

/// Coordenada plana lon/lat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    fn validate_bounds(&self, what: &str) -> Result<(), DomainError> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(DomainError::ValidationError(format!("{what}: coordenada no finita ({}, {})", self.x, self.y)));
        }
        if self.x < LON_MIN || self.x > LON_MAX || self.y < LAT_MIN || self.y > LAT_MAX {
            return Err(DomainError::ValidationError(format!("{what}: coordenada fuera de rango geográfico ({}, {})",
                                                            self.x, self.y)));
        }
        Ok(())
    }
}

// Producto cruzado del giro a->b->c. Signo positivo = giro antihorario.
fn cross(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Intersección de segmentos (incluye casos colineales solapados).
fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0)) && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0)) {
        return true;
    }
    if d1 == 0.0 && on_segment(q1, q2, p1) {
        return true;
    }
    if d2 == 0.0 && on_segment(q1, q2, p2) {
        return true;
    }
    if d3 == 0.0 && on_segment(p1, p2, q1) {
        return true;
    }
    if d4 == 0.0 && on_segment(p1, p2, q2) {
        return true;
    }
    false
}

fn coordinates_from_value(value: &Value, what: &str) -> Result<Vec<Point>, DomainError> {
    let pairs = value.as_array()
                     .ok_or_else(|| DomainError::ValidationError(format!("{what}: coordinates debe ser un arreglo")))?;
    let mut points = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let nums = pair.as_array()
                       .ok_or_else(|| DomainError::ValidationError(format!("{what}: coordenada no es un par [x, y]")))?;
        if nums.len() < 2 {
            return Err(DomainError::ValidationError(format!("{what}: coordenada incompleta")));
        }
        let x = nums[0].as_f64()
                       .ok_or_else(|| DomainError::ValidationError(format!("{what}: coordenada x no numérica")))?;
        let y = nums[1].as_f64()
                       .ok_or_else(|| DomainError::ValidationError(format!("{what}: coordenada y no numérica")))?;
        points.push(Point::new(x, y));
    }
    Ok(points)
}

// Desenvuelve Feature / FeatureCollection hasta las geometrías del tipo
// esperado. Una colección debe traer al menos un feature y cada feature debe
// coincidir con el tipo pedido.
fn unwrap_geometries<'a>(value: &'a Value, expected: &str) -> Result<Vec<&'a Value>, DomainError> {
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            let features = value.get("features")
                                .and_then(Value::as_array)
                                .ok_or_else(|| DomainError::ValidationError("FeatureCollection sin features".to_string()))?;
            if features.is_empty() {
                return Err(DomainError::ValidationError("FeatureCollection sin features".to_string()));
            }
            let mut out = Vec::with_capacity(features.len());
            for feature in features {
                let geometry = feature.get("geometry")
                                      .ok_or_else(|| DomainError::ValidationError("feature sin geometry".to_string()))?;
                if geometry.get("type").and_then(Value::as_str) != Some(expected) {
                    return Err(DomainError::ValidationError(format!("feature con geometría distinta de {expected}")));
                }
                out.push(geometry);
            }
            Ok(out)
        }
        Some("Feature") => {
            let geometry = value.get("geometry")
                                .ok_or_else(|| DomainError::ValidationError("feature sin geometry".to_string()))?;
            if geometry.get("type").and_then(Value::as_str) != Some(expected) {
                return Err(DomainError::ValidationError(format!("feature con geometría distinta de {expected}")));
            }
            Ok(vec![geometry])
        }
        Some(kind) if kind == expected => Ok(vec![value]),
        Some(kind) => Err(DomainError::ValidationError(format!("se esperaba {expected}, llegó {kind}"))),
        None => Err(DomainError::ValidationError("GeoJSON sin campo type".to_string())),
    }
}

/// Anillo exterior del sitio, normalizado a forma abierta y garantizado
/// simple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRing {
    vertices: Vec<Point>,
}

impl SiteRing {
    /// Crea un anillo validado a partir de una secuencia de vértices.
    ///
    /// # Argumentos
    /// * `vertices` - Vértices del anillo, con o sin vértice de cierre
    ///
    /// # Errores
    /// Retorna `DomainError::ValidationError` si el anillo tiene menos de 3
    /// vértices distintos, repite vértices, sale de rango geográfico o se
    /// auto-intersecta.
    pub fn new(mut vertices: Vec<Point>) -> Result<Self, DomainError> {
        // Normalizar el cierre GeoJSON (primer vértice repetido al final)
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return Err(DomainError::ValidationError(format!("el sitio requiere al menos 3 vértices distintos, llegaron {}",
                                                            vertices.len())));
        }
        for vertex in &vertices {
            vertex.validate_bounds("sitio")?;
        }
        // Vértices repetidos rompen la simplicidad del anillo
        for i in 0..vertices.len() {
            for j in (i + 1)..vertices.len() {
                if vertices[i] == vertices[j] {
                    return Err(DomainError::ValidationError(format!("el sitio repite el vértice ({}, {})",
                                                                    vertices[i].x, vertices[i].y)));
                }
            }
        }
        let ring = SiteRing { vertices };
        if !ring.is_simple() {
            return Err(DomainError::ValidationError("el sitio se auto-intersecta".to_string()));
        }
        if ring.signed_area() == 0.0 {
            return Err(DomainError::ValidationError("el sitio es degenerado (área cero)".to_string()));
        }
        Ok(ring)
    }

    /// Construye el anillo desde GeoJSON (`Polygon`, `Feature` o
    /// `FeatureCollection`). Usa el anillo exterior del primer polígono.
    pub fn from_geojson(value: &Value) -> Result<Self, DomainError> {
        let geometries = unwrap_geometries(value, "Polygon")?;
        let rings = geometries[0].get("coordinates")
                                 .and_then(Value::as_array)
                                 .ok_or_else(|| DomainError::ValidationError("Polygon sin coordinates".to_string()))?;
        let exterior = rings.first()
                            .ok_or_else(|| DomainError::ValidationError("Polygon sin anillo exterior".to_string()))?;
        SiteRing::new(coordinates_from_value(exterior, "sitio")?)
    }

    // Chequeo de simplicidad: ningún par de aristas no adyacentes se cruza.
    fn is_simple(&self) -> bool {
        let n = self.vertices.len();
        for i in 0..n {
            let p1 = self.vertices[i];
            let p2 = self.vertices[(i + 1) % n];
            for j in (i + 1)..n {
                // Aristas adyacentes comparten vértice por construcción
                if j == i || (j + 1) % n == i || (i + 1) % n == j {
                    continue;
                }
                let q1 = self.vertices[j];
                let q2 = self.vertices[(j + 1) % n];
                if segments_intersect(p1, p2, q1, q2) {
                    return false;
                }
            }
        }
        true
    }

    /// Área con signo (fórmula del polígono); positiva si el anillo es
    /// antihorario. En unidades de coordenadas.
    pub fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        let mut acc = 0.0;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            acc += a.x * b.y - b.x * a.y;
        }
        acc / 2.0
    }

    /// Serializa el anillo como GeoJSON `Polygon` cerrado.
    pub fn to_geojson(&self) -> Value {
        let mut ring: Vec<[f64; 2]> = self.vertices.iter().map(|p| [p.x, p.y]).collect();
        if let Some(first) = ring.first().copied() {
            ring.push(first);
        }
        json!({ "type": "Polygon", "coordinates": [ring] })
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }
}

/// Una polilínea de la red vial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadLine {
    vertices: Vec<Point>,
}

impl RoadLine {
    /// Crea una polilínea validada.
    ///
    /// # Errores
    /// Retorna `DomainError::ValidationError` si tiene menos de 2 vértices,
    /// repite vértices consecutivos o sale de rango geográfico.
    pub fn new(vertices: Vec<Point>) -> Result<Self, DomainError> {
        if vertices.len() < 2 {
            return Err(DomainError::ValidationError(format!("una vía requiere al menos 2 vértices, llegaron {}",
                                                            vertices.len())));
        }
        for vertex in &vertices {
            vertex.validate_bounds("vía")?;
        }
        for pair in vertices.windows(2) {
            if pair[0] == pair[1] {
                return Err(DomainError::ValidationError(format!("vía con segmento de largo cero en ({}, {})",
                                                                pair[0].x, pair[0].y)));
            }
        }
        Ok(RoadLine { vertices })
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }
}

/// Conjunto de polilíneas viales que acompaña al sitio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadNetwork {
    lines: Vec<RoadLine>,
}

impl RoadNetwork {
    pub fn new(lines: Vec<RoadLine>) -> Result<Self, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::ValidationError("la red vial no puede estar vacía".to_string()));
        }
        Ok(RoadNetwork { lines })
    }

    /// Construye la red desde GeoJSON: `LineString`, `Feature`,
    /// `FeatureCollection` o un arreglo de cualquiera de los anteriores.
    pub fn from_geojson(value: &Value) -> Result<Self, DomainError> {
        let mut lines = Vec::new();
        let candidates: Vec<&Value> = match value.as_array() {
            Some(items) => items.iter().collect(),
            None => vec![value],
        };
        for candidate in candidates {
            for geometry in unwrap_geometries(candidate, "LineString")? {
                let coordinates = geometry.get("coordinates")
                                          .ok_or_else(|| DomainError::ValidationError("LineString sin coordinates".to_string()))?;
                lines.push(RoadLine::new(coordinates_from_value(coordinates, "vía")?)?);
            }
        }
        RoadNetwork::new(lines)
    }

    /// Serializa la red como GeoJSON `FeatureCollection` de `LineString`.
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> =
            self.lines
                .iter()
                .map(|line| {
                    let coordinates: Vec<[f64; 2]> = line.vertices().iter().map(|p| [p.x, p.y]).collect();
                    json!({ "type": "Feature",
                            "properties": {},
                            "geometry": { "type": "LineString", "coordinates": coordinates } })
                })
                .collect();
        json!({ "type": "FeatureCollection", "features": features })
    }

    pub fn lines(&self) -> &[RoadLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
