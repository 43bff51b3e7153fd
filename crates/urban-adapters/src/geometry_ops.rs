//! Operaciones de geometría plana sobre el marco métrico local del sitio.
//!
//! Convenciones:
//! - `LocalFrame` proyecta lon/lat a un plano en metros anclado al primer
//!   vértice del sitio (equirectangular local, suficiente a escala de barrio).
//! - Los polígonos circulan abiertos (sin vértice de cierre) y los anillos
//!   de trabajo se normalizan a orientación antihoraria.
//! - Toda operación es determinista: mismo input, mismos bits de salida.

use urban_domain::{Point, RoadLine, SiteRing};

/// Metros por grado de latitud (esfera de referencia).
pub const METERS_PER_DEG_LAT: f64 = 111_320.0;

const GEOM_EPS: f64 = 1e-9;

/// Vector 2D en metros locales.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }

    pub fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(self, factor: f64) -> Vec2 {
        Vec2::new(self.x * factor, self.y * factor)
    }

    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Producto cruzado escalar (componente z).
    pub fn cross(self, other: Vec2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f64 {
        self.sub(other).length()
    }

    /// Normal izquierda (rotación de 90° antihoraria).
    pub fn perp(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    /// Vector unitario; un vector de largo cero se devuelve tal cual.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len > GEOM_EPS {
            self.scale(1.0 / len)
        } else {
            self
        }
    }
}

/// Proyección equirectangular local anclada al sitio. La escala en x se
/// corrige por el coseno de la latitud del ancla.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    origin: Point,
    meters_per_deg_x: f64,
}

impl LocalFrame {
    pub fn for_site(site: &SiteRing) -> Self {
        let origin = site.vertices()[0];
        LocalFrame { origin,
                     meters_per_deg_x: METERS_PER_DEG_LAT * origin.y.to_radians().cos() }
    }

    pub fn to_local(&self, p: Point) -> Vec2 {
        Vec2::new((p.x - self.origin.x) * self.meters_per_deg_x,
                  (p.y - self.origin.y) * METERS_PER_DEG_LAT)
    }

    pub fn ring_to_local(&self, site: &SiteRing) -> Vec<Vec2> {
        site.vertices().iter().map(|p| self.to_local(*p)).collect()
    }

    pub fn path_to_local(&self, line: &RoadLine) -> Vec<Vec2> {
        line.vertices().iter().map(|p| self.to_local(*p)).collect()
    }
}

/// Área con signo (positiva para anillos antihorarios), en m².
pub fn polygon_area(poly: &[Vec2]) -> f64 {
    let n = poly.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        acc += a.cross(b);
    }
    acc / 2.0
}

/// Centroide del polígono; cae al promedio de vértices cuando el área es
/// cercana a cero.
pub fn polygon_centroid(poly: &[Vec2]) -> Vec2 {
    let area = polygon_area(poly);
    if area.abs() < GEOM_EPS {
        let n = poly.len().max(1) as f64;
        let sum = poly.iter().fold(Vec2::new(0.0, 0.0), |acc, p| acc.add(*p));
        return sum.scale(1.0 / n);
    }
    let n = poly.len();
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        let w = a.cross(b);
        cx += (a.x + b.x) * w;
        cy += (a.y + b.y) * w;
    }
    Vec2::new(cx / (6.0 * area), cy / (6.0 * area))
}

/// Reorienta el anillo a antihorario si hace falta.
pub fn ensure_ccw(poly: &mut [Vec2]) {
    if polygon_area(poly) < 0.0 {
        poly.reverse();
    }
}

/// Largo de una polilínea abierta.
pub fn path_length(path: &[Vec2]) -> f64 {
    path.windows(2).map(|pair| pair[0].distance(pair[1])).sum()
}

/// Detecta un rectángulo alineado al eje: cuatro vértices cuya área iguala
/// la de su caja envolvente. Retorna las esquinas `(min, max)`.
pub fn axis_rect(poly: &[Vec2]) -> Option<(Vec2, Vec2)> {
    if poly.len() != 4 {
        return None;
    }
    let (min, max) = bounding_box(poly);
    let box_area = (max.x - min.x) * (max.y - min.y);
    let area = polygon_area(poly).abs();
    if box_area > GEOM_EPS && (box_area - area).abs() <= 1e-6 * box_area.max(1.0) {
        Some((min, max))
    } else {
        None
    }
}

/// Caja envolvente `(min, max)`; origen para entradas vacías.
pub fn bounding_box(poly: &[Vec2]) -> (Vec2, Vec2) {
    let mut min = Vec2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in poly {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    if poly.is_empty() {
        return (Vec2::new(0.0, 0.0), Vec2::new(0.0, 0.0));
    }
    (min, max)
}

/// Test punto-en-polígono por cruce de rayos (regla par-impar).
pub fn point_in_polygon(p: Vec2, poly: &[Vec2]) -> bool {
    let n = poly.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let a = poly[i];
        let b = poly[j];
        if (a.y > p.y) != (b.y > p.y) {
            let slope_x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < slope_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    let ab = b.sub(a);
    let len_sq = ab.dot(ab);
    if len_sq < GEOM_EPS {
        return p.distance(a);
    }
    let t = (p.sub(a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a.add(ab.scale(t)))
}

/// Distancia mínima de un punto a una polilínea abierta.
pub fn distance_to_path(p: Vec2, path: &[Vec2]) -> f64 {
    if path.len() < 2 {
        return path.first().map(|a| p.distance(*a)).unwrap_or(f64::INFINITY);
    }
    path.windows(2)
        .map(|pair| point_segment_distance(p, pair[0], pair[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Distancia mínima de un punto al borde de un anillo cerrado.
pub fn distance_to_ring(p: Vec2, ring: &[Vec2]) -> f64 {
    let n = ring.len();
    if n < 2 {
        return ring.first().map(|a| p.distance(*a)).unwrap_or(f64::INFINITY);
    }
    (0..n).map(|i| point_segment_distance(p, ring[i], ring[(i + 1) % n]))
          .fold(f64::INFINITY, f64::min)
}

fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let d1 = b.sub(a).cross(p.sub(a));
    let d2 = c.sub(b).cross(p.sub(b));
    let d3 = a.sub(c).cross(p.sub(c));
    d1 >= -GEOM_EPS && d2 >= -GEOM_EPS && d3 >= -GEOM_EPS
}

/// Triangulación por recorte de orejas de un anillo simple.
///
/// Los índices devueltos refieren al arreglo de entrada. Retorna `None` si
/// el anillo es degenerado o el recorte no converge (auto-intersección o
/// colinealidad numérica).
pub fn triangulate(poly: &[Vec2]) -> Option<Vec<[usize; 3]>> {
    let n = poly.len();
    if n < 3 {
        return None;
    }
    if polygon_area(poly).abs() < GEOM_EPS {
        return None;
    }

    // Trabajar siempre en orientación antihoraria, recordando el mapeo a
    // índices originales.
    let ccw = polygon_area(poly) > 0.0;
    let mut indices: Vec<usize> = if ccw {
        (0..n).collect()
    } else {
        (0..n).rev().collect()
    };

    let mut triangles = Vec::with_capacity(n - 2);
    let mut stall = 0usize;
    while indices.len() > 3 {
        let m = indices.len();
        let mut clipped = false;
        for i in 0..m {
            let prev = poly[indices[(i + m - 1) % m]];
            let cur = poly[indices[i]];
            let next = poly[indices[(i + 1) % m]];
            // Oreja: vértice convexo sin otros vértices dentro del triángulo
            if cur.sub(prev).cross(next.sub(cur)) <= GEOM_EPS {
                continue;
            }
            let mut blocked = false;
            for (k, &idx) in indices.iter().enumerate() {
                if k == (i + m - 1) % m || k == i || k == (i + 1) % m {
                    continue;
                }
                if point_in_triangle(poly[idx], prev, cur, next) {
                    blocked = true;
                    break;
                }
            }
            if blocked {
                continue;
            }
            triangles.push([indices[(i + m - 1) % m], indices[i], indices[(i + 1) % m]]);
            indices.remove(i);
            clipped = true;
            break;
        }
        if !clipped {
            stall += 1;
            if stall > 1 {
                return None;
            }
        } else {
            stall = 0;
        }
    }
    triangles.push([indices[0], indices[1], indices[2]]);
    Some(triangles)
}

/// Recorte Sutherland-Hodgman del polígono `subject` contra un recinto
/// `clip` convexo antihorario. Puede devolver un polígono vacío.
pub fn clip_polygon(subject: &[Vec2], clip: &[Vec2]) -> Vec<Vec2> {
    let mut output: Vec<Vec2> = subject.to_vec();
    let n = clip.len();
    for i in 0..n {
        if output.is_empty() {
            return output;
        }
        let a = clip[i];
        let b = clip[(i + 1) % n];
        let edge = b.sub(a);
        let input = std::mem::take(&mut output);
        let m = input.len();
        for j in 0..m {
            let cur = input[j];
            let next = input[(j + 1) % m];
            let cur_in = edge.cross(cur.sub(a)) >= -GEOM_EPS;
            let next_in = edge.cross(next.sub(a)) >= -GEOM_EPS;
            if cur_in {
                output.push(cur);
                if !next_in {
                    output.push(edge_intersection(cur, next, a, b));
                }
            } else if next_in {
                output.push(edge_intersection(cur, next, a, b));
            }
        }
    }
    output
}

// Intersección de la recta cur->next con la recta a->b. Los llamadores
// garantizan que los segmentos cruzan el semiplano.
fn edge_intersection(cur: Vec2, next: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let d1 = next.sub(cur);
    let d2 = b.sub(a);
    let denom = d1.cross(d2);
    if denom.abs() < GEOM_EPS {
        return cur;
    }
    let t = a.sub(cur).cross(d2) / denom;
    cur.add(d1.scale(t))
}

/// Contracción aproximada del polígono hacia su centroide. Válida para
/// márgenes pequeños relativos al tamaño del anillo; un margen mayor que la
/// distancia al centroide colapsa el vértice en el centroide.
pub fn shrink_toward_centroid(poly: &[Vec2], margin: f64) -> Vec<Vec2> {
    let c = polygon_centroid(poly);
    poly.iter()
        .map(|v| {
            let d = v.distance(c);
            if d <= margin {
                c
            } else {
                c.add(v.sub(c).scale(1.0 - margin / d))
            }
        })
        .collect()
}

/// Desplaza una polilínea hacia su izquierda (offset positivo) usando
/// normales promediadas por vértice.
pub fn offset_path(path: &[Vec2], offset: f64) -> Vec<Vec2> {
    let n = path.len();
    if n < 2 {
        return path.to_vec();
    }
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let normal = if i == 0 {
            path[1].sub(path[0]).normalized().perp()
        } else if i == n - 1 {
            path[n - 1].sub(path[n - 2]).normalized().perp()
        } else {
            let before = path[i].sub(path[i - 1]).normalized().perp();
            let after = path[i + 1].sub(path[i]).normalized().perp();
            before.add(after).normalized()
        };
        out.push(path[i].add(normal.scale(offset)));
    }
    out
}

/// Un quad antihorario por segmento de la polilínea, de ancho `width`.
pub fn ribbon(path: &[Vec2], width: f64) -> Vec<[Vec2; 4]> {
    let half = width / 2.0;
    path.windows(2)
        .map(|pair| {
            let n = pair[1].sub(pair[0]).normalized().perp().scale(half);
            [pair[0].sub(n), pair[1].sub(n), pair[1].add(n), pair[0].add(n)]
        })
        .collect()
}

/// Puntos sobre la polilínea cada `spacing` metros de arco, empezando en
/// `start_offset` desde el primer vértice.
pub fn points_along(path: &[Vec2], spacing: f64, start_offset: f64) -> Vec<Vec2> {
    let mut out = Vec::new();
    if spacing <= GEOM_EPS {
        return out;
    }
    let mut next = start_offset;
    let mut walked = 0.0;
    for pair in path.windows(2) {
        let seg_len = pair[0].distance(pair[1]);
        if seg_len < GEOM_EPS {
            continue;
        }
        while next <= walked + seg_len {
            let t = (next - walked) / seg_len;
            out.push(pair[0].add(pair[1].sub(pair[0]).scale(t)));
            next += spacing;
        }
        walked += seg_len;
    }
    out
}

/// Particiona el contorno en celdas de grilla alineadas al eje, recortadas
/// al contorno. Descarta restos con área menor al cuarto de celda nominal.
/// El orden es fila-columna desde la esquina mínima.
pub fn grid_cells(boundary: &[Vec2], cell_w: f64, cell_h: f64) -> Vec<Vec<Vec2>> {
    let (min, max) = bounding_box(boundary);
    let min_area = 0.25 * cell_w * cell_h;
    let mut cells = Vec::new();
    let mut y = min.y;
    while y < max.y - GEOM_EPS {
        let y1 = (y + cell_h).min(max.y);
        let mut x = min.x;
        while x < max.x - GEOM_EPS {
            let x1 = (x + cell_w).min(max.x);
            let rect = [Vec2::new(x, y), Vec2::new(x1, y), Vec2::new(x1, y1), Vec2::new(x, y1)];
            let mut clipped = clip_polygon(boundary, &rect);
            if polygon_area(&clipped).abs() >= min_area {
                ensure_ccw(&mut clipped);
                cells.push(clipped);
            }
            x = x1;
        }
        y = y1;
    }
    cells
}
