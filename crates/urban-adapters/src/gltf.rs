//! Escritor glTF 2.0 mínimo: una malla indexada de triángulos con el buffer
//! binario embebido como data URI base64.
//!
//! El documento emitido usa un solo buffer con dos vistas (posiciones e
//! índices), accessors con `min`/`max` como exige el formato, y una escena
//! con un único nodo. Ejes: x/y del marco local en el plano, z hacia arriba.

use serde_json::json;

use crate::geometry_ops::{triangulate, Vec2};

/// Acumulador de geometría. Las coordenadas se reducen a `f32` recién al
/// emitir, como pide el formato.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    positions: Vec<[f32; 3]>,
    indices: Vec<u32>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        MeshBuilder::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn push_vertex(&mut self, v: Vec2, z: f64) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push([v.x as f32, v.y as f32, z as f32]);
        index
    }

    pub fn push_triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, z: f64) {
        let ia = self.push_vertex(a, z);
        let ib = self.push_vertex(b, z);
        let ic = self.push_vertex(c, z);
        self.indices.extend_from_slice(&[ia, ib, ic]);
    }

    /// Quad plano como dos triángulos. Se asume antihorario.
    pub fn push_quad(&mut self, quad: &[Vec2; 4], z: f64) {
        let base = self.positions.len() as u32;
        for v in quad {
            self.push_vertex(*v, z);
        }
        self.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Polígono plano a altura `z`. Retorna `false` si el anillo no se pudo
    /// triangular (degenerado), en cuyo caso no agrega nada.
    pub fn push_polygon(&mut self, poly: &[Vec2], z: f64) -> bool {
        let Some(triangles) = triangulate(poly) else {
            return false;
        };
        let base = self.positions.len() as u32;
        for v in poly {
            self.push_vertex(*v, z);
        }
        for t in triangles {
            self.indices.extend_from_slice(&[base + t[0] as u32, base + t[1] as u32, base + t[2] as u32]);
        }
        true
    }

    /// Prisma recto: extruye el polígono entre `z0` y `z1` con tapas y
    /// paredes. Retorna `false` si la base no se pudo triangular.
    pub fn push_prism(&mut self, poly: &[Vec2], z0: f64, z1: f64) -> bool {
        let Some(triangles) = triangulate(poly) else {
            return false;
        };
        let n = poly.len() as u32;
        let bottom = self.positions.len() as u32;
        for v in poly {
            self.push_vertex(*v, z0);
        }
        let top = self.positions.len() as u32;
        for v in poly {
            self.push_vertex(*v, z1);
        }
        for t in &triangles {
            // Tapa inferior mirando hacia abajo, superior hacia arriba
            self.indices.extend_from_slice(&[bottom + t[2] as u32, bottom + t[1] as u32, bottom + t[0] as u32]);
            self.indices.extend_from_slice(&[top + t[0] as u32, top + t[1] as u32, top + t[2] as u32]);
        }
        for i in 0..n {
            let j = (i + 1) % n;
            self.indices.extend_from_slice(&[bottom + i, bottom + j, top + j, bottom + i, top + j, top + i]);
        }
        true
    }

    /// Incorpora otra malla reindexando sus triángulos.
    pub fn append(&mut self, other: MeshBuilder) {
        let base = self.positions.len() as u32;
        self.positions.extend(other.positions);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
    }

    /// Serializa el documento glTF. Una malla sin geometría emite un
    /// triángulo degenerado en el origen: el formato exige accessors con
    /// `count` mayor a cero.
    pub fn build(mut self, name: &str) -> serde_json::Result<Vec<u8>> {
        if self.indices.is_empty() {
            let origin = Vec2::new(0.0, 0.0);
            self.push_triangle(origin, origin, origin, 0.0);
        }

        let mut buffer = Vec::with_capacity(self.positions.len() * 12 + self.indices.len() * 4);
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for p in &self.positions {
            for (axis, &c) in p.iter().enumerate() {
                min[axis] = min[axis].min(c);
                max[axis] = max[axis].max(c);
                buffer.extend_from_slice(&c.to_le_bytes());
            }
        }
        let positions_len = buffer.len();
        for i in &self.indices {
            buffer.extend_from_slice(&i.to_le_bytes());
        }

        let document = json!({
            "asset": { "version": "2.0", "generator": "urban-adapters" },
            "buffers": [{
                "uri": format!("data:application/octet-stream;base64,{}", base64_encode(&buffer)),
                "byteLength": buffer.len()
            }],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": positions_len, "target": 34962 },
                { "buffer": 0, "byteOffset": positions_len, "byteLength": buffer.len() - positions_len, "target": 34963 }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": self.positions.len(),
                  "type": "VEC3", "min": min, "max": max },
                { "bufferView": 1, "componentType": 5125, "count": self.indices.len(), "type": "SCALAR" }
            ],
            "meshes": [{ "name": name, "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "mode": 4 }] }],
            "nodes": [{ "mesh": 0, "name": name }],
            "scenes": [{ "nodes": [0] }],
            "scene": 0
        });
        serde_json::to_vec(&document)
    }
}

const BASE64_ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

// Codificación estándar con padding `=`.
fn base64_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() + 2) / 3 * 4);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let triple = (b0 << 16) | (b1 << 8) | b2;
        out.push(BASE64_ALPHABET[(triple >> 18) as usize & 63] as char);
        out.push(BASE64_ALPHABET[(triple >> 12) as usize & 63] as char);
        out.push(if chunk.len() > 1 { BASE64_ALPHABET[(triple >> 6) as usize & 63] as char } else { '=' });
        out.push(if chunk.len() > 2 { BASE64_ALPHABET[triple as usize & 63] as char } else { '=' });
    }
    out
}
