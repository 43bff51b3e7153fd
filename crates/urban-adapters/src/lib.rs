//! urban-adapters: motor de geometría determinista del pipeline urbano
//!
//! Este crate provee:
//! - Un toolkit de geometría plana en marco métrico local (`geometry_ops`).
//! - Un escritor glTF 2.0 mínimo con buffer embebido (`gltf`).
//! - `DeterministicEngine`: la implementación por defecto de
//!   `GeometryEngine`, que deriva cada capa (calles, clusters, espacio
//!   público, subdivisión, huellas y masas) a partir del sitio, la red vial
//!   y el árbol de parámetros del proyecto.
//!
//! Nota: el core sólo conoce `EngineOutput { mesh, payload, summary }`. La
//! semántica urbana (clasificación vial, particiones, retiros, porcentajes
//! de edificación inicial) vive íntegramente aquí.

pub mod engine;
pub mod geometry_ops;
pub mod gltf;

pub use engine::DeterministicEngine;
