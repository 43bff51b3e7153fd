//! Resumen numérico que acompaña a la masa edificable máxima.

use serde::{Deserialize, Serialize};

/// Indicadores agregados del proyecto calculados junto con `building_max`.
/// Viaja como payload estructurado en la respuesta, nunca como archivo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuckySheet {
    pub site_area_m2: f64,
    pub lots_total: u32,
    pub footprint_area_m2: f64,
    pub gross_floor_area_m2: f64,
    pub floor_area_ratio: f64,
    pub coverage_ratio: f64,
    pub floors_max: u32,
    pub estimated_dwellings: u32,
    pub schema_version: u32,
}
