//! Parámetros de generación de un proyecto urbano.
//!
//! Árbol de configuración que gobierna la derivación de capas:
//! - `neighbourhood`: vialidad pública, particiones y espacio público.
//! - `tissue`: lotes en grilla, clusters fuera de grilla, bonos de esquina.
//! - `starter_buildings`: porcentajes de edificación inicial por tipo de lote.
//!
//! Los valores por defecto reproducen la configuración de referencia del
//! producto. Los parámetros entran al fingerprint base del proyecto: cambiar
//! cualquiera invalida las capas derivadas.

use serde::{Deserialize, Serialize};

use crate::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicRoads {
    pub width_of_arteries_m: f64,
    pub width_of_secondaries_m: f64,
    pub width_of_locals_m: f64,
}

impl Default for PublicRoads {
    fn default() -> Self {
        PublicRoads { width_of_arteries_m: 20.0,
                      width_of_secondaries_m: 15.0,
                      width_of_locals_m: 10.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnGridPartitions {
    pub depth_along_arteries_m: f64,
    pub depth_along_secondaries_m: f64,
    pub depth_along_locals_m: f64,
}

impl Default for OnGridPartitions {
    fn default() -> Self {
        OnGridPartitions { depth_along_arteries_m: 40.0,
                           depth_along_secondaries_m: 30.0,
                           depth_along_locals_m: 20.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffGridPartitions {
    pub cluster_depth_m: f64,
    pub cluster_size_lots: u32,
    pub cluster_width_m: f64,
    pub lot_depth_along_path_m: f64,
    pub lot_depth_around_yard_m: f64,
}

impl Default for OffGridPartitions {
    fn default() -> Self {
        OffGridPartitions { cluster_depth_m: 45.0,
                            cluster_size_lots: 15,
                            cluster_width_m: 30.0,
                            lot_depth_along_path_m: 12.5,
                            lot_depth_around_yard_m: 10.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockStructureConfig {
    pub off_grid_clusters_in_depth_m: f64,
    pub off_grid_clusters_in_width_m: f64,
}

impl Default for BlockStructureConfig {
    fn default() -> Self {
        BlockStructureConfig { off_grid_clusters_in_depth_m: 0.0,
                               off_grid_clusters_in_width_m: 3.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrbanBlockStructure {
    pub along_arteries: BlockStructureConfig,
    pub along_secondaries: BlockStructureConfig,
    pub along_locals: BlockStructureConfig,
}

impl Default for UrbanBlockStructure {
    fn default() -> Self {
        UrbanBlockStructure { along_arteries: BlockStructureConfig::default(),
                              along_secondaries: BlockStructureConfig::default(),
                              along_locals: BlockStructureConfig { off_grid_clusters_in_depth_m: 2.0,
                                                                   off_grid_clusters_in_width_m: 3.0 } }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenSpaces {
    pub open_space_percentage: f64,
}

impl Default for OpenSpaces {
    fn default() -> Self {
        OpenSpaces { open_space_percentage: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Amenities {
    pub amenities_percentage: f64,
}

impl Default for Amenities {
    fn default() -> Self {
        Amenities { amenities_percentage: 10.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreetSection {
    pub sidewalk_width_m: f64,
}

impl Default for StreetSection {
    fn default() -> Self {
        StreetSection { sidewalk_width_m: 3.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trees {
    pub show_trees_frontend: bool,
    pub tree_spacing_m: f64,
    pub initial_tree_height_m: f64,
    pub final_tree_height_m: f64,
}

impl Default for Trees {
    fn default() -> Self {
        Trees { show_trees_frontend: true,
                tree_spacing_m: 12.0,
                initial_tree_height_m: 8.0,
                final_tree_height_m: 20.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicSpaces {
    pub open_spaces: OpenSpaces,
    pub amenities: Amenities,
    pub street_section: StreetSection,
    pub trees: Trees,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Neighbourhood {
    pub public_roads: PublicRoads,
    pub on_grid_partitions: OnGridPartitions,
    pub off_grid_partitions: OffGridPartitions,
    pub urban_block_structure: UrbanBlockStructure,
    pub public_spaces: PublicSpaces,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotConfig {
    pub depth_m: f64,
    pub width_m: f64,
    pub front_setback_m: f64,
    pub side_margins_m: f64,
    pub rear_setback_m: f64,
    pub number_of_floors: u32,
}

impl Default for LotConfig {
    fn default() -> Self {
        LotConfig { depth_m: 40.0,
                    width_m: 40.0,
                    front_setback_m: 6.0,
                    side_margins_m: 6.0,
                    rear_setback_m: 6.0,
                    number_of_floors: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffGridClusterType1 {
    pub access_path_width_on_grid_m: f64,
    pub internal_path_width_m: f64,
    pub open_space_width_m: f64,
    pub open_space_length_m: f64,
    pub lot_width_m: f64,
    pub front_setback_m: f64,
    pub side_margins_m: f64,
    pub rear_setback_m: f64,
    pub number_of_floors: u32,
}

impl Default for OffGridClusterType1 {
    fn default() -> Self {
        OffGridClusterType1 { access_path_width_on_grid_m: 3.0,
                              internal_path_width_m: 5.0,
                              open_space_width_m: 10.0,
                              open_space_length_m: 15.0,
                              lot_width_m: 6.0,
                              front_setback_m: 0.0,
                              side_margins_m: 0.0,
                              rear_setback_m: 3.0,
                              number_of_floors: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffGridClusterType2 {
    pub internal_path_width_m: f64,
    pub cul_de_sac_width_m: f64,
    pub lot_width_m: f64,
    pub lot_depth_behind_cul_de_sac_m: f64,
}

impl Default for OffGridClusterType2 {
    fn default() -> Self {
        OffGridClusterType2 { internal_path_width_m: 3.0,
                              cul_de_sac_width_m: 5.0,
                              lot_width_m: 4.5,
                              lot_depth_behind_cul_de_sac_m: 15.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerBonus {
    pub description: String,
    pub with_artery_percent: f64,
    pub with_secondary_percent: f64,
    pub with_local_percent: f64,
}

impl Default for CornerBonus {
    fn default() -> Self {
        CornerBonus { description: "Density (floor) bonus at intersection".to_string(),
                      with_artery_percent: 40.0,
                      with_secondary_percent: 30.0,
                      with_local_percent: 20.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireProtection {
    pub fire_proof_partitions_with_6m_margins: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tissue {
    pub on_grid_lots_on_arteries: LotConfig,
    pub on_grid_lots_on_secondaries: LotConfig,
    pub on_grid_lots_on_locals: LotConfig,
    pub off_grid_cluster_type_1: OffGridClusterType1,
    pub off_grid_cluster_type_2: OffGridClusterType2,
    pub corner_bonus: CornerBonus,
    pub fire_protection: FireProtection,
}

impl Default for Tissue {
    fn default() -> Self {
        Tissue { on_grid_lots_on_arteries: LotConfig::default(),
                 on_grid_lots_on_secondaries: LotConfig { depth_m: 30.0,
                                                          width_m: 20.0,
                                                          front_setback_m: 3.0,
                                                          side_margins_m: 3.0,
                                                          rear_setback_m: 3.0,
                                                          number_of_floors: 4 },
                 on_grid_lots_on_locals: LotConfig { depth_m: 20.0,
                                                     width_m: 10.0,
                                                     front_setback_m: 0.0,
                                                     side_margins_m: 0.0,
                                                     rear_setback_m: 3.0,
                                                     number_of_floors: 3 },
                 off_grid_cluster_type_1: OffGridClusterType1::default(),
                 off_grid_cluster_type_2: OffGridClusterType2::default(),
                 corner_bonus: CornerBonus::default(),
                 fire_protection: FireProtection::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialBuildingPercent {
    pub initial_width_percent: f64,
    pub initial_depth_percent: f64,
    pub initial_floors_percent: f64,
}

impl InitialBuildingPercent {
    fn new(width: f64, depth: f64, floors: f64) -> Self {
        InitialBuildingPercent { initial_width_percent: width,
                                 initial_depth_percent: depth,
                                 initial_floors_percent: floors }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarterBuildingsOnArteries {
    pub corner_with_other_artery: InitialBuildingPercent,
    pub corner_with_secondary: InitialBuildingPercent,
    pub corner_with_tertiary: InitialBuildingPercent,
    pub regular_lot: InitialBuildingPercent,
}

impl Default for StarterBuildingsOnArteries {
    fn default() -> Self {
        StarterBuildingsOnArteries { corner_with_other_artery: InitialBuildingPercent::default(),
                                     corner_with_secondary: InitialBuildingPercent::default(),
                                     corner_with_tertiary: InitialBuildingPercent::default(),
                                     regular_lot: InitialBuildingPercent::new(100.0, 60.0, 80.0) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarterBuildingsOnSecondaries {
    pub corner_with_other_secondary: InitialBuildingPercent,
    pub corner_with_tertiary: InitialBuildingPercent,
    pub regular_lot: InitialBuildingPercent,
}

impl Default for StarterBuildingsOnSecondaries {
    fn default() -> Self {
        StarterBuildingsOnSecondaries { corner_with_other_secondary: InitialBuildingPercent::default(),
                                        corner_with_tertiary: InitialBuildingPercent::default(),
                                        regular_lot: InitialBuildingPercent::new(100.0, 60.0, 60.0) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarterBuildingsOnLocals {
    pub corner_with_other_local: InitialBuildingPercent,
    pub regular_lot: InitialBuildingPercent,
}

impl Default for StarterBuildingsOnLocals {
    fn default() -> Self {
        StarterBuildingsOnLocals { corner_with_other_local: InitialBuildingPercent::new(100.0, 100.0, 100.0),
                                   regular_lot: InitialBuildingPercent::new(100.0, 60.0, 60.0) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarterBuildings {
    pub on_grid_lots_on_arteries: StarterBuildingsOnArteries,
    pub on_grid_lots_on_secondaries: StarterBuildingsOnSecondaries,
    pub on_grid_lots_on_locals: StarterBuildingsOnLocals,
    pub off_grid_cluster_type_1: InitialBuildingPercent,
    pub off_grid_cluster_type_2: InitialBuildingPercent,
}

impl Default for StarterBuildings {
    fn default() -> Self {
        StarterBuildings { on_grid_lots_on_arteries: StarterBuildingsOnArteries::default(),
                           on_grid_lots_on_secondaries: StarterBuildingsOnSecondaries::default(),
                           on_grid_lots_on_locals: StarterBuildingsOnLocals::default(),
                           off_grid_cluster_type_1: InitialBuildingPercent::new(100.0, 50.0, 50.0),
                           off_grid_cluster_type_2: InitialBuildingPercent::new(50.0, 50.0, 50.0) }
    }
}

/// Raíz del árbol de parámetros de un proyecto.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectParameters {
    pub neighbourhood: Neighbourhood,
    pub tissue: Tissue,
    pub starter_buildings: StarterBuildings,
}

impl ProjectParameters {
    /// Valida rangos básicos del árbol.
    ///
    /// # Errores
    /// Retorna `DomainError::ValidationError` con la restricción violada.
    pub fn validate(&self) -> Result<(), DomainError> {
        let roads = &self.neighbourhood.public_roads;
        for (name, width) in [("width_of_arteries_m", roads.width_of_arteries_m),
                              ("width_of_secondaries_m", roads.width_of_secondaries_m),
                              ("width_of_locals_m", roads.width_of_locals_m)]
        {
            if !(width > 0.0) {
                return Err(DomainError::ValidationError(format!("{name} debe ser positivo, llegó {width}")));
            }
        }
        for (name, percent) in [("open_space_percentage",
                                 self.neighbourhood.public_spaces.open_spaces.open_space_percentage),
                                ("amenities_percentage", self.neighbourhood.public_spaces.amenities.amenities_percentage)]
        {
            if !(0.0..=100.0).contains(&percent) {
                return Err(DomainError::ValidationError(format!("{name} debe estar entre 0 y 100, llegó {percent}")));
            }
        }
        for (name, lot) in [("on_grid_lots_on_arteries", &self.tissue.on_grid_lots_on_arteries),
                            ("on_grid_lots_on_secondaries", &self.tissue.on_grid_lots_on_secondaries),
                            ("on_grid_lots_on_locals", &self.tissue.on_grid_lots_on_locals)]
        {
            if !(lot.depth_m > 0.0) || !(lot.width_m > 0.0) {
                return Err(DomainError::ValidationError(format!("{name}: depth_m y width_m deben ser positivos")));
            }
            if lot.number_of_floors == 0 {
                return Err(DomainError::ValidationError(format!("{name}: number_of_floors debe ser al menos 1")));
            }
        }
        Ok(())
    }
}
