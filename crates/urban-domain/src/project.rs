//! Entidad Project del pipeline urbano.
//!
//! Un proyecto agrupa la geometría base (sitio + red vial), los parámetros de
//! generación y su estado de ciclo de vida. El *fingerprint base* se deriva
//! de sitio, vías y parámetros; nombre, descripción y metadata quedan fuera
//! del hash. Toda mutación produce una nueva instancia con `updated_at`
//! actualizado (estilo funcional, sin estado compartido).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use crate::{DomainError, ProjectParameters, RoadNetwork, SiteRing};

/// Estado de ciclo de vida de un proyecto.
///
/// `Draft`: registrado sin geometría base utilizable. `Ready`: geometría
/// validada y sitio renderizado, apto para generación. `Archived`: terminal,
/// rechaza generación y mutaciones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Draft,
    Ready,
    Archived,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LifecycleState::Draft => "draft",
            LifecycleState::Ready => "ready",
            LifecycleState::Archived => "archived",
        };
        write!(f, "{label}")
    }
}

/// Datos de alta de un proyecto.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub site: Option<SiteRing>,
    pub roads: Option<RoadNetwork>,
    pub parameters: Option<ProjectParameters>,
    pub metadata: Option<Value>,
}

/// Mutación parcial de un proyecto; `None` deja el campo como está.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub site: Option<SiteRing>,
    pub roads: Option<RoadNetwork>,
    pub parameters: Option<ProjectParameters>,
    pub metadata: Option<Value>,
}

impl ProjectPatch {
    /// Indica si el patch toca entradas que participan del fingerprint base.
    pub fn touches_base_inputs(&self) -> bool {
        self.site.is_some() || self.roads.is_some() || self.parameters.is_some()
    }
}

/// Proyecto urbano con geometría base y parámetros de generación.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    id: Uuid,
    name: String,
    description: Option<String>,
    site: Option<SiteRing>,
    roads: Option<RoadNetwork>,
    parameters: ProjectParameters,
    metadata: Value,
    lifecycle: LifecycleState,
    base_fingerprint: Option<String>,
    site_file: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Project {
    /// Crea un proyecto validado.
    ///
    /// # Argumentos
    /// * `spec` - Datos de alta; la geometría es opcional (un proyecto sin
    ///   sitio queda en `Draft` hasta que se la aporte)
    ///
    /// # Errores
    /// Retorna `DomainError::ValidationError` si el nombre está vacío o los
    /// parámetros violan sus rangos.
    pub fn new(spec: NewProject) -> Result<Self, DomainError> {
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::ValidationError("el nombre del proyecto no puede estar vacío".to_string()));
        }
        let parameters = spec.parameters.unwrap_or_default();
        parameters.validate()?;
        let base_fingerprint = spec.site
                                   .as_ref()
                                   .map(|site| Self::calculate_base_fingerprint(site, spec.roads.as_ref(), &parameters));
        let now = Utc::now();
        Ok(Project { id: Uuid::new_v4(),
                     name,
                     description: spec.description,
                     site: spec.site,
                     roads: spec.roads,
                     parameters,
                     metadata: spec.metadata.unwrap_or_else(|| json!({})),
                     lifecycle: LifecycleState::Draft,
                     base_fingerprint,
                     site_file: None,
                     created_at: now,
                     updated_at: now })
    }

    /// Hash determinista sobre sitio, vías y parámetros. Dos proyectos con
    /// geometría y parámetros idénticos comparten fingerprint base aunque sus
    /// identidades difieran.
    fn calculate_base_fingerprint(site: &SiteRing, roads: Option<&RoadNetwork>, parameters: &ProjectParameters) -> String {
        let document = json!({ "site": site, "roads": roads, "parameters": parameters });
        let mut hasher = Sha256::new();
        hasher.update(document.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Aplica un patch, recalculando el fingerprint base cuando cambian
    /// sitio, vías o parámetros. El llamador verifica antes que el proyecto
    /// no esté archivado.
    pub fn apply(&self, patch: ProjectPatch) -> Result<Self, DomainError> {
        let mut next = self.clone();
        let recompute = patch.touches_base_inputs();
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::ValidationError("el nombre del proyecto no puede estar vacío".to_string()));
            }
            next.name = name;
        }
        if let Some(description) = patch.description {
            next.description = Some(description);
        }
        if let Some(metadata) = patch.metadata {
            next.metadata = metadata;
        }
        if let Some(site) = patch.site {
            next.site = Some(site);
        }
        if let Some(roads) = patch.roads {
            next.roads = Some(roads);
        }
        if let Some(parameters) = patch.parameters {
            parameters.validate()?;
            next.parameters = parameters;
        }
        if recompute {
            next.base_fingerprint = next.site
                                        .as_ref()
                                        .map(|site| {
                                            Self::calculate_base_fingerprint(site, next.roads.as_ref(), &next.parameters)
                                        });
            // Una nueva geometría deja obsoleto el render previo del sitio
            next.site_file = None;
        }
        next.updated_at = Utc::now();
        Ok(next)
    }

    /// Promueve el proyecto a `Ready` una vez renderizado el sitio.
    ///
    /// # Errores
    /// Retorna `DomainError::ValidationError` si el proyecto no tiene
    /// geometría base.
    pub fn promoted_ready(&self, site_file: impl Into<String>) -> Result<Self, DomainError> {
        if self.site.is_none() {
            return Err(DomainError::ValidationError("no se puede promover un proyecto sin sitio".to_string()));
        }
        let mut next = self.clone();
        next.site_file = Some(site_file.into());
        if next.lifecycle == LifecycleState::Draft {
            next.lifecycle = LifecycleState::Ready;
        }
        next.updated_at = Utc::now();
        Ok(next)
    }

    /// Archiva el proyecto. Idempotente.
    pub fn archived(&self) -> Self {
        let mut next = self.clone();
        if next.lifecycle != LifecycleState::Archived {
            next.lifecycle = LifecycleState::Archived;
            next.updated_at = Utc::now();
        }
        next
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn site(&self) -> Option<&SiteRing> {
        self.site.as_ref()
    }

    pub fn roads(&self) -> Option<&RoadNetwork> {
        self.roads.as_ref()
    }

    pub fn parameters(&self) -> &ProjectParameters {
        &self.parameters
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn base_fingerprint(&self) -> Option<&str> {
        self.base_fingerprint.as_deref()
    }

    pub fn site_file(&self) -> Option<&str> {
        self.site_file.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_archived(&self) -> bool {
        self.lifecycle == LifecycleState::Archived
    }

    pub fn has_base_geometry(&self) -> bool {
        self.site.is_some()
    }
}

impl PartialEq for Project {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<project {} \"{}\" {}>", self.id, self.name, self.lifecycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn site() -> SiteRing {
        SiteRing::new(vec![Point::new(0.0, 0.0),
                           Point::new(0.002, 0.0),
                           Point::new(0.002, 0.001),
                           Point::new(0.001, 0.0015),
                           Point::new(0.0, 0.001)]).unwrap()
    }

    fn roads() -> RoadNetwork {
        RoadNetwork::new(vec![crate::geometry::RoadLine::new(vec![Point::new(0.0, 0.0005),
                                                                  Point::new(0.002, 0.0005)]).unwrap()]).unwrap()
    }

    fn new_project() -> NewProject {
        NewProject { name: "Test Project".to_string(),
                     site: Some(site()),
                     roads: Some(roads()),
                     ..NewProject::default() }
    }

    #[test]
    fn test_identical_geometry_shares_base_fingerprint_across_identities() {
        let a = Project::new(new_project()).unwrap();
        let b = Project::new(new_project()).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.base_fingerprint(), b.base_fingerprint());
        assert!(a.base_fingerprint().is_some());
    }

    #[test]
    fn test_project_without_site_has_no_fingerprint() {
        let project = Project::new(NewProject { name: "Empty".to_string(),
                                                ..NewProject::default() }).unwrap();
        assert!(project.base_fingerprint().is_none());
        assert!(!project.has_base_geometry());
        assert_eq!(project.lifecycle(), LifecycleState::Draft);
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let err = Project::new(NewProject { name: "   ".to_string(),
                                            ..NewProject::default() }).unwrap_err();
        assert!(err.to_string().contains("nombre"));
    }

    #[test]
    fn test_geometry_change_rotates_fingerprint_and_drops_site_render() {
        let project = Project::new(new_project()).unwrap();
        let project = project.promoted_ready("memory://p/site.gltf").unwrap();
        let before = project.base_fingerprint().unwrap().to_string();

        let moved = SiteRing::new(vec![Point::new(0.0, 0.0),
                                       Point::new(0.003, 0.0),
                                       Point::new(0.003, 0.002),
                                       Point::new(0.0, 0.002)]).unwrap();
        let updated = project.apply(ProjectPatch { site: Some(moved),
                                                   ..ProjectPatch::default() })
                             .unwrap();
        assert_ne!(updated.base_fingerprint().unwrap(), before);
        assert!(updated.site_file().is_none());
        assert_eq!(updated.id(), project.id());
    }

    #[test]
    fn test_parameter_change_rotates_fingerprint() {
        let project = Project::new(new_project()).unwrap();
        let before = project.base_fingerprint().unwrap().to_string();
        let mut parameters = project.parameters().clone();
        parameters.neighbourhood.public_roads.width_of_arteries_m = 24.0;
        let updated = project.apply(ProjectPatch { parameters: Some(parameters),
                                                   ..ProjectPatch::default() })
                             .unwrap();
        assert_ne!(updated.base_fingerprint().unwrap(), before);
    }

    #[test]
    fn test_metadata_change_keeps_fingerprint() {
        let project = Project::new(new_project()).unwrap();
        let before = project.base_fingerprint().unwrap().to_string();
        let updated = project.apply(ProjectPatch { metadata: Some(json!({"note": "does not hash"})),
                                                   ..ProjectPatch::default() })
                             .unwrap();
        assert_eq!(updated.base_fingerprint().unwrap(), before);
    }

    #[test]
    fn test_promotion_requires_site_and_archive_is_terminal() {
        let empty = Project::new(NewProject { name: "Empty".to_string(),
                                              ..NewProject::default() }).unwrap();
        assert!(empty.promoted_ready("memory://x").is_err());

        let project = Project::new(new_project()).unwrap();
        let ready = project.promoted_ready("memory://p/site.gltf").unwrap();
        assert_eq!(ready.lifecycle(), LifecycleState::Ready);
        assert_eq!(ready.site_file(), Some("memory://p/site.gltf"));

        let archived = ready.archived();
        assert!(archived.is_archived());
        assert!(archived.archived().is_archived());
    }
}
