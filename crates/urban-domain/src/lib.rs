// urban-domain library entry point
pub mod error;
pub mod geometry;
pub mod lucky_sheet;
pub mod parameters;
pub mod project;
pub use error::DomainError;
pub use geometry::{Point, RoadLine, RoadNetwork, SiteRing};
pub use lucky_sheet::LuckySheet;
pub use parameters::ProjectParameters;
pub use project::{LifecycleState, NewProject, Project, ProjectPatch};
