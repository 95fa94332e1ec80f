// Domain models shared by the repo, validator and routes

mod container;
mod port;
mod stack;
mod validation;

pub use container::{ContainerInfo, ContainerState, HealthStatus};
pub use port::{DEFAULT_PROTOCOL, PortConfig, PortConflict, PortSpec};
pub use stack::{HealthcheckSpec, Service, Stack, parse_env_list};
pub use validation::{
    ImpactLevel, IssueCategory, IssueType, StackReport, StackSnapshot, ValidationIssue,
    ValidationResult, ValidationSummary,
};
