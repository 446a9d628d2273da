use thiserror::Error;

use printquote_core::costing::CostingError;
use printquote_core::errors::DomainError;
use printquote_db::repositories::RepositoryError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Budget,
    Customer,
    Material,
    Preset,
    Company,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Budget => "budget",
            Self::Customer => "customer",
            Self::Material => "material",
            Self::Preset => "preset",
            Self::Company => "company",
        };
        f.write_str(name)
    }
}

/// Error taxonomy of the orchestrator boundary. Validation and policy
/// failures are raised before any write; persistence failures are wrapped
/// verbatim and never retried here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{resource} {id} not found")]
    NotFound { resource: ResourceKind, id: String },
    #[error(transparent)]
    Policy(#[from] DomainError),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Dependency(#[from] CostingError),
    #[error(transparent)]
    Persistence(#[from] RepositoryError),
}

impl EngineError {
    pub fn not_found(resource: ResourceKind, id: impl ToString) -> Self {
        Self::NotFound { resource, id: id.to_string() }
    }
}
