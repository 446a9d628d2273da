use serde::{Deserialize, Serialize};

pub mod budget;
pub mod item;
pub mod reference;
pub mod request;
pub mod response;
pub mod usage;

/// Owning organization. Every record and every query is scoped to exactly
/// one tenant; the repository contract enforces the boundary, not the
/// orchestrator.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

/// The user performing a mutating operation, recorded in status history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorId(pub String);
