pub mod config;
pub mod costing;
pub mod domain;
pub mod errors;
pub mod workflow;

pub use config::{ConfigError, ConfigOverrides, EngineConfig, LoadOptions};
pub use costing::{
    cost_budget, BudgetCosting, CostedItem, CostingConfig, CostingError, ReferenceValues,
    RoundingMode,
};
pub use domain::budget::{Budget, BudgetId, CostBreakdown, Lifecycle};
pub use domain::item::{BudgetItem, BudgetItemId, ItemCostBreakdown, PrintTime};
pub use domain::reference::{
    CompanyProfile, Customer, CustomerId, Material, MaterialId, Preset, PresetId, PresetKind,
};
pub use domain::request::{
    BudgetItemRequest, CreateBudgetRequest, MaterialUsageRequest, UpdateBudgetRequest,
    UpdateStatusRequest,
};
pub use domain::response::{
    BudgetPage, BudgetResponse, ItemView, PresetSummary, PrintTimeTotal, UsageView,
};
pub use domain::usage::{MaterialUsage, MaterialUsageId};
pub use domain::{ActorId, TenantId};
pub use errors::DomainError;
pub use workflow::{is_valid_transition, HistoryId, Status, StatusHistoryEntry, StatusLog};
