use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::reference::{CustomerId, PresetId};
use crate::domain::TenantId;
use crate::workflow::Status;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BudgetId(pub Uuid);

/// Soft deletion as a tagged state rather than a bare nullable timestamp.
/// A deleted budget keeps its rows but is invisible to every read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum Lifecycle {
    Active,
    Deleted { at: DateTime<Utc> },
}

impl Lifecycle {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted { .. })
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Active => None,
            Self::Deleted { at } => Some(*at),
        }
    }
}

/// Aggregate cost figures in integer minor currency units (cents).
/// Invariant after every recalculation: `total_cost` equals both the sum of
/// the components and the sum of all item totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub material_cost: i64,
    pub waste_cost: i64,
    pub energy_cost: i64,
    pub labor_cost: i64,
    pub total_cost: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: String,
    pub customer_id: CustomerId,
    pub status: Status,
    pub machine_preset_id: Option<PresetId>,
    pub energy_preset_id: Option<PresetId>,
    pub include_energy_cost: bool,
    pub include_waste_cost: bool,
    pub delivery_days: Option<i32>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
    pub costs: CostBreakdown,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    /// Name, items, usages, presets and flags may only change while the
    /// budget is still a draft.
    pub fn is_editable(&self) -> bool {
        self.status == Status::Draft
    }

    /// An in-progress or finished job must never disappear from the record.
    pub fn is_deletable(&self) -> bool {
        !matches!(self.status, Status::Printing | Status::Completed)
    }
}
