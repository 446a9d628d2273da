use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::budget::BudgetId;
use crate::domain::reference::PresetId;
use crate::domain::TenantId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BudgetItemId(pub Uuid);

/// Print duration as entered by the operator. Minutes stay below 60.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintTime {
    pub hours: u32,
    pub minutes: u32,
}

impl PrintTime {
    pub fn new(hours: u32, minutes: u32) -> Self {
        Self { hours, minutes }
    }

    pub fn from_total_minutes(total: u32) -> Self {
        Self { hours: total / 60, minutes: total % 60 }
    }

    pub fn total_minutes(&self) -> u32 {
        self.hours * 60 + self.minutes
    }

    /// Duration in decimal hours, the unit the energy and labor formulas use.
    pub fn hours_decimal(&self) -> Decimal {
        Decimal::from(self.hours) + Decimal::from(self.minutes) / Decimal::from(60)
    }

    /// Operator-facing rendering: "3h05m", or "45m" below one hour.
    pub fn display(&self) -> String {
        if self.hours > 0 {
            format!("{}h{:02}m", self.hours, self.minutes)
        } else {
            format!("{}m", self.minutes)
        }
    }
}

/// Per-item cost figures in integer cents. `unit_price` is the item total
/// divided by the product quantity, truncated toward zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCostBreakdown {
    pub material_cost: i64,
    pub waste_cost: i64,
    pub energy_cost: i64,
    pub labor_cost: i64,
    pub total_cost: i64,
    pub unit_price: i64,
}

/// One quoted product inside a budget. Must own at least one material usage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetItem {
    pub id: BudgetItemId,
    pub budget_id: BudgetId,
    pub tenant_id: TenantId,
    pub product_name: String,
    pub product_description: Option<String>,
    pub product_quantity: u32,
    pub product_dimensions: Option<String>,
    pub print_time: PrintTime,
    pub cost_preset_id: Option<PresetId>,
    /// Flat post-processing labor (painting, finishing) in cents, added on
    /// top of the rate-based labor cost.
    pub additional_labor_cost: i64,
    pub notes: Option<String>,
    pub position: u32,
    pub costs: ItemCostBreakdown,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
