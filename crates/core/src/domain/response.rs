use serde::{Deserialize, Serialize};

use crate::domain::budget::Budget;
use crate::domain::item::{BudgetItem, PrintTime};
use crate::domain::reference::{Customer, Material, Preset, PresetId, PresetKind};
use crate::domain::usage::MaterialUsage;
use crate::workflow::StatusLog;

/// One material usage joined with its material's reference data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageView {
    pub usage: MaterialUsage,
    pub material: Material,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemView {
    pub item: BudgetItem,
    pub print_time_display: String,
    pub usages: Vec<UsageView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetSummary {
    pub id: PresetId,
    pub name: String,
    pub kind: PresetKind,
}

impl From<&Preset> for PresetSummary {
    fn from(preset: &Preset) -> Self {
        Self { id: preset.id, name: preset.name.clone(), kind: preset.kind }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintTimeTotal {
    pub hours: u32,
    pub minutes: u32,
    pub display: String,
}

impl PrintTimeTotal {
    /// Sums the print time across all items of the budget.
    pub fn from_items(items: &[ItemView]) -> Self {
        let total: u32 = items.iter().map(|view| view.item.print_time.total_minutes()).sum();
        let time = PrintTime::from_total_minutes(total);
        Self { hours: time.hours, minutes: time.minutes, display: time.display() }
    }
}

/// The complete object graph returned by every orchestrator operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetResponse {
    pub budget: Budget,
    pub customer: Customer,
    pub items: Vec<ItemView>,
    pub machine_preset: Option<PresetSummary>,
    pub energy_preset: Option<PresetSummary>,
    pub history: StatusLog,
    pub total_print_time: PrintTimeTotal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetPage {
    pub budgets: Vec<BudgetResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{ItemView, PrintTimeTotal};
    use crate::domain::budget::BudgetId;
    use crate::domain::item::{BudgetItem, BudgetItemId, ItemCostBreakdown, PrintTime};
    use crate::domain::TenantId;

    fn item_view(hours: u32, minutes: u32) -> ItemView {
        let now = Utc::now();
        let print_time = PrintTime::new(hours, minutes);
        ItemView {
            item: BudgetItem {
                id: BudgetItemId(Uuid::new_v4()),
                budget_id: BudgetId(Uuid::new_v4()),
                tenant_id: TenantId("org-1".to_string()),
                product_name: "Bracket".to_string(),
                product_description: None,
                product_quantity: 1,
                product_dimensions: None,
                print_time,
                cost_preset_id: None,
                additional_labor_cost: 0,
                notes: None,
                position: 0,
                costs: ItemCostBreakdown::default(),
                created_at: now,
                updated_at: now,
            },
            print_time_display: print_time.display(),
            usages: Vec::new(),
        }
    }

    #[test]
    fn total_print_time_carries_minutes_over_the_hour() {
        let total = PrintTimeTotal::from_items(&[item_view(1, 40), item_view(2, 35)]);
        assert_eq!(total.hours, 4);
        assert_eq!(total.minutes, 15);
        assert_eq!(total.display, "4h15m");
    }

    #[test]
    fn total_print_time_of_no_items_is_zero() {
        let total = PrintTimeTotal::from_items(&[]);
        assert_eq!(total.hours, 0);
        assert_eq!(total.minutes, 0);
        assert_eq!(total.display, "0m");
    }
}
