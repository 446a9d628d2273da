//! Inbound request shapes for the budget orchestrator. Update requests use
//! `Option<T>` per field so that "field omitted" stays distinguishable from
//! "field set to an empty value".

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::reference::{CustomerId, MaterialId, PresetId};
use crate::workflow::Status;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialUsageRequest {
    pub material_id: MaterialId,
    /// Total grams consumed for the whole item batch.
    pub mass_grams: Decimal,
    /// Sequencing position, starting at 1.
    pub position: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetItemRequest {
    pub product_name: String,
    pub product_description: Option<String>,
    pub product_quantity: u32,
    pub product_dimensions: Option<String>,
    pub print_time_hours: u32,
    pub print_time_minutes: u32,
    pub cost_preset_id: Option<PresetId>,
    pub additional_labor_cost: Option<i64>,
    pub notes: Option<String>,
    pub position: u32,
    pub usages: Vec<MaterialUsageRequest>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBudgetRequest {
    pub name: String,
    pub description: String,
    pub customer_id: CustomerId,
    pub machine_preset_id: Option<PresetId>,
    pub energy_preset_id: Option<PresetId>,
    pub include_energy_cost: bool,
    pub include_waste_cost: bool,
    pub delivery_days: Option<i32>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<BudgetItemRequest>,
}

/// Partial update: absent fields leave the stored value untouched. A
/// supplied item list replaces all existing items and usages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBudgetRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub machine_preset_id: Option<PresetId>,
    pub energy_preset_id: Option<PresetId>,
    pub include_energy_cost: Option<bool>,
    pub include_waste_cost: Option<bool>,
    pub delivery_days: Option<i32>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
    pub items: Option<Vec<BudgetItemRequest>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Status,
    pub notes: Option<String>,
}

fn item_issues(index: usize, item: &BudgetItemRequest, issues: &mut Vec<String>) {
    if item.product_name.trim().is_empty() {
        issues.push(format!("item {index}: product name is required"));
    }
    if item.product_quantity == 0 {
        issues.push(format!("item {index}: product quantity must be greater than zero"));
    }
    if item.print_time_minutes >= 60 {
        issues.push(format!("item {index}: print minutes must be below 60"));
    }
    if let Some(cost) = item.additional_labor_cost {
        if cost < 0 {
            issues.push(format!("item {index}: additional labor cost must not be negative"));
        }
    }
    if item.usages.is_empty() {
        issues.push(format!("item {index}: at least one material usage is required"));
    }
    for (usage_index, usage) in item.usages.iter().enumerate() {
        if usage.mass_grams <= Decimal::ZERO {
            issues.push(format!(
                "item {index}, usage {usage_index}: mass must be greater than zero"
            ));
        }
        if usage.position == 0 {
            issues.push(format!("item {index}, usage {usage_index}: position must start at 1"));
        }
    }
}

impl CreateBudgetRequest {
    /// Collects every problem at once so the caller can fix the request in
    /// a single round trip. Empty result means the request is acceptable.
    pub fn validation_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push("budget name is required".to_string());
        }
        if self.items.is_empty() {
            issues.push("at least one item is required".to_string());
        }
        for (index, item) in self.items.iter().enumerate() {
            item_issues(index, item, &mut issues);
        }
        issues
    }
}

impl UpdateBudgetRequest {
    pub fn validation_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                issues.push("budget name must not be blank".to_string());
            }
        }
        if let Some(items) = &self.items {
            if items.is_empty() {
                issues.push("item list replacement requires at least one item".to_string());
            }
            for (index, item) in items.iter().enumerate() {
                item_issues(index, item, &mut issues);
            }
        }
        issues
    }
}
