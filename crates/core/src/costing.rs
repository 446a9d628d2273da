//! Deterministic cost computation for a budget.
//!
//! The calculator is pure: reference data (material prices, preset values)
//! is resolved by the caller and handed in as [`ReferenceValues`]. Running
//! it twice over unchanged inputs produces identical cents values.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::budget::{Budget, CostBreakdown};
use crate::domain::item::{BudgetItem, BudgetItemId, ItemCostBreakdown};
use crate::domain::reference::{MaterialId, PresetId};
use crate::domain::usage::MaterialUsage;

/// How a fractional cents amount lands on an integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Truncate toward zero at the cents boundary.
    #[default]
    Floor,
    /// Round half away from zero.
    HalfUp,
}

/// Tunable constants of the calculation. Passed in explicitly, never read
/// from global state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostingConfig {
    /// Grams lost to purging every time a multi-material machine swaps
    /// materials mid-print.
    pub waste_per_change_grams: Decimal,
    pub rounding: RoundingMode,
}

impl Default for CostingConfig {
    fn default() -> Self {
        Self { waste_per_change_grams: Decimal::from(15), rounding: RoundingMode::Floor }
    }
}

/// Reference data resolved ahead of the calculation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceValues {
    /// Price per kilogram by material.
    pub material_prices: HashMap<MaterialId, Decimal>,
    /// Labor rate per hour by cost preset.
    pub labor_rates: HashMap<PresetId, Decimal>,
    /// Power draw in watts from the budget's machine preset, when resolved.
    pub machine_power_watts: Option<Decimal>,
    /// Tariff per kWh from the budget's energy preset, when resolved.
    pub energy_price_per_kwh: Option<Decimal>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CostingError {
    #[error("no price on record for material {0:?}")]
    MissingMaterialPrice(MaterialId),
    #[error("machine preset {0:?} could not be resolved while energy cost is enabled")]
    MissingMachinePower(PresetId),
    #[error("energy preset {0:?} could not be resolved while energy cost is enabled")]
    MissingEnergyTariff(PresetId),
    #[error("cost preset {0:?} could not be resolved for labor rate")]
    MissingLaborRate(PresetId),
    #[error("item {0:?} has no material usages")]
    EmptyItem(BudgetItemId),
    #[error("item {0:?} has zero product quantity")]
    ZeroQuantity(BudgetItemId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostedItem {
    pub item_id: BudgetItemId,
    pub costs: ItemCostBreakdown,
}

/// The full outcome of one calculation run: per-item breakdowns plus the
/// budget aggregate, produced together so they can never disagree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCosting {
    pub totals: CostBreakdown,
    pub items: Vec<CostedItem>,
}

/// Cost every item of the budget and aggregate the component sums.
pub fn cost_budget(
    budget: &Budget,
    items: &[(BudgetItem, Vec<MaterialUsage>)],
    refs: &ReferenceValues,
    config: &CostingConfig,
) -> Result<BudgetCosting, CostingError> {
    let mut totals = CostBreakdown::default();
    let mut costed = Vec::with_capacity(items.len());

    for (item, usages) in items {
        let costs = cost_item(budget, item, usages, refs, config)?;
        totals.material_cost += costs.material_cost;
        totals.waste_cost += costs.waste_cost;
        totals.energy_cost += costs.energy_cost;
        totals.labor_cost += costs.labor_cost;
        totals.total_cost += costs.total_cost;
        costed.push(CostedItem { item_id: item.id, costs });
    }

    Ok(BudgetCosting { totals, items: costed })
}

fn cost_item(
    budget: &Budget,
    item: &BudgetItem,
    usages: &[MaterialUsage],
    refs: &ReferenceValues,
    config: &CostingConfig,
) -> Result<ItemCostBreakdown, CostingError> {
    if usages.is_empty() {
        return Err(CostingError::EmptyItem(item.id));
    }
    if item.product_quantity == 0 {
        return Err(CostingError::ZeroQuantity(item.id));
    }

    let kilo = Decimal::from(1000);

    // Material: each usage contribution is rounded to cents individually,
    // then summed.
    let mut material_cost = 0i64;
    let mut price_sum = Decimal::ZERO;
    for usage in usages {
        let price = refs
            .material_prices
            .get(&usage.material_id)
            .copied()
            .ok_or(CostingError::MissingMaterialPrice(usage.material_id))?;
        material_cost += to_cents(usage.mass_grams / kilo * price, config.rounding);
        price_sum += price;
    }

    // Waste: one purge per material swap, priced at the mean of the item's
    // material prices.
    let mut waste_cost = 0i64;
    if budget.include_waste_cost && usages.len() > 1 {
        let changes = Decimal::from(usages.len() - 1);
        let waste_grams = config.waste_per_change_grams * changes;
        let avg_price = price_sum / Decimal::from(usages.len());
        waste_cost = to_cents(waste_grams / kilo * avg_price, config.rounding);
    }

    // Energy: requires the flag plus both presets attached to the budget.
    // An attached preset that did not resolve is a data-integrity error.
    let mut energy_cost = 0i64;
    if budget.include_energy_cost {
        if let (Some(machine_id), Some(energy_id)) =
            (budget.machine_preset_id, budget.energy_preset_id)
        {
            let watts = refs
                .machine_power_watts
                .ok_or(CostingError::MissingMachinePower(machine_id))?;
            let tariff = refs
                .energy_price_per_kwh
                .ok_or(CostingError::MissingEnergyTariff(energy_id))?;
            let kwh = watts * item.print_time.hours_decimal() / kilo;
            energy_cost = to_cents(kwh * tariff, config.rounding);
        }
    }

    // Labor: rate-based portion only when the item references a cost
    // preset; the flat additional amount always applies.
    let mut labor_cost = item.additional_labor_cost;
    if let Some(preset_id) = item.cost_preset_id {
        let rate = refs
            .labor_rates
            .get(&preset_id)
            .copied()
            .ok_or(CostingError::MissingLaborRate(preset_id))?;
        labor_cost += to_cents(item.print_time.hours_decimal() * rate, config.rounding);
    }

    let total_cost = material_cost + waste_cost + energy_cost + labor_cost;
    let unit_price = total_cost / i64::from(item.product_quantity);

    Ok(ItemCostBreakdown {
        material_cost,
        waste_cost,
        energy_cost,
        labor_cost,
        total_cost,
        unit_price,
    })
}

fn to_cents(amount: Decimal, rounding: RoundingMode) -> i64 {
    let cents = amount * Decimal::ONE_HUNDRED;
    let rounded = match rounding {
        RoundingMode::Floor => cents.floor(),
        RoundingMode::HalfUp => {
            cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        }
    };
    rounded.to_i64().unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::{cost_budget, CostingConfig, CostingError, ReferenceValues, RoundingMode};
    use crate::domain::budget::{Budget, BudgetId, CostBreakdown, Lifecycle};
    use crate::domain::item::{BudgetItem, BudgetItemId, ItemCostBreakdown, PrintTime};
    use crate::domain::reference::{CustomerId, MaterialId, PresetId};
    use crate::domain::usage::{MaterialUsage, MaterialUsageId};
    use crate::domain::TenantId;
    use crate::workflow::Status;

    fn tenant() -> TenantId {
        TenantId("org-1".to_string())
    }

    fn budget(include_energy: bool, include_waste: bool) -> Budget {
        let now = Utc::now();
        Budget {
            id: BudgetId(Uuid::new_v4()),
            tenant_id: tenant(),
            name: "Test budget".to_string(),
            description: String::new(),
            customer_id: CustomerId(Uuid::new_v4()),
            status: Status::Draft,
            machine_preset_id: None,
            energy_preset_id: None,
            include_energy_cost: include_energy,
            include_waste_cost: include_waste,
            delivery_days: None,
            payment_terms: None,
            notes: None,
            costs: CostBreakdown::default(),
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn item(budget_id: BudgetId, quantity: u32, print_time: PrintTime) -> BudgetItem {
        let now = Utc::now();
        BudgetItem {
            id: BudgetItemId(Uuid::new_v4()),
            budget_id,
            tenant_id: tenant(),
            product_name: "Figurine".to_string(),
            product_description: None,
            product_quantity: quantity,
            product_dimensions: None,
            print_time,
            cost_preset_id: None,
            additional_labor_cost: 0,
            notes: None,
            position: 0,
            costs: ItemCostBreakdown::default(),
            created_at: now,
            updated_at: now,
        }
    }

    fn usage(item_id: BudgetItemId, material_id: MaterialId, grams: i64, position: u32) -> MaterialUsage {
        MaterialUsage {
            id: MaterialUsageId(Uuid::new_v4()),
            item_id,
            tenant_id: tenant(),
            material_id,
            mass_grams: Decimal::from(grams),
            position,
        }
    }

    #[test]
    fn material_cost_follows_mass_times_price() {
        // 300 g at 20.00/kg => 6.00 => 600 cents.
        let budget = budget(false, false);
        let item = item(budget.id, 1, PrintTime::new(0, 0));
        let material = MaterialId(Uuid::new_v4());
        let mut refs = ReferenceValues::default();
        refs.material_prices.insert(material, Decimal::from(20));

        let result = cost_budget(
            &budget,
            &[(item.clone(), vec![usage(item.id, material, 300, 1)])],
            &refs,
            &CostingConfig::default(),
        )
        .expect("costing succeeds");

        assert_eq!(result.items[0].costs.material_cost, 600);
        assert_eq!(result.items[0].costs.total_cost, 600);
        assert_eq!(result.totals.total_cost, 600);
    }

    #[test]
    fn waste_appears_once_a_second_material_joins() {
        let budget = budget(false, true);
        let item = item(budget.id, 1, PrintTime::new(0, 0));
        let first = MaterialId(Uuid::new_v4());
        let second = MaterialId(Uuid::new_v4());
        let mut refs = ReferenceValues::default();
        refs.material_prices.insert(first, Decimal::from(20));
        refs.material_prices.insert(second, Decimal::from(30));

        let single = cost_budget(
            &budget,
            &[(item.clone(), vec![usage(item.id, first, 300, 1)])],
            &refs,
            &CostingConfig::default(),
        )
        .expect("single usage");
        assert_eq!(single.items[0].costs.waste_cost, 0);

        let double = cost_budget(
            &budget,
            &[(
                item.clone(),
                vec![usage(item.id, first, 300, 1), usage(item.id, second, 100, 2)],
            )],
            &refs,
            &CostingConfig::default(),
        )
        .expect("two usages");

        // 15 g * 1 change at mean(20, 30) = 25/kg => 0.375 => 37 cents floored.
        assert_eq!(double.items[0].costs.waste_cost, 37);
        assert!(double.items[0].costs.waste_cost > single.items[0].costs.waste_cost);
    }

    #[test]
    fn waste_needs_the_flag_even_with_many_materials() {
        let budget = budget(false, false);
        let item = item(budget.id, 1, PrintTime::new(0, 0));
        let first = MaterialId(Uuid::new_v4());
        let second = MaterialId(Uuid::new_v4());
        let mut refs = ReferenceValues::default();
        refs.material_prices.insert(first, Decimal::from(20));
        refs.material_prices.insert(second, Decimal::from(30));

        let result = cost_budget(
            &budget,
            &[(
                item.clone(),
                vec![usage(item.id, first, 300, 1), usage(item.id, second, 100, 2)],
            )],
            &refs,
            &CostingConfig::default(),
        )
        .expect("costing succeeds");

        assert_eq!(result.items[0].costs.waste_cost, 0);
    }

    #[test]
    fn energy_cost_uses_power_draw_tariff_and_print_time() {
        let mut budget = budget(true, false);
        budget.machine_preset_id = Some(PresetId(Uuid::new_v4()));
        budget.energy_preset_id = Some(PresetId(Uuid::new_v4()));
        let item = item(budget.id, 1, PrintTime::new(2, 30));
        let material = MaterialId(Uuid::new_v4());
        let mut refs = ReferenceValues::default();
        refs.material_prices.insert(material, Decimal::from(20));
        refs.machine_power_watts = Some(Decimal::from(100));
        refs.energy_price_per_kwh = Some(Decimal::new(80, 2)); // 0.80

        let result = cost_budget(
            &budget,
            &[(item.clone(), vec![usage(item.id, material, 100, 1)])],
            &refs,
            &CostingConfig::default(),
        )
        .expect("costing succeeds");

        // 100 W * 2.5 h / 1000 = 0.25 kWh at 0.80 => 0.20 => 20 cents.
        assert_eq!(result.items[0].costs.energy_cost, 20);
    }

    #[test]
    fn energy_flag_without_presets_contributes_nothing() {
        let budget = budget(true, false);
        let item = item(budget.id, 1, PrintTime::new(4, 0));
        let material = MaterialId(Uuid::new_v4());
        let mut refs = ReferenceValues::default();
        refs.material_prices.insert(material, Decimal::from(20));

        let result = cost_budget(
            &budget,
            &[(item.clone(), vec![usage(item.id, material, 100, 1)])],
            &refs,
            &CostingConfig::default(),
        )
        .expect("costing succeeds");

        assert_eq!(result.items[0].costs.energy_cost, 0);
    }

    #[test]
    fn attached_but_unresolved_energy_preset_is_an_error() {
        let mut budget = budget(true, false);
        let machine_id = PresetId(Uuid::new_v4());
        budget.machine_preset_id = Some(machine_id);
        budget.energy_preset_id = Some(PresetId(Uuid::new_v4()));
        let item = item(budget.id, 1, PrintTime::new(1, 0));
        let material = MaterialId(Uuid::new_v4());
        let mut refs = ReferenceValues::default();
        refs.material_prices.insert(material, Decimal::from(20));

        let error = cost_budget(
            &budget,
            &[(item.clone(), vec![usage(item.id, material, 100, 1)])],
            &refs,
            &CostingConfig::default(),
        )
        .expect_err("missing machine power must fail");

        assert_eq!(error, CostingError::MissingMachinePower(machine_id));
    }

    #[test]
    fn labor_combines_preset_rate_and_flat_addition() {
        let budget = budget(false, false);
        let preset = PresetId(Uuid::new_v4());
        let mut item = item(budget.id, 1, PrintTime::new(2, 30));
        item.cost_preset_id = Some(preset);
        item.additional_labor_cost = 500;
        let material = MaterialId(Uuid::new_v4());
        let mut refs = ReferenceValues::default();
        refs.material_prices.insert(material, Decimal::from(20));
        refs.labor_rates.insert(preset, Decimal::from(50));

        let result = cost_budget(
            &budget,
            &[(item.clone(), vec![usage(item.id, material, 100, 1)])],
            &refs,
            &CostingConfig::default(),
        )
        .expect("costing succeeds");

        // 2.5 h * 50/h => 125.00 => 12500 cents, plus 500 flat.
        assert_eq!(result.items[0].costs.labor_cost, 13_000);
    }

    #[test]
    fn missing_labor_rate_for_referenced_preset_is_an_error() {
        let budget = budget(false, false);
        let preset = PresetId(Uuid::new_v4());
        let mut item = item(budget.id, 1, PrintTime::new(1, 0));
        item.cost_preset_id = Some(preset);
        let material = MaterialId(Uuid::new_v4());
        let mut refs = ReferenceValues::default();
        refs.material_prices.insert(material, Decimal::from(20));

        let error = cost_budget(
            &budget,
            &[(item.clone(), vec![usage(item.id, material, 100, 1)])],
            &refs,
            &CostingConfig::default(),
        )
        .expect_err("missing labor rate must fail");

        assert_eq!(error, CostingError::MissingLaborRate(preset));
    }

    #[test]
    fn missing_material_price_is_always_an_error() {
        let budget = budget(false, false);
        let item = item(budget.id, 1, PrintTime::new(0, 30));
        let material = MaterialId(Uuid::new_v4());
        let refs = ReferenceValues::default();

        let error = cost_budget(
            &budget,
            &[(item.clone(), vec![usage(item.id, material, 100, 1)])],
            &refs,
            &CostingConfig::default(),
        )
        .expect_err("missing price must fail");

        assert_eq!(error, CostingError::MissingMaterialPrice(material));
    }

    #[test]
    fn unit_price_truncates_toward_zero() {
        let budget = budget(false, false);
        let item = item(budget.id, 3, PrintTime::new(0, 0));
        let material = MaterialId(Uuid::new_v4());
        let mut refs = ReferenceValues::default();
        refs.material_prices.insert(material, Decimal::from(10));

        let result = cost_budget(
            &budget,
            &[(item.clone(), vec![usage(item.id, material, 100, 1)])],
            &refs,
            &CostingConfig::default(),
        )
        .expect("costing succeeds");

        // 100 g at 10/kg => 100 cents; 100 / 3 truncates to 33.
        assert_eq!(result.items[0].costs.total_cost, 100);
        assert_eq!(result.items[0].costs.unit_price, 33);
    }

    #[test]
    fn totals_equal_sum_of_item_totals() {
        let budget = budget(false, true);
        let first_item = item(budget.id, 2, PrintTime::new(1, 0));
        let second_item = item(budget.id, 1, PrintTime::new(0, 45));
        let a = MaterialId(Uuid::new_v4());
        let b = MaterialId(Uuid::new_v4());
        let mut refs = ReferenceValues::default();
        refs.material_prices.insert(a, Decimal::new(1_850, 2));
        refs.material_prices.insert(b, Decimal::new(2_420, 2));

        let result = cost_budget(
            &budget,
            &[
                (
                    first_item.clone(),
                    vec![usage(first_item.id, a, 320, 1), usage(first_item.id, b, 95, 2)],
                ),
                (second_item.clone(), vec![usage(second_item.id, b, 150, 1)]),
            ],
            &refs,
            &CostingConfig::default(),
        )
        .expect("costing succeeds");

        let item_total: i64 = result.items.iter().map(|costed| costed.costs.total_cost).sum();
        assert_eq!(result.totals.total_cost, item_total);
        assert_eq!(
            result.totals.total_cost,
            result.totals.material_cost
                + result.totals.waste_cost
                + result.totals.energy_cost
                + result.totals.labor_cost
        );
    }

    #[test]
    fn recalculation_is_idempotent() {
        let budget = budget(true, true);
        let mut with_presets = budget.clone();
        with_presets.machine_preset_id = Some(PresetId(Uuid::new_v4()));
        with_presets.energy_preset_id = Some(PresetId(Uuid::new_v4()));
        let item = item(with_presets.id, 2, PrintTime::new(3, 20));
        let a = MaterialId(Uuid::new_v4());
        let b = MaterialId(Uuid::new_v4());
        let mut refs = ReferenceValues::default();
        refs.material_prices.insert(a, Decimal::new(1_999, 2));
        refs.material_prices.insert(b, Decimal::new(3_475, 2));
        refs.machine_power_watts = Some(Decimal::from(220));
        refs.energy_price_per_kwh = Some(Decimal::new(92, 2));

        let inputs =
            vec![(item.clone(), vec![usage(item.id, a, 410, 1), usage(item.id, b, 55, 2)])];
        let config = CostingConfig::default();

        let first = cost_budget(&with_presets, &inputs, &refs, &config).expect("first run");
        let second = cost_budget(&with_presets, &inputs, &refs, &config).expect("second run");

        assert_eq!(first, second);
    }

    #[test]
    fn half_up_rounding_differs_from_floor_on_half_cents() {
        // 25 g at 25/kg => 0.625 => 62.5 cents.
        let budget = budget(false, false);
        let item = item(budget.id, 1, PrintTime::new(0, 0));
        let material = MaterialId(Uuid::new_v4());
        let mut refs = ReferenceValues::default();
        refs.material_prices.insert(material, Decimal::from(25));
        let inputs = vec![(item.clone(), vec![usage(item.id, material, 25, 1)])];

        let floored = cost_budget(&budget, &inputs, &refs, &CostingConfig::default())
            .expect("floor run");
        let half_up = cost_budget(
            &budget,
            &inputs,
            &refs,
            &CostingConfig {
                rounding: RoundingMode::HalfUp,
                ..CostingConfig::default()
            },
        )
        .expect("half-up run");

        assert_eq!(floored.items[0].costs.material_cost, 62);
        assert_eq!(half_up.items[0].costs.material_cost, 63);
    }

    #[test]
    fn empty_budget_produces_zero_totals() {
        let budget = budget(true, true);
        let result =
            cost_budget(&budget, &[], &ReferenceValues::default(), &CostingConfig::default())
                .expect("empty costing succeeds");
        assert_eq!(result.totals.total_cost, 0);
        assert!(result.items.is_empty());
    }

    #[test]
    fn item_without_usages_is_rejected() {
        let budget = budget(false, false);
        let item = item(budget.id, 1, PrintTime::new(0, 0));
        let error = cost_budget(
            &budget,
            &[(item.clone(), Vec::new())],
            &ReferenceValues::default(),
            &CostingConfig::default(),
        )
        .expect_err("empty item must fail");
        assert_eq!(error, CostingError::EmptyItem(item.id));
    }
}
