//! The budget orchestrator: composes the repositories, the cost calculator
//! and the status workflow into atomic use-case operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use printquote_core::config::EngineConfig;
use printquote_core::costing::{cost_budget, ReferenceValues};
use printquote_core::domain::budget::{Budget, BudgetId, CostBreakdown, Lifecycle};
use printquote_core::domain::item::{BudgetItem, BudgetItemId, ItemCostBreakdown, PrintTime};
use printquote_core::domain::reference::{CompanyProfile, CustomerId, PresetKind};
use printquote_core::domain::request::{
    BudgetItemRequest, CreateBudgetRequest, UpdateBudgetRequest, UpdateStatusRequest,
};
use printquote_core::domain::response::{
    BudgetPage, BudgetResponse, ItemView, PresetSummary, PrintTimeTotal, UsageView,
};
use printquote_core::domain::usage::{MaterialUsage, MaterialUsageId};
use printquote_core::domain::{ActorId, TenantId};
use printquote_core::errors::DomainError;
use printquote_core::workflow::{is_valid_transition, Status, StatusHistoryEntry, StatusLog};
use printquote_db::repositories::{
    BudgetRepository, CompanyRepository, CustomerRepository, MaterialRepository, Page,
    PresetRepository,
};

use crate::errors::{EngineError, ResourceKind};

/// Request-scoped and stateless between invocations: every method takes the
/// tenant explicitly and touches only the records named by the request.
pub struct BudgetService {
    budgets: Arc<dyn BudgetRepository>,
    customers: Arc<dyn CustomerRepository>,
    materials: Arc<dyn MaterialRepository>,
    presets: Arc<dyn PresetRepository>,
    companies: Arc<dyn CompanyRepository>,
    config: EngineConfig,
}

impl BudgetService {
    pub fn new(
        budgets: Arc<dyn BudgetRepository>,
        customers: Arc<dyn CustomerRepository>,
        materials: Arc<dyn MaterialRepository>,
        presets: Arc<dyn PresetRepository>,
        companies: Arc<dyn CompanyRepository>,
        config: EngineConfig,
    ) -> Self {
        Self { budgets, customers, materials, presets, companies, config }
    }

    /// Validates, persists the budget with its items and usages as one
    /// logical unit, then calculates costs and returns the full graph.
    /// A failed item or usage write rolls the new budget back instead of
    /// leaving an orphan.
    pub async fn create(
        &self,
        tenant: &TenantId,
        actor: &ActorId,
        request: CreateBudgetRequest,
    ) -> Result<BudgetResponse, EngineError> {
        let issues = request.validation_issues();
        if !issues.is_empty() {
            return Err(EngineError::Validation(issues.join("; ")));
        }
        self.require_customer(tenant, &request).await?;

        let now = Utc::now();
        let budget = Budget {
            id: BudgetId(Uuid::new_v4()),
            tenant_id: tenant.clone(),
            name: request.name.clone(),
            description: request.description.clone(),
            customer_id: request.customer_id,
            status: Status::Draft,
            machine_preset_id: request.machine_preset_id,
            energy_preset_id: request.energy_preset_id,
            include_energy_cost: request.include_energy_cost,
            include_waste_cost: request.include_waste_cost,
            delivery_days: request.delivery_days,
            payment_terms: request.payment_terms.clone(),
            notes: request.notes.clone(),
            costs: CostBreakdown::default(),
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        };

        self.budgets.create(budget.clone()).await?;

        if let Err(error) = self.persist_items(tenant, budget.id, &request.items, now).await {
            // Compensating delete: the half-written aggregate must not
            // survive the failure.
            let _ = self.budgets.soft_delete(&budget.id, tenant, Utc::now()).await;
            warn!(
                budget_id = %budget.id.0,
                "budget creation rolled back after item write failure"
            );
            return Err(error);
        }

        self.recalculate_budget(tenant, &budget.id).await?;
        info!(
            budget_id = %budget.id.0,
            actor = %actor.0,
            name = %budget.name,
            "budget created"
        );
        self.assemble(tenant, &budget.id).await
    }

    /// Partial update of a draft budget. Fields absent from the request are
    /// left untouched; a supplied item list replaces all existing items and
    /// usages. Always ends by recalculating costs.
    pub async fn update(
        &self,
        tenant: &TenantId,
        actor: &ActorId,
        id: &BudgetId,
        request: UpdateBudgetRequest,
    ) -> Result<BudgetResponse, EngineError> {
        let issues = request.validation_issues();
        if !issues.is_empty() {
            return Err(EngineError::Validation(issues.join("; ")));
        }

        let mut budget = self.load(tenant, id).await?;
        if !budget.is_editable() {
            warn!(budget_id = %budget.id.0, status = ?budget.status, "rejected edit outside draft");
            return Err(DomainError::NotEditable(budget.status).into());
        }

        if let Some(customer_id) = request.customer_id {
            if self.customers.find_by_id(&customer_id, tenant).await?.is_none() {
                return Err(EngineError::not_found(ResourceKind::Customer, customer_id.0));
            }
            budget.customer_id = customer_id;
        }
        if let Some(name) = request.name {
            budget.name = name;
        }
        if let Some(description) = request.description {
            budget.description = description;
        }
        if let Some(machine_preset_id) = request.machine_preset_id {
            budget.machine_preset_id = Some(machine_preset_id);
        }
        if let Some(energy_preset_id) = request.energy_preset_id {
            budget.energy_preset_id = Some(energy_preset_id);
        }
        if let Some(include_energy_cost) = request.include_energy_cost {
            budget.include_energy_cost = include_energy_cost;
        }
        if let Some(include_waste_cost) = request.include_waste_cost {
            budget.include_waste_cost = include_waste_cost;
        }
        if let Some(delivery_days) = request.delivery_days {
            budget.delivery_days = Some(delivery_days);
        }
        if let Some(payment_terms) = request.payment_terms {
            budget.payment_terms = Some(payment_terms);
        }
        if let Some(notes) = request.notes {
            budget.notes = Some(notes);
        }

        let now = Utc::now();
        budget.updated_at = now;

        if let Some(items) = &request.items {
            self.budgets.delete_items(&budget.id).await?;
            self.persist_items(tenant, budget.id, items, now).await?;
        }

        self.budgets.update(budget.clone()).await?;
        self.recalculate_budget(tenant, id).await?;
        info!(budget_id = %budget.id.0, actor = %actor.0, "budget updated");
        self.assemble(tenant, id).await
    }

    /// Soft-deletes the budget after the policy check. Cascading the
    /// owned rows is the storage adapter's concern.
    pub async fn delete(&self, tenant: &TenantId, id: &BudgetId) -> Result<(), EngineError> {
        let budget = self.load(tenant, id).await?;
        if !budget.is_deletable() {
            warn!(budget_id = %budget.id.0, status = ?budget.status, "rejected delete");
            return Err(DomainError::NotDeletable(budget.status).into());
        }

        self.budgets.soft_delete(id, tenant, Utc::now()).await?;
        info!(budget_id = %id.0, "budget deleted");
        Ok(())
    }

    /// The only path that moves a budget out of draft: validates the
    /// transition, appends one immutable history row, persists the status.
    pub async fn change_status(
        &self,
        tenant: &TenantId,
        actor: &ActorId,
        id: &BudgetId,
        request: UpdateStatusRequest,
    ) -> Result<BudgetResponse, EngineError> {
        let mut budget = self.load(tenant, id).await?;
        if !is_valid_transition(budget.status, request.status) {
            warn!(
                budget_id = %budget.id.0,
                from = ?budget.status,
                to = ?request.status,
                "rejected status transition"
            );
            return Err(
                DomainError::InvalidTransition { from: budget.status, to: request.status }.into()
            );
        }

        let now = Utc::now();
        self.budgets
            .append_history(StatusHistoryEntry::new(
                budget.id,
                budget.status,
                request.status,
                actor.clone(),
                request.notes,
                now,
            ))
            .await?;

        budget.status = request.status;
        budget.updated_at = now;
        self.budgets.update(budget.clone()).await?;

        info!(
            budget_id = %budget.id.0,
            actor = %actor.0,
            status = ?budget.status,
            "budget status changed"
        );
        self.assemble(tenant, id).await
    }

    /// Deep copy with fresh identities, forced back to draft. The source
    /// budget is untouched.
    pub async fn duplicate(
        &self,
        tenant: &TenantId,
        actor: &ActorId,
        id: &BudgetId,
    ) -> Result<BudgetResponse, EngineError> {
        let source = self.load(tenant, id).await?;
        let now = Utc::now();
        let copy = Budget {
            id: BudgetId(Uuid::new_v4()),
            name: format!("{} (copy)", source.name),
            status: Status::Draft,
            costs: CostBreakdown::default(),
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
            ..source.clone()
        };

        self.budgets.create(copy.clone()).await?;

        if let Err(error) = self.copy_items(tenant, &source.id, copy.id, now).await {
            let _ = self.budgets.soft_delete(&copy.id, tenant, Utc::now()).await;
            warn!(
                budget_id = %copy.id.0,
                source_id = %source.id.0,
                "budget duplication rolled back after item write failure"
            );
            return Err(error);
        }

        self.recalculate_budget(tenant, &copy.id).await?;
        info!(
            budget_id = %copy.id.0,
            source_id = %source.id.0,
            actor = %actor.0,
            "budget duplicated"
        );
        self.assemble(tenant, &copy.id).await
    }

    /// Re-runs the calculator over the stored items and usages and persists
    /// the refreshed breakdown. Idempotent and safe to re-run after any
    /// partial failure; never changes status.
    pub async fn recalculate(
        &self,
        tenant: &TenantId,
        id: &BudgetId,
    ) -> Result<BudgetResponse, EngineError> {
        self.recalculate_budget(tenant, id).await?;
        info!(budget_id = %id.0, "budget recalculated");
        self.assemble(tenant, id).await
    }

    pub async fn find(
        &self,
        tenant: &TenantId,
        id: &BudgetId,
    ) -> Result<BudgetResponse, EngineError> {
        self.assemble(tenant, id).await
    }

    pub async fn list(
        &self,
        tenant: &TenantId,
        page: u32,
        page_size: Option<u32>,
    ) -> Result<BudgetPage, EngineError> {
        let page = Page::new(page, page_size.unwrap_or(self.config.default_page_size));
        let (budgets, total) = self.budgets.list(tenant, page).await?;

        let mut responses = Vec::with_capacity(budgets.len());
        for budget in budgets {
            responses.push(self.assemble(tenant, &budget.id).await?);
        }

        let total_pages = total.div_ceil(u64::from(page.size)) as u32;
        Ok(BudgetPage {
            budgets: responses,
            total,
            page: page.number,
            page_size: page.size,
            total_pages,
        })
    }

    pub async fn list_by_customer(
        &self,
        tenant: &TenantId,
        customer_id: &CustomerId,
    ) -> Result<Vec<BudgetResponse>, EngineError> {
        let budgets = self.budgets.list_by_customer(customer_id, tenant).await?;
        let mut responses = Vec::with_capacity(budgets.len());
        for budget in budgets {
            responses.push(self.assemble(tenant, &budget.id).await?);
        }
        Ok(responses)
    }

    pub async fn history(
        &self,
        tenant: &TenantId,
        id: &BudgetId,
    ) -> Result<StatusLog, EngineError> {
        // Existence check keeps tenant scoping airtight before reading
        // the (budget-keyed) history table.
        self.load(tenant, id).await?;
        Ok(StatusLog::from(self.budgets.list_history(id).await?))
    }

    /// Branding lookup for the document renderer.
    pub async fn company_profile(
        &self,
        tenant: &TenantId,
    ) -> Result<CompanyProfile, EngineError> {
        self.companies
            .find_by_tenant(tenant)
            .await?
            .ok_or_else(|| EngineError::not_found(ResourceKind::Company, &tenant.0))
    }

    async fn require_customer(
        &self,
        tenant: &TenantId,
        request: &CreateBudgetRequest,
    ) -> Result<(), EngineError> {
        if self.customers.find_by_id(&request.customer_id, tenant).await?.is_none() {
            return Err(EngineError::not_found(ResourceKind::Customer, request.customer_id.0));
        }
        Ok(())
    }

    async fn load(&self, tenant: &TenantId, id: &BudgetId) -> Result<Budget, EngineError> {
        self.budgets
            .find_by_id(id, tenant)
            .await?
            .ok_or_else(|| EngineError::not_found(ResourceKind::Budget, id.0))
    }

    async fn persist_items(
        &self,
        tenant: &TenantId,
        budget_id: BudgetId,
        requests: &[BudgetItemRequest],
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        for request in requests {
            let item_id = BudgetItemId(Uuid::new_v4());
            let item = BudgetItem {
                id: item_id,
                budget_id,
                tenant_id: tenant.clone(),
                product_name: request.product_name.clone(),
                product_description: request.product_description.clone(),
                product_quantity: request.product_quantity,
                product_dimensions: request.product_dimensions.clone(),
                print_time: PrintTime::new(request.print_time_hours, request.print_time_minutes),
                cost_preset_id: request.cost_preset_id,
                additional_labor_cost: request.additional_labor_cost.unwrap_or(0),
                notes: request.notes.clone(),
                position: request.position,
                costs: ItemCostBreakdown::default(),
                created_at: now,
                updated_at: now,
            };
            self.budgets.add_item(item).await?;

            for usage in &request.usages {
                self.budgets
                    .add_usage(MaterialUsage {
                        id: MaterialUsageId(Uuid::new_v4()),
                        item_id,
                        tenant_id: tenant.clone(),
                        material_id: usage.material_id,
                        mass_grams: usage.mass_grams,
                        position: usage.position,
                    })
                    .await?;
            }
        }
        Ok(())
    }

    async fn copy_items(
        &self,
        tenant: &TenantId,
        source_id: &BudgetId,
        target_id: BudgetId,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        for source_item in self.budgets.list_items(source_id).await? {
            let item_id = BudgetItemId(Uuid::new_v4());
            let copy = BudgetItem {
                id: item_id,
                budget_id: target_id,
                costs: ItemCostBreakdown::default(),
                created_at: now,
                updated_at: now,
                ..source_item.clone()
            };
            self.budgets.add_item(copy).await?;

            for source_usage in self.budgets.list_usages(&source_item.id).await? {
                self.budgets
                    .add_usage(MaterialUsage {
                        id: MaterialUsageId(Uuid::new_v4()),
                        item_id,
                        tenant_id: tenant.clone(),
                        ..source_usage
                    })
                    .await?;
            }
        }
        Ok(())
    }

    /// Loads the stored rows, resolves reference data, runs the pure
    /// calculator and persists the per-item breakdowns together with the
    /// budget aggregate.
    async fn recalculate_budget(
        &self,
        tenant: &TenantId,
        id: &BudgetId,
    ) -> Result<(), EngineError> {
        let mut budget = self.load(tenant, id).await?;

        let mut pairs = Vec::new();
        for item in self.budgets.list_items(id).await? {
            let usages = self.budgets.list_usages(&item.id).await?;
            pairs.push((item, usages));
        }

        let refs = self.resolve_reference_values(tenant, &budget, &pairs).await?;
        let costing = cost_budget(&budget, &pairs, &refs, &self.config.costing)?;

        let now = Utc::now();
        for (item, _) in &mut pairs {
            if let Some(costed) = costing.items.iter().find(|costed| costed.item_id == item.id) {
                item.costs = costed.costs;
                item.updated_at = now;
                self.budgets.update_item(item.clone()).await?;
            }
        }

        budget.costs = costing.totals;
        budget.updated_at = now;
        self.budgets.update(budget).await?;
        Ok(())
    }

    async fn resolve_reference_values(
        &self,
        tenant: &TenantId,
        budget: &Budget,
        pairs: &[(BudgetItem, Vec<MaterialUsage>)],
    ) -> Result<ReferenceValues, EngineError> {
        let mut refs = ReferenceValues::default();

        for (item, usages) in pairs {
            for usage in usages {
                if refs.material_prices.contains_key(&usage.material_id) {
                    continue;
                }
                let material = self
                    .materials
                    .find_by_id(&usage.material_id, tenant)
                    .await?
                    .ok_or_else(|| {
                        EngineError::not_found(ResourceKind::Material, usage.material_id.0)
                    })?;
                refs.material_prices.insert(usage.material_id, material.price_per_kg);
            }

            if let Some(preset_id) = item.cost_preset_id {
                if !refs.labor_rates.contains_key(&preset_id) {
                    // An unresolved rate is reported by the calculator,
                    // which knows whether the reference is required.
                    if let Some(preset) =
                        self.presets.find_by_id(&preset_id, PresetKind::Cost, tenant).await?
                    {
                        refs.labor_rates.insert(preset_id, preset.value);
                    }
                }
            }
        }

        if budget.include_energy_cost {
            if let Some(machine_id) = budget.machine_preset_id {
                refs.machine_power_watts = self
                    .presets
                    .find_by_id(&machine_id, PresetKind::Machine, tenant)
                    .await?
                    .map(|preset| preset.value);
            }
            if let Some(energy_id) = budget.energy_preset_id {
                refs.energy_price_per_kwh = self
                    .presets
                    .find_by_id(&energy_id, PresetKind::Energy, tenant)
                    .await?
                    .map(|preset| preset.value);
            }
        }

        Ok(refs)
    }

    async fn assemble(
        &self,
        tenant: &TenantId,
        id: &BudgetId,
    ) -> Result<BudgetResponse, EngineError> {
        let budget = self.load(tenant, id).await?;
        let customer = self
            .customers
            .find_by_id(&budget.customer_id, tenant)
            .await?
            .ok_or_else(|| EngineError::not_found(ResourceKind::Customer, budget.customer_id.0))?;

        let mut items = Vec::new();
        for item in self.budgets.list_items(id).await? {
            let mut usages = Vec::new();
            for usage in self.budgets.list_usages(&item.id).await? {
                let material = self
                    .materials
                    .find_by_id(&usage.material_id, tenant)
                    .await?
                    .ok_or_else(|| {
                        EngineError::not_found(ResourceKind::Material, usage.material_id.0)
                    })?;
                usages.push(UsageView { usage, material });
            }
            items.push(ItemView {
                print_time_display: item.print_time.display(),
                item,
                usages,
            });
        }

        let machine_preset = match budget.machine_preset_id {
            Some(preset_id) => self
                .presets
                .find_by_id(&preset_id, PresetKind::Machine, tenant)
                .await?
                .as_ref()
                .map(PresetSummary::from),
            None => None,
        };
        let energy_preset = match budget.energy_preset_id {
            Some(preset_id) => self
                .presets
                .find_by_id(&preset_id, PresetKind::Energy, tenant)
                .await?
                .as_ref()
                .map(PresetSummary::from),
            None => None,
        };

        let history = StatusLog::from(self.budgets.list_history(id).await?);
        let total_print_time = PrintTimeTotal::from_items(&items);

        Ok(BudgetResponse {
            budget,
            customer,
            items,
            machine_preset,
            energy_preset,
            history,
            total_print_time,
        })
    }
}
