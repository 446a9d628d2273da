//! In-memory repositories backing the orchestrator test suites. Same
//! contract semantics as the SQLite adapters: tenant filtering, soft-delete
//! invisibility, append-only history.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use printquote_core::domain::budget::{Budget, BudgetId, Lifecycle};
use printquote_core::domain::item::{BudgetItem, BudgetItemId};
use printquote_core::domain::reference::{
    CompanyProfile, Customer, CustomerId, Material, MaterialId, Preset, PresetId, PresetKind,
};
use printquote_core::domain::usage::{MaterialUsage, MaterialUsageId};
use printquote_core::domain::TenantId;
use printquote_core::workflow::StatusHistoryEntry;

use super::{
    BudgetRepository, CompanyRepository, CustomerRepository, MaterialRepository, Page,
    PresetRepository, RepositoryError,
};

#[derive(Default)]
pub struct InMemoryBudgetRepository {
    budgets: RwLock<HashMap<Uuid, Budget>>,
    items: RwLock<HashMap<Uuid, BudgetItem>>,
    usages: RwLock<HashMap<Uuid, MaterialUsage>>,
    history: RwLock<Vec<StatusHistoryEntry>>,
    fail_next_item_write: AtomicBool,
    fail_next_usage_write: AtomicBool,
}

impl InMemoryBudgetRepository {
    /// Makes the next `add_item` call fail once, simulating a storage
    /// outage mid-way through a multi-step write.
    pub fn fail_next_item_write(&self) {
        self.fail_next_item_write.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_usage_write(&self) {
        self.fail_next_usage_write.store(true, Ordering::SeqCst);
    }

    /// Raw row count regardless of lifecycle, for asserting that a
    /// compensated create left nothing visible behind.
    pub async fn stored_budget_count(&self) -> usize {
        self.budgets.read().await.len()
    }

    fn take_flag(flag: &AtomicBool) -> bool {
        flag.swap(false, Ordering::SeqCst)
    }
}

fn visible<'a>(budget: &'a Budget, tenant: &TenantId) -> Option<&'a Budget> {
    (&budget.tenant_id == tenant && !budget.lifecycle.is_deleted()).then_some(budget)
}

#[async_trait::async_trait]
impl BudgetRepository for InMemoryBudgetRepository {
    async fn create(&self, budget: Budget) -> Result<(), RepositoryError> {
        let mut budgets = self.budgets.write().await;
        budgets.insert(budget.id.0, budget);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &BudgetId,
        tenant: &TenantId,
    ) -> Result<Option<Budget>, RepositoryError> {
        let budgets = self.budgets.read().await;
        Ok(budgets.get(&id.0).and_then(|budget| visible(budget, tenant)).cloned())
    }

    async fn update(&self, budget: Budget) -> Result<(), RepositoryError> {
        let mut budgets = self.budgets.write().await;
        budgets.insert(budget.id.0, budget);
        Ok(())
    }

    async fn soft_delete(
        &self,
        id: &BudgetId,
        tenant: &TenantId,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut budgets = self.budgets.write().await;
        if let Some(budget) = budgets.get_mut(&id.0) {
            if &budget.tenant_id == tenant && !budget.lifecycle.is_deleted() {
                budget.lifecycle = Lifecycle::Deleted { at: deleted_at };
                budget.updated_at = deleted_at;
            }
        }
        Ok(())
    }

    async fn list(
        &self,
        tenant: &TenantId,
        page: Page,
    ) -> Result<(Vec<Budget>, u64), RepositoryError> {
        let budgets = self.budgets.read().await;
        let mut rows: Vec<Budget> = budgets
            .values()
            .filter_map(|budget| visible(budget, tenant))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = rows.len() as u64;
        let rows = rows
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok((rows, total))
    }

    async fn list_by_customer(
        &self,
        customer_id: &CustomerId,
        tenant: &TenantId,
    ) -> Result<Vec<Budget>, RepositoryError> {
        let budgets = self.budgets.read().await;
        let mut rows: Vec<Budget> = budgets
            .values()
            .filter_map(|budget| visible(budget, tenant))
            .filter(|budget| &budget.customer_id == customer_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn add_item(&self, item: BudgetItem) -> Result<(), RepositoryError> {
        if Self::take_flag(&self.fail_next_item_write) {
            return Err(RepositoryError::Unavailable("injected item write failure".to_string()));
        }
        let mut items = self.items.write().await;
        items.insert(item.id.0, item);
        Ok(())
    }

    async fn update_item(&self, item: BudgetItem) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        items.insert(item.id.0, item);
        Ok(())
    }

    async fn remove_item(&self, id: &BudgetItemId) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        items.remove(&id.0);
        let mut usages = self.usages.write().await;
        usages.retain(|_, usage| usage.item_id != *id);
        Ok(())
    }

    async fn list_items(&self, budget_id: &BudgetId) -> Result<Vec<BudgetItem>, RepositoryError> {
        let items = self.items.read().await;
        let mut rows: Vec<BudgetItem> =
            items.values().filter(|item| item.budget_id == *budget_id).cloned().collect();
        rows.sort_by(|a, b| {
            a.position.cmp(&b.position).then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(rows)
    }

    async fn delete_items(&self, budget_id: &BudgetId) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        let removed: Vec<BudgetItemId> = items
            .values()
            .filter(|item| item.budget_id == *budget_id)
            .map(|item| item.id)
            .collect();
        items.retain(|_, item| item.budget_id != *budget_id);
        drop(items);

        let mut usages = self.usages.write().await;
        usages.retain(|_, usage| !removed.contains(&usage.item_id));
        Ok(())
    }

    async fn add_usage(&self, usage: MaterialUsage) -> Result<(), RepositoryError> {
        if Self::take_flag(&self.fail_next_usage_write) {
            return Err(RepositoryError::Unavailable("injected usage write failure".to_string()));
        }
        let mut usages = self.usages.write().await;
        usages.insert(usage.id.0, usage);
        Ok(())
    }

    async fn remove_usage(&self, id: &MaterialUsageId) -> Result<(), RepositoryError> {
        let mut usages = self.usages.write().await;
        usages.remove(&id.0);
        Ok(())
    }

    async fn list_usages(
        &self,
        item_id: &BudgetItemId,
    ) -> Result<Vec<MaterialUsage>, RepositoryError> {
        let usages = self.usages.read().await;
        let mut rows: Vec<MaterialUsage> =
            usages.values().filter(|usage| usage.item_id == *item_id).cloned().collect();
        rows.sort_by(|a, b| a.position.cmp(&b.position));
        Ok(rows)
    }

    async fn append_history(&self, entry: StatusHistoryEntry) -> Result<(), RepositoryError> {
        let mut history = self.history.write().await;
        history.push(entry);
        Ok(())
    }

    async fn list_history(
        &self,
        budget_id: &BudgetId,
    ) -> Result<Vec<StatusHistoryEntry>, RepositoryError> {
        let history = self.history.read().await;
        Ok(history.iter().filter(|entry| entry.budget_id == *budget_id).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<Uuid, Customer>>,
}

impl InMemoryCustomerRepository {
    pub async fn insert(&self, customer: Customer) {
        let mut customers = self.customers.write().await;
        customers.insert(customer.id.0, customer);
    }
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_id(
        &self,
        id: &CustomerId,
        tenant: &TenantId,
    ) -> Result<Option<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        Ok(customers
            .get(&id.0)
            .filter(|customer| &customer.tenant_id == tenant)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryMaterialRepository {
    materials: RwLock<HashMap<Uuid, Material>>,
}

impl InMemoryMaterialRepository {
    pub async fn insert(&self, material: Material) {
        let mut materials = self.materials.write().await;
        materials.insert(material.id.0, material);
    }
}

#[async_trait::async_trait]
impl MaterialRepository for InMemoryMaterialRepository {
    async fn find_by_id(
        &self,
        id: &MaterialId,
        tenant: &TenantId,
    ) -> Result<Option<Material>, RepositoryError> {
        let materials = self.materials.read().await;
        Ok(materials
            .get(&id.0)
            .filter(|material| &material.tenant_id == tenant)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryPresetRepository {
    presets: RwLock<HashMap<Uuid, Preset>>,
}

impl InMemoryPresetRepository {
    pub async fn insert(&self, preset: Preset) {
        let mut presets = self.presets.write().await;
        presets.insert(preset.id.0, preset);
    }
}

#[async_trait::async_trait]
impl PresetRepository for InMemoryPresetRepository {
    async fn find_by_id(
        &self,
        id: &PresetId,
        kind: PresetKind,
        tenant: &TenantId,
    ) -> Result<Option<Preset>, RepositoryError> {
        let presets = self.presets.read().await;
        Ok(presets
            .get(&id.0)
            .filter(|preset| preset.kind == kind && &preset.tenant_id == tenant)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryCompanyRepository {
    profiles: RwLock<HashMap<String, CompanyProfile>>,
}

impl InMemoryCompanyRepository {
    pub async fn insert(&self, profile: CompanyProfile) {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.tenant_id.0.clone(), profile);
    }
}

#[async_trait::async_trait]
impl CompanyRepository for InMemoryCompanyRepository {
    async fn find_by_tenant(
        &self,
        tenant: &TenantId,
    ) -> Result<Option<CompanyProfile>, RepositoryError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(&tenant.0).cloned())
    }
}
