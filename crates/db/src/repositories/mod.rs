use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use printquote_core::domain::budget::{Budget, BudgetId};
use printquote_core::domain::item::{BudgetItem, BudgetItemId};
use printquote_core::domain::reference::{
    CompanyProfile, Customer, CustomerId, Material, MaterialId, Preset, PresetId, PresetKind,
};
use printquote_core::domain::usage::{MaterialUsage, MaterialUsageId};
use printquote_core::domain::TenantId;
use printquote_core::workflow::StatusHistoryEntry;

pub mod budget;
pub mod company;
pub mod customer;
mod decode;
pub mod material;
pub mod memory;
pub mod preset;

pub use budget::SqlBudgetRepository;
pub use company::SqlCompanyRepository;
pub use customer::SqlCustomerRepository;
pub use material::SqlMaterialRepository;
pub use memory::{
    InMemoryBudgetRepository, InMemoryCompanyRepository, InMemoryCustomerRepository,
    InMemoryMaterialRepository, InMemoryPresetRepository,
};
pub use preset::SqlPresetRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Pagination input for list queries. Pages are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Self {
        Self { number: number.max(1), size: size.max(1) }
    }

    pub fn offset(&self) -> u32 {
        (self.number - 1) * self.size
    }
}

/// Persistence seam for budgets and everything they own. Every read of a
/// tenant-owned record filters by tenant at this level; a lookup for
/// another tenant's record comes back `None`, never a cross-tenant leak.
/// Status history is append-only: the contract deliberately has no update
/// or delete operation for it.
#[async_trait]
pub trait BudgetRepository: Send + Sync {
    async fn create(&self, budget: Budget) -> Result<(), RepositoryError>;
    async fn find_by_id(
        &self,
        id: &BudgetId,
        tenant: &TenantId,
    ) -> Result<Option<Budget>, RepositoryError>;
    async fn update(&self, budget: Budget) -> Result<(), RepositoryError>;
    async fn soft_delete(
        &self,
        id: &BudgetId,
        tenant: &TenantId,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    async fn list(
        &self,
        tenant: &TenantId,
        page: Page,
    ) -> Result<(Vec<Budget>, u64), RepositoryError>;
    async fn list_by_customer(
        &self,
        customer_id: &CustomerId,
        tenant: &TenantId,
    ) -> Result<Vec<Budget>, RepositoryError>;

    async fn add_item(&self, item: BudgetItem) -> Result<(), RepositoryError>;
    async fn update_item(&self, item: BudgetItem) -> Result<(), RepositoryError>;
    async fn remove_item(&self, id: &BudgetItemId) -> Result<(), RepositoryError>;
    async fn list_items(&self, budget_id: &BudgetId) -> Result<Vec<BudgetItem>, RepositoryError>;
    async fn delete_items(&self, budget_id: &BudgetId) -> Result<(), RepositoryError>;

    async fn add_usage(&self, usage: MaterialUsage) -> Result<(), RepositoryError>;
    async fn remove_usage(&self, id: &MaterialUsageId) -> Result<(), RepositoryError>;
    async fn list_usages(
        &self,
        item_id: &BudgetItemId,
    ) -> Result<Vec<MaterialUsage>, RepositoryError>;

    async fn append_history(&self, entry: StatusHistoryEntry) -> Result<(), RepositoryError>;
    async fn list_history(
        &self,
        budget_id: &BudgetId,
    ) -> Result<Vec<StatusHistoryEntry>, RepositoryError>;
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &CustomerId,
        tenant: &TenantId,
    ) -> Result<Option<Customer>, RepositoryError>;
}

#[async_trait]
pub trait MaterialRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &MaterialId,
        tenant: &TenantId,
    ) -> Result<Option<Material>, RepositoryError>;
}

#[async_trait]
pub trait PresetRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &PresetId,
        kind: PresetKind,
        tenant: &TenantId,
    ) -> Result<Option<Preset>, RepositoryError>;
}

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn find_by_tenant(
        &self,
        tenant: &TenantId,
    ) -> Result<Option<CompanyProfile>, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::Page;

    #[test]
    fn page_offset_is_zero_based() {
        assert_eq!(Page::new(1, 20).offset(), 0);
        assert_eq!(Page::new(3, 20).offset(), 40);
    }

    #[test]
    fn page_clamps_degenerate_inputs() {
        let page = Page::new(0, 0);
        assert_eq!(page.number, 1);
        assert_eq!(page.size, 1);
    }
}
