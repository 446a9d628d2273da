use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use printquote_core::domain::budget::{Budget, BudgetId, CostBreakdown, Lifecycle};
use printquote_core::domain::item::{BudgetItem, BudgetItemId, ItemCostBreakdown, PrintTime};
use printquote_core::domain::reference::{CustomerId, MaterialId, PresetId};
use printquote_core::domain::usage::{MaterialUsage, MaterialUsageId};
use printquote_core::domain::{ActorId, TenantId};
use printquote_core::workflow::{HistoryId, Status, StatusHistoryEntry};

use super::decode::{
    get_bool, get_i64, get_opt_i64, get_opt_string, get_string, get_u32, parse_datetime,
    parse_decimal, parse_opt_datetime, parse_opt_uuid, parse_uuid,
};
use super::{BudgetRepository, Page, RepositoryError};
use crate::DbPool;

pub struct SqlBudgetRepository {
    pool: DbPool,
}

impl SqlBudgetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_status(row: &SqliteRow, column: &str) -> Result<Status, RepositoryError> {
    let raw = get_string(row, column)?;
    raw.parse::<Status>().map_err(RepositoryError::Decode)
}

fn row_to_budget(row: &SqliteRow) -> Result<Budget, RepositoryError> {
    let deleted_at = parse_opt_datetime(row, "deleted_at")?;
    let lifecycle = match deleted_at {
        Some(at) => Lifecycle::Deleted { at },
        None => Lifecycle::Active,
    };

    Ok(Budget {
        id: BudgetId(parse_uuid(row, "id")?),
        tenant_id: TenantId(get_string(row, "tenant_id")?),
        name: get_string(row, "name")?,
        description: get_string(row, "description")?,
        customer_id: CustomerId(parse_uuid(row, "customer_id")?),
        status: parse_status(row, "status")?,
        machine_preset_id: parse_opt_uuid(row, "machine_preset_id")?.map(PresetId),
        energy_preset_id: parse_opt_uuid(row, "energy_preset_id")?.map(PresetId),
        include_energy_cost: get_bool(row, "include_energy_cost")?,
        include_waste_cost: get_bool(row, "include_waste_cost")?,
        delivery_days: get_opt_i64(row, "delivery_days")?.map(|days| days as i32),
        payment_terms: get_opt_string(row, "payment_terms")?,
        notes: get_opt_string(row, "notes")?,
        costs: CostBreakdown {
            material_cost: get_i64(row, "material_cost")?,
            waste_cost: get_i64(row, "waste_cost")?,
            energy_cost: get_i64(row, "energy_cost")?,
            labor_cost: get_i64(row, "labor_cost")?,
            total_cost: get_i64(row, "total_cost")?,
        },
        lifecycle,
        created_at: parse_datetime(row, "created_at")?,
        updated_at: parse_datetime(row, "updated_at")?,
    })
}

fn row_to_item(row: &SqliteRow) -> Result<BudgetItem, RepositoryError> {
    Ok(BudgetItem {
        id: BudgetItemId(parse_uuid(row, "id")?),
        budget_id: BudgetId(parse_uuid(row, "budget_id")?),
        tenant_id: TenantId(get_string(row, "tenant_id")?),
        product_name: get_string(row, "product_name")?,
        product_description: get_opt_string(row, "product_description")?,
        product_quantity: get_u32(row, "product_quantity")?,
        product_dimensions: get_opt_string(row, "product_dimensions")?,
        print_time: PrintTime::new(
            get_u32(row, "print_time_hours")?,
            get_u32(row, "print_time_minutes")?,
        ),
        cost_preset_id: parse_opt_uuid(row, "cost_preset_id")?.map(PresetId),
        additional_labor_cost: get_i64(row, "additional_labor_cost")?,
        notes: get_opt_string(row, "notes")?,
        position: get_u32(row, "position")?,
        costs: ItemCostBreakdown {
            material_cost: get_i64(row, "material_cost")?,
            waste_cost: get_i64(row, "waste_cost")?,
            energy_cost: get_i64(row, "energy_cost")?,
            labor_cost: get_i64(row, "labor_cost")?,
            total_cost: get_i64(row, "total_cost")?,
            unit_price: get_i64(row, "unit_price")?,
        },
        created_at: parse_datetime(row, "created_at")?,
        updated_at: parse_datetime(row, "updated_at")?,
    })
}

fn row_to_usage(row: &SqliteRow) -> Result<MaterialUsage, RepositoryError> {
    Ok(MaterialUsage {
        id: MaterialUsageId(parse_uuid(row, "id")?),
        item_id: BudgetItemId(parse_uuid(row, "item_id")?),
        tenant_id: TenantId(get_string(row, "tenant_id")?),
        material_id: MaterialId(parse_uuid(row, "material_id")?),
        mass_grams: parse_decimal(row, "mass_grams")?,
        position: get_u32(row, "position")?,
    })
}

fn row_to_history(row: &SqliteRow) -> Result<StatusHistoryEntry, RepositoryError> {
    Ok(StatusHistoryEntry {
        id: HistoryId(parse_uuid(row, "id")?),
        budget_id: BudgetId(parse_uuid(row, "budget_id")?),
        previous_status: parse_status(row, "previous_status")?,
        new_status: parse_status(row, "new_status")?,
        changed_by: ActorId(get_string(row, "changed_by")?),
        notes: get_opt_string(row, "notes")?,
        created_at: parse_datetime(row, "created_at")?,
    })
}

const BUDGET_COLUMNS: &str = "id, tenant_id, name, description, customer_id, status, \
     machine_preset_id, energy_preset_id, include_energy_cost, include_waste_cost, \
     delivery_days, payment_terms, notes, material_cost, waste_cost, energy_cost, \
     labor_cost, total_cost, deleted_at, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, budget_id, tenant_id, product_name, product_description, \
     product_quantity, product_dimensions, print_time_hours, print_time_minutes, \
     cost_preset_id, additional_labor_cost, notes, position, material_cost, waste_cost, \
     energy_cost, labor_cost, total_cost, unit_price, created_at, updated_at";

#[async_trait::async_trait]
impl BudgetRepository for SqlBudgetRepository {
    async fn create(&self, budget: Budget) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO budget (id, tenant_id, name, description, customer_id, status,
                                 machine_preset_id, energy_preset_id, include_energy_cost,
                                 include_waste_cost, delivery_days, payment_terms, notes,
                                 material_cost, waste_cost, energy_cost, labor_cost, total_cost,
                                 deleted_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(budget.id.0.to_string())
        .bind(&budget.tenant_id.0)
        .bind(&budget.name)
        .bind(&budget.description)
        .bind(budget.customer_id.0.to_string())
        .bind(budget.status.as_str())
        .bind(budget.machine_preset_id.map(|id| id.0.to_string()))
        .bind(budget.energy_preset_id.map(|id| id.0.to_string()))
        .bind(i64::from(budget.include_energy_cost))
        .bind(i64::from(budget.include_waste_cost))
        .bind(budget.delivery_days.map(i64::from))
        .bind(&budget.payment_terms)
        .bind(&budget.notes)
        .bind(budget.costs.material_cost)
        .bind(budget.costs.waste_cost)
        .bind(budget.costs.energy_cost)
        .bind(budget.costs.labor_cost)
        .bind(budget.costs.total_cost)
        .bind(budget.lifecycle.deleted_at().map(|at| at.to_rfc3339()))
        .bind(budget.created_at.to_rfc3339())
        .bind(budget.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &BudgetId,
        tenant: &TenantId,
    ) -> Result<Option<Budget>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budget
             WHERE id = ? AND tenant_id = ? AND deleted_at IS NULL"
        ))
        .bind(id.0.to_string())
        .bind(&tenant.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_budget(r)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, budget: Budget) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE budget SET name = ?, description = ?, customer_id = ?, status = ?,
                    machine_preset_id = ?, energy_preset_id = ?, include_energy_cost = ?,
                    include_waste_cost = ?, delivery_days = ?, payment_terms = ?, notes = ?,
                    material_cost = ?, waste_cost = ?, energy_cost = ?, labor_cost = ?,
                    total_cost = ?, updated_at = ?
             WHERE id = ? AND tenant_id = ? AND deleted_at IS NULL",
        )
        .bind(&budget.name)
        .bind(&budget.description)
        .bind(budget.customer_id.0.to_string())
        .bind(budget.status.as_str())
        .bind(budget.machine_preset_id.map(|id| id.0.to_string()))
        .bind(budget.energy_preset_id.map(|id| id.0.to_string()))
        .bind(i64::from(budget.include_energy_cost))
        .bind(i64::from(budget.include_waste_cost))
        .bind(budget.delivery_days.map(i64::from))
        .bind(&budget.payment_terms)
        .bind(&budget.notes)
        .bind(budget.costs.material_cost)
        .bind(budget.costs.waste_cost)
        .bind(budget.costs.energy_cost)
        .bind(budget.costs.labor_cost)
        .bind(budget.costs.total_cost)
        .bind(budget.updated_at.to_rfc3339())
        .bind(budget.id.0.to_string())
        .bind(&budget.tenant_id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn soft_delete(
        &self,
        id: &BudgetId,
        tenant: &TenantId,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE budget SET deleted_at = ?, updated_at = ?
             WHERE id = ? AND tenant_id = ? AND deleted_at IS NULL",
        )
        .bind(deleted_at.to_rfc3339())
        .bind(deleted_at.to_rfc3339())
        .bind(id.0.to_string())
        .bind(&tenant.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(
        &self,
        tenant: &TenantId,
        page: Page,
    ) -> Result<(Vec<Budget>, u64), RepositoryError> {
        let total = sqlx::query(
            "SELECT COUNT(*) AS count FROM budget WHERE tenant_id = ? AND deleted_at IS NULL",
        )
        .bind(&tenant.0)
        .fetch_one(&self.pool)
        .await?
        .try_get::<i64, _>("count")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        let rows: Vec<SqliteRow> = sqlx::query(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budget
             WHERE tenant_id = ? AND deleted_at IS NULL
             ORDER BY created_at DESC, rowid DESC
             LIMIT ? OFFSET ?"
        ))
        .bind(&tenant.0)
        .bind(i64::from(page.size))
        .bind(i64::from(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        let budgets = rows.iter().map(row_to_budget).collect::<Result<Vec<_>, _>>()?;
        Ok((budgets, total as u64))
    }

    async fn list_by_customer(
        &self,
        customer_id: &CustomerId,
        tenant: &TenantId,
    ) -> Result<Vec<Budget>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budget
             WHERE customer_id = ? AND tenant_id = ? AND deleted_at IS NULL
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(customer_id.0.to_string())
        .bind(&tenant.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_budget).collect()
    }

    async fn add_item(&self, item: BudgetItem) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO budget_item (id, budget_id, tenant_id, product_name,
                                      product_description, product_quantity, product_dimensions,
                                      print_time_hours, print_time_minutes, cost_preset_id,
                                      additional_labor_cost, notes, position, material_cost,
                                      waste_cost, energy_cost, labor_cost, total_cost, unit_price,
                                      created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(item.id.0.to_string())
        .bind(item.budget_id.0.to_string())
        .bind(&item.tenant_id.0)
        .bind(&item.product_name)
        .bind(&item.product_description)
        .bind(i64::from(item.product_quantity))
        .bind(&item.product_dimensions)
        .bind(i64::from(item.print_time.hours))
        .bind(i64::from(item.print_time.minutes))
        .bind(item.cost_preset_id.map(|id| id.0.to_string()))
        .bind(item.additional_labor_cost)
        .bind(&item.notes)
        .bind(i64::from(item.position))
        .bind(item.costs.material_cost)
        .bind(item.costs.waste_cost)
        .bind(item.costs.energy_cost)
        .bind(item.costs.labor_cost)
        .bind(item.costs.total_cost)
        .bind(item.costs.unit_price)
        .bind(item.created_at.to_rfc3339())
        .bind(item.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_item(&self, item: BudgetItem) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE budget_item SET product_name = ?, product_description = ?,
                    product_quantity = ?, product_dimensions = ?, print_time_hours = ?,
                    print_time_minutes = ?, cost_preset_id = ?, additional_labor_cost = ?,
                    notes = ?, position = ?, material_cost = ?, waste_cost = ?, energy_cost = ?,
                    labor_cost = ?, total_cost = ?, unit_price = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&item.product_name)
        .bind(&item.product_description)
        .bind(i64::from(item.product_quantity))
        .bind(&item.product_dimensions)
        .bind(i64::from(item.print_time.hours))
        .bind(i64::from(item.print_time.minutes))
        .bind(item.cost_preset_id.map(|id| id.0.to_string()))
        .bind(item.additional_labor_cost)
        .bind(&item.notes)
        .bind(i64::from(item.position))
        .bind(item.costs.material_cost)
        .bind(item.costs.waste_cost)
        .bind(item.costs.energy_cost)
        .bind(item.costs.labor_cost)
        .bind(item.costs.total_cost)
        .bind(item.costs.unit_price)
        .bind(item.updated_at.to_rfc3339())
        .bind(item.id.0.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_item(&self, id: &BudgetItemId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM budget_item WHERE id = ?")
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_items(&self, budget_id: &BudgetId) -> Result<Vec<BudgetItem>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM budget_item
             WHERE budget_id = ?
             ORDER BY position ASC, created_at ASC, rowid ASC"
        ))
        .bind(budget_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    async fn delete_items(&self, budget_id: &BudgetId) -> Result<(), RepositoryError> {
        // FK cascade drops the usages with the items.
        sqlx::query("DELETE FROM budget_item WHERE budget_id = ?")
            .bind(budget_id.0.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_usage(&self, usage: MaterialUsage) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO material_usage (id, item_id, tenant_id, material_id, mass_grams,
                                         position, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(usage.id.0.to_string())
        .bind(usage.item_id.0.to_string())
        .bind(&usage.tenant_id.0)
        .bind(usage.material_id.0.to_string())
        .bind(usage.mass_grams.to_string())
        .bind(i64::from(usage.position))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_usage(&self, id: &MaterialUsageId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM material_usage WHERE id = ?")
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_usages(
        &self,
        item_id: &BudgetItemId,
    ) -> Result<Vec<MaterialUsage>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT id, item_id, tenant_id, material_id, mass_grams, position
             FROM material_usage
             WHERE item_id = ?
             ORDER BY position ASC, rowid ASC",
        )
        .bind(item_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_usage).collect()
    }

    async fn append_history(&self, entry: StatusHistoryEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO status_history (id, budget_id, previous_status, new_status,
                                         changed_by, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id.0.to_string())
        .bind(entry.budget_id.0.to_string())
        .bind(entry.previous_status.as_str())
        .bind(entry.new_status.as_str())
        .bind(&entry.changed_by.0)
        .bind(&entry.notes)
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_history(
        &self,
        budget_id: &BudgetId,
    ) -> Result<Vec<StatusHistoryEntry>, RepositoryError> {
        let rows: Vec<SqliteRow> = sqlx::query(
            "SELECT id, budget_id, previous_status, new_status, changed_by, notes, created_at
             FROM status_history
             WHERE budget_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(budget_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_history).collect()
    }
}
