//! Contract tests for the SQLite budget repository: tenant scoping,
//! soft-delete visibility, ownership cascades and history ordering.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use printquote_core::domain::budget::{Budget, BudgetId, CostBreakdown, Lifecycle};
use printquote_core::domain::item::{BudgetItem, BudgetItemId, ItemCostBreakdown, PrintTime};
use printquote_core::domain::usage::{MaterialUsage, MaterialUsageId};
use printquote_core::domain::{ActorId, TenantId};
use printquote_core::workflow::{Status, StatusHistoryEntry};
use printquote_db::repositories::{BudgetRepository, Page, SqlBudgetRepository};
use printquote_db::{connect_with_settings, migrations, SeedCatalog};

async fn setup() -> (sqlx::SqlitePool, SeedCatalog) {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    let catalog = SeedCatalog::seed(&pool, "org-a").await.expect("seed");
    (pool, catalog)
}

fn budget(catalog: &SeedCatalog, name: &str) -> Budget {
    let now = Utc::now();
    Budget {
        id: BudgetId(Uuid::new_v4()),
        tenant_id: catalog.tenant.clone(),
        name: name.to_string(),
        description: "batch of figurines".to_string(),
        customer_id: catalog.customer_id,
        status: Status::Draft,
        machine_preset_id: Some(catalog.machine_preset_id),
        energy_preset_id: Some(catalog.energy_preset_id),
        include_energy_cost: true,
        include_waste_cost: true,
        delivery_days: Some(10),
        payment_terms: Some("50% upfront".to_string()),
        notes: None,
        costs: CostBreakdown::default(),
        lifecycle: Lifecycle::Active,
        created_at: now,
        updated_at: now,
    }
}

fn item(catalog: &SeedCatalog, budget_id: BudgetId, position: u32) -> BudgetItem {
    let now = Utc::now();
    BudgetItem {
        id: BudgetItemId(Uuid::new_v4()),
        budget_id,
        tenant_id: catalog.tenant.clone(),
        product_name: format!("Product {position}"),
        product_description: None,
        product_quantity: 2,
        product_dimensions: Some("120x80x40mm".to_string()),
        print_time: PrintTime::new(3, 20),
        cost_preset_id: Some(catalog.cost_preset_id),
        additional_labor_cost: 250,
        notes: None,
        position,
        costs: ItemCostBreakdown::default(),
        created_at: now,
        updated_at: now,
    }
}

fn usage(catalog: &SeedCatalog, item_id: BudgetItemId, position: u32) -> MaterialUsage {
    MaterialUsage {
        id: MaterialUsageId(Uuid::new_v4()),
        item_id,
        tenant_id: catalog.tenant.clone(),
        material_id: if position == 1 { catalog.pla_id } else { catalog.petg_id },
        mass_grams: Decimal::new(3_125, 1),
        position,
    }
}

#[tokio::test]
async fn budget_round_trips_with_every_field() {
    let (pool, catalog) = setup().await;
    let repo = SqlBudgetRepository::new(pool);

    let stored = budget(&catalog, "Round trip");
    repo.create(stored.clone()).await.expect("create");

    let found = repo
        .find_by_id(&stored.id, &catalog.tenant)
        .await
        .expect("find")
        .expect("budget exists");

    assert_eq!(found.name, stored.name);
    assert_eq!(found.customer_id, stored.customer_id);
    assert_eq!(found.machine_preset_id, stored.machine_preset_id);
    assert_eq!(found.delivery_days, Some(10));
    assert!(found.include_energy_cost);
    assert_eq!(found.status, Status::Draft);
    assert_eq!(found.lifecycle, Lifecycle::Active);
}

#[tokio::test]
async fn cross_tenant_lookup_comes_back_empty() {
    let (pool, catalog) = setup().await;
    let repo = SqlBudgetRepository::new(pool);

    let stored = budget(&catalog, "Tenant scoped");
    repo.create(stored.clone()).await.expect("create");

    let other = repo
        .find_by_id(&stored.id, &TenantId("org-b".to_string()))
        .await
        .expect("find");
    assert_eq!(other, None);
}

#[tokio::test]
async fn soft_deleted_budgets_vanish_from_find_and_list() {
    let (pool, catalog) = setup().await;
    let repo = SqlBudgetRepository::new(pool);

    let stored = budget(&catalog, "Doomed");
    repo.create(stored.clone()).await.expect("create");
    repo.soft_delete(&stored.id, &catalog.tenant, Utc::now()).await.expect("delete");

    assert_eq!(repo.find_by_id(&stored.id, &catalog.tenant).await.expect("find"), None);
    let (rows, total) = repo.list(&catalog.tenant, Page::new(1, 10)).await.expect("list");
    assert!(rows.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn update_persists_status_and_costs() {
    let (pool, catalog) = setup().await;
    let repo = SqlBudgetRepository::new(pool);

    let mut stored = budget(&catalog, "Updated");
    repo.create(stored.clone()).await.expect("create");

    stored.status = Status::Sent;
    stored.costs = CostBreakdown {
        material_cost: 600,
        waste_cost: 37,
        energy_cost: 20,
        labor_cost: 13_000,
        total_cost: 13_657,
    };
    stored.updated_at = Utc::now();
    repo.update(stored.clone()).await.expect("update");

    let found = repo
        .find_by_id(&stored.id, &catalog.tenant)
        .await
        .expect("find")
        .expect("budget exists");
    assert_eq!(found.status, Status::Sent);
    assert_eq!(found.costs.total_cost, 13_657);
}

#[tokio::test]
async fn items_and_usages_follow_their_positions() {
    let (pool, catalog) = setup().await;
    let repo = SqlBudgetRepository::new(pool);

    let stored = budget(&catalog, "Ordered");
    repo.create(stored.clone()).await.expect("create");

    let second = item(&catalog, stored.id, 2);
    let first = item(&catalog, stored.id, 1);
    repo.add_item(second.clone()).await.expect("add second");
    repo.add_item(first.clone()).await.expect("add first");

    repo.add_usage(usage(&catalog, first.id, 2)).await.expect("usage 2");
    repo.add_usage(usage(&catalog, first.id, 1)).await.expect("usage 1");

    let items = repo.list_items(&stored.id).await.expect("list items");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, first.id);
    assert_eq!(items[1].id, second.id);

    let usages = repo.list_usages(&first.id).await.expect("list usages");
    assert_eq!(usages.len(), 2);
    assert_eq!(usages[0].position, 1);
    assert_eq!(usages[0].material_id, catalog.pla_id);
    assert_eq!(usages[0].mass_grams, Decimal::new(3_125, 1));
}

#[tokio::test]
async fn deleting_items_cascades_to_their_usages() {
    let (pool, catalog) = setup().await;
    let repo = SqlBudgetRepository::new(pool);

    let stored = budget(&catalog, "Cascade");
    repo.create(stored.clone()).await.expect("create");
    let owned = item(&catalog, stored.id, 1);
    repo.add_item(owned.clone()).await.expect("add item");
    repo.add_usage(usage(&catalog, owned.id, 1)).await.expect("add usage");

    repo.delete_items(&stored.id).await.expect("delete items");

    assert!(repo.list_items(&stored.id).await.expect("items").is_empty());
    assert!(repo.list_usages(&owned.id).await.expect("usages").is_empty());
}

#[tokio::test]
async fn single_items_and_usages_can_be_removed() {
    let (pool, catalog) = setup().await;
    let repo = SqlBudgetRepository::new(pool);

    let stored = budget(&catalog, "Trimmed");
    repo.create(stored.clone()).await.expect("create");
    let kept = item(&catalog, stored.id, 1);
    let removed = item(&catalog, stored.id, 2);
    repo.add_item(kept.clone()).await.expect("add kept");
    repo.add_item(removed.clone()).await.expect("add removed");

    let kept_usage = usage(&catalog, kept.id, 1);
    let dropped_usage = usage(&catalog, kept.id, 2);
    repo.add_usage(kept_usage.clone()).await.expect("add kept usage");
    repo.add_usage(dropped_usage.clone()).await.expect("add dropped usage");

    repo.remove_item(&removed.id).await.expect("remove item");
    repo.remove_usage(&dropped_usage.id).await.expect("remove usage");

    let items = repo.list_items(&stored.id).await.expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, kept.id);

    let usages = repo.list_usages(&kept.id).await.expect("usages");
    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0].id, kept_usage.id);
}

#[tokio::test]
async fn item_cost_update_round_trips() {
    let (pool, catalog) = setup().await;
    let repo = SqlBudgetRepository::new(pool);

    let stored = budget(&catalog, "Costed");
    repo.create(stored.clone()).await.expect("create");
    let mut owned = item(&catalog, stored.id, 1);
    repo.add_item(owned.clone()).await.expect("add item");

    owned.costs = ItemCostBreakdown {
        material_cost: 600,
        waste_cost: 0,
        energy_cost: 20,
        labor_cost: 250,
        total_cost: 870,
        unit_price: 435,
    };
    owned.updated_at = Utc::now();
    repo.update_item(owned.clone()).await.expect("update item");

    let items = repo.list_items(&stored.id).await.expect("list items");
    assert_eq!(items[0].costs.total_cost, 870);
    assert_eq!(items[0].costs.unit_price, 435);
}

#[tokio::test]
async fn history_appends_in_chronological_order() {
    let (pool, catalog) = setup().await;
    let repo = SqlBudgetRepository::new(pool);

    let stored = budget(&catalog, "Audited");
    repo.create(stored.clone()).await.expect("create");

    let base = Utc::now();
    let transitions =
        [(Status::Draft, Status::Sent), (Status::Sent, Status::Approved)];
    for (index, (from, to)) in transitions.iter().enumerate() {
        repo.append_history(StatusHistoryEntry::new(
            stored.id,
            *from,
            *to,
            ActorId("u-ops".to_string()),
            None,
            base + Duration::seconds(index as i64),
        ))
        .await
        .expect("append");
    }

    let history = repo.list_history(&stored.id).await.expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].previous_status, Status::Draft);
    assert_eq!(history[0].new_status, Status::Sent);
    assert_eq!(history[1].new_status, Status::Approved);
}

#[tokio::test]
async fn list_paginates_with_stable_totals() {
    let (pool, catalog) = setup().await;
    let repo = SqlBudgetRepository::new(pool);

    for index in 0..5 {
        repo.create(budget(&catalog, &format!("Budget {index}"))).await.expect("create");
    }

    let (first_page, total) = repo.list(&catalog.tenant, Page::new(1, 2)).await.expect("page 1");
    assert_eq!(first_page.len(), 2);
    assert_eq!(total, 5);

    let (last_page, total) = repo.list(&catalog.tenant, Page::new(3, 2)).await.expect("page 3");
    assert_eq!(last_page.len(), 1);
    assert_eq!(total, 5);
}

#[tokio::test]
async fn list_by_customer_filters_on_both_keys() {
    let (pool, catalog) = setup().await;
    let repo = SqlBudgetRepository::new(pool);

    repo.create(budget(&catalog, "For customer")).await.expect("create");

    let rows = repo
        .list_by_customer(&catalog.customer_id, &catalog.tenant)
        .await
        .expect("list");
    assert_eq!(rows.len(), 1);

    let rows = repo
        .list_by_customer(&catalog.customer_id, &TenantId("org-b".to_string()))
        .await
        .expect("list");
    assert!(rows.is_empty());
}
