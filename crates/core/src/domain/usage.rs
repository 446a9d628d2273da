use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::item::BudgetItemId;
use crate::domain::reference::MaterialId;
use crate::domain::TenantId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialUsageId(pub Uuid);

/// One material consumed by one budget item. The mass covers the whole
/// item batch, not a single unit. `position` (>= 1) orders the materials
/// for multi-material sequencing; every position change past the first one
/// wastes material on the swap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialUsage {
    pub id: MaterialUsageId,
    pub item_id: BudgetItemId,
    pub tenant_id: TenantId,
    pub material_id: MaterialId,
    pub mass_grams: Decimal,
    pub position: u32,
}
