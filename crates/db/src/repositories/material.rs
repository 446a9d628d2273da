use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use printquote_core::domain::reference::{Material, MaterialId};
use printquote_core::domain::TenantId;

use super::decode::{get_string, parse_decimal, parse_uuid};
use super::{MaterialRepository, RepositoryError};
use crate::DbPool;

pub struct SqlMaterialRepository {
    pool: DbPool,
}

impl SqlMaterialRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, material: Material) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO material (id, tenant_id, name, brand, price_per_kg,
                                   created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 brand = excluded.brand,
                 price_per_kg = excluded.price_per_kg,
                 updated_at = excluded.updated_at",
        )
        .bind(material.id.0.to_string())
        .bind(&material.tenant_id.0)
        .bind(&material.name)
        .bind(&material.brand)
        .bind(material.price_per_kg.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_material(row: &SqliteRow) -> Result<Material, RepositoryError> {
    Ok(Material {
        id: MaterialId(parse_uuid(row, "id")?),
        tenant_id: TenantId(get_string(row, "tenant_id")?),
        name: get_string(row, "name")?,
        brand: get_string(row, "brand")?,
        price_per_kg: parse_decimal(row, "price_per_kg")?,
    })
}

#[async_trait::async_trait]
impl MaterialRepository for SqlMaterialRepository {
    async fn find_by_id(
        &self,
        id: &MaterialId,
        tenant: &TenantId,
    ) -> Result<Option<Material>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, tenant_id, name, brand, price_per_kg
             FROM material WHERE id = ? AND tenant_id = ?",
        )
        .bind(id.0.to_string())
        .bind(&tenant.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_material(r)?)),
            None => Ok(None),
        }
    }
}
