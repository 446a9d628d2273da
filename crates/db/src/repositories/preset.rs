use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use printquote_core::domain::reference::{Preset, PresetId, PresetKind};
use printquote_core::domain::TenantId;

use super::decode::{get_string, parse_decimal, parse_uuid};
use super::{PresetRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPresetRepository {
    pool: DbPool,
}

impl SqlPresetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, preset: Preset) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO preset (id, tenant_id, kind, name, value, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 kind = excluded.kind,
                 name = excluded.name,
                 value = excluded.value,
                 updated_at = excluded.updated_at",
        )
        .bind(preset.id.0.to_string())
        .bind(&preset.tenant_id.0)
        .bind(preset.kind.as_str())
        .bind(&preset.name)
        .bind(preset.value.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_preset(row: &SqliteRow) -> Result<Preset, RepositoryError> {
    let kind = get_string(row, "kind")?.parse::<PresetKind>().map_err(RepositoryError::Decode)?;
    Ok(Preset {
        id: PresetId(parse_uuid(row, "id")?),
        tenant_id: TenantId(get_string(row, "tenant_id")?),
        kind,
        name: get_string(row, "name")?,
        value: parse_decimal(row, "value")?,
    })
}

#[async_trait::async_trait]
impl PresetRepository for SqlPresetRepository {
    async fn find_by_id(
        &self,
        id: &PresetId,
        kind: PresetKind,
        tenant: &TenantId,
    ) -> Result<Option<Preset>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, tenant_id, kind, name, value
             FROM preset WHERE id = ? AND kind = ? AND tenant_id = ?",
        )
        .bind(id.0.to_string())
        .bind(kind.as_str())
        .bind(&tenant.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_preset(r)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use printquote_core::domain::reference::{Preset, PresetId, PresetKind};
    use printquote_core::domain::TenantId;

    use super::SqlPresetRepository;
    use crate::repositories::PresetRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn lookup_requires_the_matching_kind() {
        let pool = setup().await;
        let repo = SqlPresetRepository::new(pool);
        let preset = Preset {
            id: PresetId(Uuid::new_v4()),
            tenant_id: TenantId("org-a".to_string()),
            kind: PresetKind::Machine,
            name: "MK4 enclosure".to_string(),
            value: Decimal::from(180),
        };
        repo.save(preset.clone()).await.expect("save");

        let as_machine = repo
            .find_by_id(&preset.id, PresetKind::Machine, &TenantId("org-a".to_string()))
            .await
            .expect("find");
        assert_eq!(as_machine, Some(preset.clone()));

        let as_energy = repo
            .find_by_id(&preset.id, PresetKind::Energy, &TenantId("org-a".to_string()))
            .await
            .expect("find");
        assert_eq!(as_energy, None);
    }
}
