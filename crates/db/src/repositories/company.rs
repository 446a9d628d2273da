use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use printquote_core::domain::reference::CompanyProfile;
use printquote_core::domain::TenantId;

use super::decode::{get_opt_string, get_string};
use super::{CompanyRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCompanyRepository {
    pool: DbPool,
}

impl SqlCompanyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, profile: CompanyProfile) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO company (tenant_id, name, email, phone, website, logo_url,
                                  created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(tenant_id) DO UPDATE SET
                 name = excluded.name,
                 email = excluded.email,
                 phone = excluded.phone,
                 website = excluded.website,
                 logo_url = excluded.logo_url,
                 updated_at = excluded.updated_at",
        )
        .bind(&profile.tenant_id.0)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(&profile.website)
        .bind(&profile.logo_url)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_profile(row: &SqliteRow) -> Result<CompanyProfile, RepositoryError> {
    Ok(CompanyProfile {
        tenant_id: TenantId(get_string(row, "tenant_id")?),
        name: get_string(row, "name")?,
        email: get_opt_string(row, "email")?,
        phone: get_opt_string(row, "phone")?,
        website: get_opt_string(row, "website")?,
        logo_url: get_opt_string(row, "logo_url")?,
    })
}

#[async_trait::async_trait]
impl CompanyRepository for SqlCompanyRepository {
    async fn find_by_tenant(
        &self,
        tenant: &TenantId,
    ) -> Result<Option<CompanyProfile>, RepositoryError> {
        let row = sqlx::query(
            "SELECT tenant_id, name, email, phone, website, logo_url
             FROM company WHERE tenant_id = ?",
        )
        .bind(&tenant.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_profile(r)?)),
            None => Ok(None),
        }
    }
}
