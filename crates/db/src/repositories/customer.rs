use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use printquote_core::domain::reference::{Customer, CustomerId};
use printquote_core::domain::TenantId;

use super::decode::{get_opt_string, get_string, parse_uuid};
use super::{CustomerRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Upsert used by seeding and by the customer feature that owns this
    /// table; the budget engine itself only reads.
    pub async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO customer (id, tenant_id, name, email, phone, document,
                                   created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 email = excluded.email,
                 phone = excluded.phone,
                 document = excluded.document,
                 updated_at = excluded.updated_at",
        )
        .bind(customer.id.0.to_string())
        .bind(&customer.tenant_id.0)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.document)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_customer(row: &SqliteRow) -> Result<Customer, RepositoryError> {
    Ok(Customer {
        id: CustomerId(parse_uuid(row, "id")?),
        tenant_id: TenantId(get_string(row, "tenant_id")?),
        name: get_string(row, "name")?,
        email: get_opt_string(row, "email")?,
        phone: get_opt_string(row, "phone")?,
        document: get_opt_string(row, "document")?,
    })
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn find_by_id(
        &self,
        id: &CustomerId,
        tenant: &TenantId,
    ) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, tenant_id, name, email, phone, document
             FROM customer WHERE id = ? AND tenant_id = ?",
        )
        .bind(id.0.to_string())
        .bind(&tenant.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_customer(r)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use printquote_core::domain::reference::{Customer, CustomerId};
    use printquote_core::domain::TenantId;

    use super::SqlCustomerRepository;
    use crate::repositories::CustomerRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn lookup_is_tenant_scoped() {
        let pool = setup().await;
        let repo = SqlCustomerRepository::new(pool);
        let customer = Customer {
            id: CustomerId(Uuid::new_v4()),
            tenant_id: TenantId("org-a".to_string()),
            name: "Flavia Prints".to_string(),
            email: Some("flavia@example.com".to_string()),
            phone: None,
            document: None,
        };
        repo.save(customer.clone()).await.expect("save");

        let same_tenant = repo
            .find_by_id(&customer.id, &TenantId("org-a".to_string()))
            .await
            .expect("find");
        assert_eq!(same_tenant, Some(customer.clone()));

        let other_tenant = repo
            .find_by_id(&customer.id, &TenantId("org-b".to_string()))
            .await
            .expect("find");
        assert_eq!(other_tenant, None);
    }
}
