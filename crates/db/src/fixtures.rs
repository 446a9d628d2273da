//! Seed data for integration tests and local development databases.

use rust_decimal::Decimal;
use uuid::Uuid;

use printquote_core::domain::reference::{
    CompanyProfile, Customer, CustomerId, Material, MaterialId, Preset, PresetId, PresetKind,
};
use printquote_core::domain::TenantId;

use crate::repositories::{
    RepositoryError, SqlCompanyRepository, SqlCustomerRepository, SqlMaterialRepository,
    SqlPresetRepository,
};
use crate::DbPool;

/// Identifiers of a freshly seeded reference catalog for one tenant:
/// a customer, two materials with distinct prices, and one preset of each
/// kind.
#[derive(Clone, Debug)]
pub struct SeedCatalog {
    pub tenant: TenantId,
    pub customer_id: CustomerId,
    pub pla_id: MaterialId,
    pub petg_id: MaterialId,
    pub machine_preset_id: PresetId,
    pub energy_preset_id: PresetId,
    pub cost_preset_id: PresetId,
}

impl SeedCatalog {
    pub async fn seed(pool: &DbPool, tenant: &str) -> Result<Self, RepositoryError> {
        let tenant = TenantId(tenant.to_string());

        let customers = SqlCustomerRepository::new(pool.clone());
        let customer_id = CustomerId(Uuid::new_v4());
        customers
            .save(Customer {
                id: customer_id,
                tenant_id: tenant.clone(),
                name: "Atelier Miniaturas".to_string(),
                email: Some("contact@atelier.example".to_string()),
                phone: Some("+55 11 90000-0000".to_string()),
                document: None,
            })
            .await?;

        let materials = SqlMaterialRepository::new(pool.clone());
        let pla_id = MaterialId(Uuid::new_v4());
        materials
            .save(Material {
                id: pla_id,
                tenant_id: tenant.clone(),
                name: "PLA Matte Black".to_string(),
                brand: "Polymaker".to_string(),
                price_per_kg: Decimal::from(20),
            })
            .await?;
        let petg_id = MaterialId(Uuid::new_v4());
        materials
            .save(Material {
                id: petg_id,
                tenant_id: tenant.clone(),
                name: "PETG Clear".to_string(),
                brand: "Prusament".to_string(),
                price_per_kg: Decimal::from(30),
            })
            .await?;

        let presets = SqlPresetRepository::new(pool.clone());
        let machine_preset_id = PresetId(Uuid::new_v4());
        presets
            .save(Preset {
                id: machine_preset_id,
                tenant_id: tenant.clone(),
                kind: PresetKind::Machine,
                name: "X1 Carbon".to_string(),
                value: Decimal::from(150),
            })
            .await?;
        let energy_preset_id = PresetId(Uuid::new_v4());
        presets
            .save(Preset {
                id: energy_preset_id,
                tenant_id: tenant.clone(),
                kind: PresetKind::Energy,
                name: "Residential tariff".to_string(),
                value: Decimal::new(92, 2),
            })
            .await?;
        let cost_preset_id = PresetId(Uuid::new_v4());
        presets
            .save(Preset {
                id: cost_preset_id,
                tenant_id: tenant.clone(),
                kind: PresetKind::Cost,
                name: "Standard labor".to_string(),
                value: Decimal::from(40),
            })
            .await?;

        let companies = SqlCompanyRepository::new(pool.clone());
        companies
            .save(CompanyProfile {
                tenant_id: tenant.clone(),
                name: "Atelier Miniaturas LTDA".to_string(),
                email: Some("billing@atelier.example".to_string()),
                phone: None,
                website: Some("https://atelier.example".to_string()),
                logo_url: None,
            })
            .await?;

        Ok(Self {
            tenant,
            customer_id,
            pla_id,
            petg_id,
            machine_preset_id,
            energy_preset_id,
            cost_preset_id,
        })
    }
}
