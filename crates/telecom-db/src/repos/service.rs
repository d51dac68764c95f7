use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use telecom_common::models::service::{Service, ServiceType};
use telecom_common::money::Money;

const SERVICE_COLUMNS: &str =
    "id, contract_id, service_type, plan_name, price_cents, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: i64,
    pub contract_id: i64,
    pub service_type: String,
    pub plan_name: String,
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRow {
    pub fn into_service(self) -> Result<Service> {
        let service_type: ServiceType = self
            .service_type
            .parse()
            .with_context(|| format!("Service {} has an invalid stored type", self.id))?;
        Ok(Service {
            id: self.id,
            contract_id: self.contract_id,
            service_type,
            plan_name: self.plan_name,
            price: Money::from_cents(self.price_cents),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Fields to overwrite on update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ServiceChanges {
    pub contract_id: Option<i64>,
    pub service_type: Option<ServiceType>,
    pub plan_name: Option<String>,
    pub price: Option<Money>,
}

pub struct ServiceRepo;

impl ServiceRepo {
    pub async fn create(
        pool: &PgPool,
        contract_id: i64,
        service_type: ServiceType,
        plan_name: &str,
        price: Money,
    ) -> Result<ServiceRow> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            "INSERT INTO services (contract_id, service_type, plan_name, price_cents) VALUES ($1, $2, $3, $4) RETURNING {SERVICE_COLUMNS}"
        ))
        .bind(contract_id)
        .bind(service_type.as_str())
        .bind(plan_name)
        .bind(price.cents())
        .fetch_one(pool)
        .await
        .context("Failed to create service")?;
        Ok(row)
    }

    pub async fn get(pool: &PgPool, id: i64) -> Result<Option<ServiceRow>> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get service")?;
        Ok(row)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<ServiceRow>> {
        let rows = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services ORDER BY id"
        ))
        .fetch_all(pool)
        .await
        .context("Failed to list services")?;
        Ok(rows)
    }

    pub async fn list_by_contract(pool: &PgPool, contract_id: i64) -> Result<Vec<ServiceRow>> {
        Self::list_by_contracts(pool, &[contract_id]).await
    }

    /// Services of any of the given contracts, for nesting in one round trip.
    pub async fn list_by_contracts(pool: &PgPool, contract_ids: &[i64]) -> Result<Vec<ServiceRow>> {
        if contract_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE contract_id = ANY($1) ORDER BY id"
        ))
        .bind(contract_ids)
        .fetch_all(pool)
        .await
        .context("Failed to list services for contracts")?;
        Ok(rows)
    }

    pub async fn update(
        pool: &PgPool,
        id: i64,
        changes: &ServiceChanges,
    ) -> Result<Option<ServiceRow>> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            r#"UPDATE services SET
                contract_id = COALESCE($2, contract_id),
                service_type = COALESCE($3, service_type),
                plan_name = COALESCE($4, plan_name),
                price_cents = COALESCE($5, price_cents),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SERVICE_COLUMNS}"#
        ))
        .bind(id)
        .bind(changes.contract_id)
        .bind(changes.service_type.map(|t| t.as_str()))
        .bind(changes.plan_name.as_deref())
        .bind(changes.price.map(|p| p.cents()))
        .fetch_optional(pool)
        .await
        .context("Failed to update service")?;
        Ok(row)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete service")?;
        Ok(result.rows_affected() > 0)
    }
}
