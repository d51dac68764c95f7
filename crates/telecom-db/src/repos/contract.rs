use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use telecom_common::models::contract::{Contract, ContractStatus};

const CONTRACT_COLUMNS: &str =
    "id, user_id, contract_number, start_date, status, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContractRow {
    pub id: i64,
    pub user_id: i64,
    pub contract_number: String,
    pub start_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContractRow {
    pub fn into_contract(self) -> Result<Contract> {
        let status: ContractStatus = self
            .status
            .parse()
            .with_context(|| format!("Contract {} has an invalid stored status", self.id))?;
        Ok(Contract {
            id: self.id,
            user_id: self.user_id,
            contract_number: self.contract_number,
            start_date: self.start_date,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Fields to overwrite on update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ContractChanges {
    pub contract_number: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub status: Option<ContractStatus>,
}

pub struct ContractRepo;

impl ContractRepo {
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        contract_number: &str,
        start_date: NaiveDate,
        status: ContractStatus,
    ) -> Result<ContractRow> {
        let row = sqlx::query_as::<_, ContractRow>(&format!(
            "INSERT INTO contracts (user_id, contract_number, start_date, status) VALUES ($1, $2, $3, $4) RETURNING {CONTRACT_COLUMNS}"
        ))
        .bind(user_id)
        .bind(contract_number)
        .bind(start_date)
        .bind(status.as_str())
        .fetch_one(pool)
        .await
        .context("Failed to create contract")?;
        Ok(row)
    }

    pub async fn get(pool: &PgPool, id: i64) -> Result<Option<ContractRow>> {
        let row = sqlx::query_as::<_, ContractRow>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get contract")?;
        Ok(row)
    }

    pub async fn get_by_number(pool: &PgPool, contract_number: &str) -> Result<Option<ContractRow>> {
        let row = sqlx::query_as::<_, ContractRow>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE contract_number = $1"
        ))
        .bind(contract_number)
        .fetch_optional(pool)
        .await
        .context("Failed to get contract by number")?;
        Ok(row)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<ContractRow>> {
        let rows = sqlx::query_as::<_, ContractRow>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts ORDER BY id"
        ))
        .fetch_all(pool)
        .await
        .context("Failed to list contracts")?;
        Ok(rows)
    }

    pub async fn list_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<ContractRow>> {
        let rows = sqlx::query_as::<_, ContractRow>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list contracts for user")?;
        Ok(rows)
    }

    pub async fn update(
        pool: &PgPool,
        id: i64,
        changes: &ContractChanges,
    ) -> Result<Option<ContractRow>> {
        let row = sqlx::query_as::<_, ContractRow>(&format!(
            r#"UPDATE contracts SET
                contract_number = COALESCE($2, contract_number),
                start_date = COALESCE($3, start_date),
                status = COALESCE($4, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CONTRACT_COLUMNS}"#
        ))
        .bind(id)
        .bind(changes.contract_number.as_deref())
        .bind(changes.start_date)
        .bind(changes.status.map(|s| s.as_str()))
        .fetch_optional(pool)
        .await
        .context("Failed to update contract")?;
        Ok(row)
    }

    /// Delete a contract; its services are removed by the cascade.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contracts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete contract")?;
        Ok(result.rows_affected() > 0)
    }
}
