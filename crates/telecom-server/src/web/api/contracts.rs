use crate::error::ApiError;
use crate::state::AppState;
use crate::web::api::middleware::AuthUser;
use crate::web::api::{ApiJson, ApiPath, respond};
use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use telecom_common::models::contract::{ContractStatus, ContractWithServices};
use telecom_common::validation::{
    ValidationErrors, parse_field, trimmed, validate_contract_status, validate_date,
};
use telecom_db::{ContractChanges, ContractRepo, ContractRow, ServiceRepo, ServiceRow};
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ContractRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(max = 255))]
    pub contract_number: Option<String>,
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_date"))]
    pub start_date: Option<String>,
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_contract_status"))]
    pub status: Option<String>,
}

impl ContractRequest {
    /// Typed form of a request that passed validation.
    fn into_changes(self) -> Result<ContractChanges, ValidationErrors> {
        Ok(ContractChanges {
            start_date: parse_field::<NaiveDate>("start_date", self.start_date.as_deref())?,
            status: parse_field::<ContractStatus>("status", self.status.as_deref())?,
            contract_number: self.contract_number,
        })
    }
}

/// Load the services of `rows` in one query and nest them under each contract.
pub async fn nest_services(
    pool: &PgPool,
    rows: Vec<ContractRow>,
) -> anyhow::Result<Vec<ContractWithServices>> {
    let ids: Vec<i64> = rows.iter().map(|c| c.id).collect();
    let services = ServiceRepo::list_by_contracts(pool, &ids)
        .await?
        .into_iter()
        .map(ServiceRow::into_service)
        .collect::<anyhow::Result<Vec<_>>>()?;
    let contracts = rows
        .into_iter()
        .map(ContractRow::into_contract)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(ContractWithServices::group(contracts, services))
}

async fn load_with_services(pool: &PgPool, row: ContractRow) -> Result<ContractWithServices, ApiError> {
    nest_services(pool, vec![row])
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("Contract"))
}

async fn find_contract(pool: &PgPool, id: i64) -> Result<ContractRow, ApiError> {
    ContractRepo::get(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Contract"))
}

/// Flag `contract_number` if another contract already uses it.
async fn check_number_free(
    pool: &PgPool,
    errors: &mut ValidationErrors,
    contract_number: Option<&str>,
    current_id: Option<i64>,
) -> Result<(), ApiError> {
    let Some(number) = contract_number else {
        return Ok(());
    };
    if let Some(existing) = ContractRepo::get_by_number(pool, number).await? {
        if Some(existing.id) != current_id {
            errors.add(
                "contract_number",
                "The contract number has already been taken.",
            );
        }
    }
    Ok(())
}

/// GET /api/contracts
#[tracing::instrument(skip(state))]
pub async fn list_contracts(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let rows = ContractRepo::list(&state.pool).await?;
    let contracts = nest_services(&state.pool, rows).await?;
    Ok(respond(StatusCode::OK, json!({ "data": contracts })))
}

/// POST /api/contract/create
///
/// The contract is owned by the caller. `status` defaults to `active`.
#[tracing::instrument(skip(state, auth, req), fields(user_id = auth.user_id()))]
pub async fn create_contract(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(req): ApiJson<ContractRequest>,
) -> Result<Response, ApiError> {
    let mut errors = ValidationErrors::from_result(req.validate());
    errors.require("contract_number", req.contract_number.is_some());
    errors.require("start_date", req.start_date.is_some());
    check_number_free(&state.pool, &mut errors, req.contract_number.as_deref(), None).await?;
    errors.into_result()?;

    let ContractChanges {
        contract_number: Some(contract_number),
        start_date: Some(start_date),
        status,
    } = req.into_changes()?
    else {
        return Err(ValidationErrors::single("body", "Incomplete contract").into());
    };
    let status = status.unwrap_or_default();

    let row = ContractRepo::create(
        &state.pool,
        auth.user_id(),
        &contract_number,
        start_date,
        status,
    )
    .await?;
    tracing::info!(contract_id = row.id, "Created contract");

    let contract = load_with_services(&state.pool, row).await?;
    Ok(respond(
        StatusCode::CREATED,
        json!({ "message": "Contract created successfully", "contract": contract }),
    ))
}

/// GET /api/contract/{id}
#[tracing::instrument(skip(state))]
pub async fn get_contract(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    let row = find_contract(&state.pool, id).await?;
    let contract = load_with_services(&state.pool, row).await?;
    Ok(respond(StatusCode::OK, json!({ "contract": contract })))
}

/// PUT /api/contract/{id}: every field required.
#[tracing::instrument(skip(state, auth, req), fields(user_id = auth.user_id()))]
pub async fn replace_contract(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ContractRequest>,
) -> Result<Response, ApiError> {
    find_contract(&state.pool, id).await?;

    let mut errors = ValidationErrors::from_result(req.validate());
    errors.require("contract_number", req.contract_number.is_some());
    errors.require("start_date", req.start_date.is_some());
    errors.require("status", req.status.is_some());
    check_number_free(&state.pool, &mut errors, req.contract_number.as_deref(), Some(id)).await?;
    errors.into_result()?;

    save(&state, id, &req.into_changes()?).await
}

/// PATCH /api/contract/{id}: any subset of fields.
#[tracing::instrument(skip(state, auth, req), fields(user_id = auth.user_id()))]
pub async fn patch_contract(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ContractRequest>,
) -> Result<Response, ApiError> {
    find_contract(&state.pool, id).await?;

    let mut errors = ValidationErrors::from_result(req.validate());
    check_number_free(&state.pool, &mut errors, req.contract_number.as_deref(), Some(id)).await?;
    errors.into_result()?;

    save(&state, id, &req.into_changes()?).await
}

async fn save(state: &AppState, id: i64, changes: &ContractChanges) -> Result<Response, ApiError> {
    let row = ContractRepo::update(&state.pool, id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Contract"))?;
    let contract = load_with_services(&state.pool, row).await?;
    Ok(respond(
        StatusCode::OK,
        json!({ "message": "Contract updated successfully", "contract": contract }),
    ))
}

/// DELETE /api/contract/{id}: its services go with it.
#[tracing::instrument(skip(state, auth), fields(user_id = auth.user_id()))]
pub async fn delete_contract(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    if !ContractRepo::delete(&state.pool, id).await? {
        return Err(ApiError::not_found("Contract"));
    }
    tracing::info!(contract_id = id, "Deleted contract");
    Ok(respond(
        StatusCode::OK,
        json!({ "message": "Contract deleted successfully" }),
    ))
}
