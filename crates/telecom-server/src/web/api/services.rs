use crate::error::ApiError;
use crate::state::AppState;
use crate::web::api::middleware::AuthUser;
use crate::web::api::{ApiJson, ApiPath, respond};
use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use telecom_common::models::service::ServiceType;
use telecom_common::money::Money;
use telecom_common::validation::{ValidationErrors, parse_field, trimmed, validate_service_type};
use telecom_db::{ContractRepo, ServiceChanges, ServiceRepo, ServiceRow};
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ServiceRequest {
    #[validate(range(min = 1))]
    pub contract_id: Option<i64>,
    #[serde(rename = "type", deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_service_type"))]
    pub service_type: Option<String>,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(max = 255))]
    pub plan_name: Option<String>,
    pub price: Option<Money>,
}

impl ServiceRequest {
    /// Format rules, plus presence of every field when `all_required`.
    fn check(&self, all_required: bool) -> ValidationErrors {
        let mut errors = ValidationErrors::from_result(self.validate());
        if all_required {
            errors.require("contract_id", self.contract_id.is_some());
            errors.require("type", self.service_type.is_some());
            errors.require("plan_name", self.plan_name.is_some());
            errors.require("price", self.price.is_some());
        }
        errors
    }

    /// Typed form of a request that passed validation.
    fn into_changes(self) -> Result<ServiceChanges, ValidationErrors> {
        Ok(ServiceChanges {
            contract_id: self.contract_id,
            service_type: parse_field::<ServiceType>("type", self.service_type.as_deref())?,
            plan_name: self.plan_name,
            price: self.price,
        })
    }
}

async fn find_service(pool: &PgPool, id: i64) -> Result<ServiceRow, ApiError> {
    ServiceRepo::get(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Service"))
}

/// Flag `contract_id` unless it names an existing contract.
async fn check_contract_exists(
    pool: &PgPool,
    errors: &mut ValidationErrors,
    contract_id: Option<i64>,
) -> Result<(), ApiError> {
    if let Some(id) = contract_id {
        if ContractRepo::get(pool, id).await?.is_none() {
            errors.add("contract_id", "The selected contract id is invalid.");
        }
    }
    Ok(())
}

/// GET /api/services
#[tracing::instrument(skip(state))]
pub async fn list_services(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let services = ServiceRepo::list(&state.pool)
        .await?
        .into_iter()
        .map(ServiceRow::into_service)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(respond(StatusCode::OK, json!({ "data": services })))
}

/// POST /api/service/create
#[tracing::instrument(skip(state, auth, req), fields(user_id = auth.user_id()))]
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(req): ApiJson<ServiceRequest>,
) -> Result<Response, ApiError> {
    let mut errors = req.check(true);
    check_contract_exists(&state.pool, &mut errors, req.contract_id).await?;
    errors.into_result()?;

    let ServiceChanges {
        contract_id: Some(contract_id),
        service_type: Some(service_type),
        plan_name: Some(plan_name),
        price: Some(price),
    } = req.into_changes()?
    else {
        return Err(ValidationErrors::single("body", "Incomplete service").into());
    };

    let row = ServiceRepo::create(&state.pool, contract_id, service_type, &plan_name, price).await?;
    tracing::info!(service_id = row.id, contract_id, "Created service");

    let service = row.into_service()?;
    Ok(respond(
        StatusCode::CREATED,
        json!({ "message": "Service created successfully", "service": service }),
    ))
}

/// GET /api/service/{id}
#[tracing::instrument(skip(state))]
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    let service = find_service(&state.pool, id).await?.into_service()?;
    Ok(respond(StatusCode::OK, json!({ "service": service })))
}

/// PUT /api/service/{id}: every field required.
#[tracing::instrument(skip(state, auth, req), fields(user_id = auth.user_id()))]
pub async fn replace_service(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ServiceRequest>,
) -> Result<Response, ApiError> {
    find_service(&state.pool, id).await?;

    let mut errors = req.check(true);
    check_contract_exists(&state.pool, &mut errors, req.contract_id).await?;
    errors.into_result()?;

    save(&state, id, &req.into_changes()?).await
}

/// PATCH /api/service/{id}: any subset of fields.
#[tracing::instrument(skip(state, auth, req), fields(user_id = auth.user_id()))]
pub async fn patch_service(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ServiceRequest>,
) -> Result<Response, ApiError> {
    find_service(&state.pool, id).await?;

    let mut errors = req.check(false);
    check_contract_exists(&state.pool, &mut errors, req.contract_id).await?;
    errors.into_result()?;

    save(&state, id, &req.into_changes()?).await
}

async fn save(state: &AppState, id: i64, changes: &ServiceChanges) -> Result<Response, ApiError> {
    let service = ServiceRepo::update(&state.pool, id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Service"))?
        .into_service()?;
    Ok(respond(
        StatusCode::OK,
        json!({ "message": "Service updated successfully", "service": service }),
    ))
}

/// DELETE /api/service/{id}
#[tracing::instrument(skip(state, auth), fields(user_id = auth.user_id()))]
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    if !ServiceRepo::delete(&state.pool, id).await? {
        return Err(ApiError::not_found("Service"));
    }
    tracing::info!(service_id = id, "Deleted service");
    Ok(respond(
        StatusCode::OK,
        json!({ "message": "Service deleted successfully" }),
    ))
}
