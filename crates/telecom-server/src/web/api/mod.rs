pub mod auth;
pub mod contracts;
pub mod middleware;
pub mod services;
pub mod users;

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::get, routing::post};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use telecom_common::validation::ValidationErrors;

/// `Json<T>` whose rejection uses the API error envelope instead of
/// axum's plain-text response.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::Validation(ValidationErrors::single("body", rejection.body_text()))
}

/// `Path<T>` with the same treatment: a malformed id is reported on the
/// `id` field instead of as plain text.
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => Err(path_rejection(rejection)),
        }
    }
}

fn path_rejection(rejection: PathRejection) -> ApiError {
    ApiError::Validation(ValidationErrors::single("id", rejection.body_text()))
}

/// Wrap a JSON object in the success envelope (`success`, `status`).
pub fn respond(status: StatusCode, mut body: Value) -> Response {
    if let Value::Object(map) = &mut body {
        map.insert("success".to_string(), Value::Bool(true));
        map.insert("status".to_string(), json!(status.as_u16()));
    }
    (status, Json(body)).into_response()
}

/// GET /api/health
async fn health() -> Response {
    respond(StatusCode::OK, json!({"message": "ok"}))
}

pub fn build_api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // Session
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout))
        .route("/refresh", post(auth::refresh))
        // Users
        .route("/users", get(users::list_users))
        .route("/user/create", post(users::create_user))
        .route(
            "/user/{id}",
            get(users::get_user)
                .put(users::replace_user)
                .patch(users::patch_user)
                .delete(users::delete_user),
        )
        .route(
            "/profile/{id}",
            get(users::get_profile).put(users::update_profile),
        )
        // Contracts
        .route("/contracts", get(contracts::list_contracts))
        .route("/contract/create", post(contracts::create_contract))
        .route(
            "/contract/{id}",
            get(contracts::get_contract)
                .put(contracts::replace_contract)
                .patch(contracts::patch_contract)
                .delete(contracts::delete_contract),
        )
        // Services
        .route("/services", get(services::list_services))
        .route("/service/create", post(services::create_service))
        .route(
            "/service/{id}",
            get(services::get_service)
                .put(services::replace_service)
                .patch(services::patch_service)
                .delete(services::delete_service),
        )
        .with_state(state)
}
