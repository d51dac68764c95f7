//! The error taxonomy every API handler returns, and its JSON envelope.

use crate::auth::TokenError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use telecom_common::validation::ValidationErrors;
use telecom_db::{ConstraintViolation, constraint_violation};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error")]
    Validation(ValidationErrors),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Server error")]
    Server(anyhow::Error),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    /// `"{resource} not found"`
    pub fn not_found(resource: &str) -> Self {
        ApiError::NotFound(format!("{resource} not found"))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = json!({
            "success": false,
            "message": self.to_string(),
            "status": status.as_u16(),
        });
        match self {
            ApiError::Validation(errors) => body["errors"] = json!(errors),
            ApiError::Server(e) => {
                tracing::error!("Request failed: {:#}", e);
                body["error"] = json!(e.to_string());
            }
            _ => {}
        }
        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        tracing::debug!("Rejected bearer token: {}", e);
        ApiError::Unauthorized("Unauthorized".to_string())
    }
}

/// Store errors become 500s, except constraint violations caused by the
/// request itself (a taken email, a dangling `contract_id`), which are 400s.
impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match constraint_violation(&e) {
            Some(ConstraintViolation::Unique(constraint)) => {
                let field = constraint_field(constraint.as_deref(), "_key");
                ApiError::Validation(ValidationErrors::single(
                    &field,
                    format!("The {field} has already been taken."),
                ))
            }
            Some(ConstraintViolation::ForeignKey(constraint)) => {
                let field = constraint_field(constraint.as_deref(), "_fkey");
                ApiError::Validation(ValidationErrors::single(
                    &field,
                    format!("The selected {field} is invalid."),
                ))
            }
            None => ApiError::Server(e),
        }
    }
}

/// Tables whose constraints can surface through a request.
const TABLES: &[&str] = &["revoked_tokens", "contracts", "services", "users"];

/// Recover the column from Postgres' default constraint naming,
/// `{table}_{column}_key` / `{table}_{column}_fkey`.
fn constraint_field(constraint: Option<&str>, suffix: &str) -> String {
    constraint
        .and_then(|c| c.strip_suffix(suffix))
        .and_then(|c| {
            TABLES
                .iter()
                .find_map(|table| c.strip_prefix(table)?.strip_prefix('_'))
        })
        .filter(|column| !column.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "id".to_string())
}
