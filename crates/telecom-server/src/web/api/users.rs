use crate::auth::hash_password;
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
use telecom_common::models::auth::{Role, User};
use telecom_common::validation::{
    ValidationErrors, lowercase, parse_field, trimmed, validate_role, verbatim,
};
use telecom_db::{UserChanges, UserRepo, UserRow};
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UserRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(max = 255))]
    pub name: Option<String>,
    #[serde(deserialize_with = "lowercase")]
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
    #[serde(deserialize_with = "verbatim")]
    #[validate(length(min = 6))]
    pub password: Option<String>,
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_role"))]
    pub role: Option<String>,
}

impl UserRequest {
    /// Format rules, plus presence of each field in `required`.
    fn check(&self, required: &[&str]) -> ValidationErrors {
        let mut errors = ValidationErrors::from_result(self.validate());
        for &field in required {
            let present = match field {
                "name" => self.name.is_some(),
                "email" => self.email.is_some(),
                "password" => self.password.is_some(),
                "role" => self.role.is_some(),
                _ => true,
            };
            errors.require(field, present);
        }
        errors
    }
}

async fn find_user(pool: &PgPool, id: i64) -> Result<UserRow, ApiError> {
    UserRepo::get_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))
}

/// Flag `email` if another account already uses it.
async fn check_email_free(
    pool: &PgPool,
    errors: &mut ValidationErrors,
    email: Option<&str>,
    current_id: Option<i64>,
) -> Result<(), ApiError> {
    let Some(email) = email else {
        return Ok(());
    };
    if let Some(existing) = UserRepo::get_by_email(pool, email).await? {
        if Some(existing.id) != current_id {
            errors.add("email", "The email has already been taken.");
        }
    }
    Ok(())
}

fn ensure_can_manage(auth: &AuthUser, id: i64) -> Result<(), ApiError> {
    if auth.can_manage_user(id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("You may only manage your own account"))
    }
}

/// Only admins may hand out a role other than the one a record already has.
fn ensure_can_assign_role(
    auth: &AuthUser,
    requested: Option<Role>,
    current: Role,
) -> Result<(), ApiError> {
    match requested {
        Some(role) if role != current && !auth.is_admin() => {
            Err(ApiError::forbidden("Only administrators may change roles"))
        }
        _ => Ok(()),
    }
}

/// GET /api/users
#[tracing::instrument(skip(state))]
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let users = UserRepo::list(&state.pool)
        .await?
        .into_iter()
        .map(UserRow::into_user)
        .collect::<anyhow::Result<Vec<User>>>()?;
    Ok(respond(StatusCode::OK, json!({ "data": users })))
}

/// POST /api/user/create
#[tracing::instrument(skip(state, auth, req), fields(user_id = auth.user_id()))]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(req): ApiJson<UserRequest>,
) -> Result<Response, ApiError> {
    let mut errors = req.check(&["name", "email", "password"]);
    check_email_free(&state.pool, &mut errors, req.email.as_deref(), None).await?;
    errors.into_result()?;
    let role = parse_field::<Role>("role", req.role.as_deref())?;
    ensure_can_assign_role(&auth, role, Role::Customer)?;

    let (Some(name), Some(email), Some(password)) = (req.name, req.email, req.password) else {
        return Err(ValidationErrors::single("body", "Incomplete user").into());
    };
    let password_hash = hash_password(&password)?;
    let row = UserRepo::create(
        &state.pool,
        &name,
        &email,
        &password_hash,
        role.unwrap_or_default(),
    )
    .await?;
    tracing::info!(created_user_id = row.id, "Created user");

    let user = row.into_user()?;
    Ok(respond(
        StatusCode::CREATED,
        json!({ "message": "User created successfully", "user": user }),
    ))
}

/// GET /api/user/{id}
#[tracing::instrument(skip(state))]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    let user = find_user(&state.pool, id).await?.into_user()?;
    Ok(respond(StatusCode::OK, json!({ "user": user })))
}

/// PUT /api/user/{id}: name, email, password and role all required.
#[tracing::instrument(skip(state, auth, req), fields(user_id = auth.user_id()))]
pub async fn replace_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UserRequest>,
) -> Result<Response, ApiError> {
    replace(&state, &auth, id, req).await
}

async fn replace(
    state: &AppState,
    auth: &AuthUser,
    id: i64,
    req: UserRequest,
) -> Result<Response, ApiError> {
    update(state, auth, id, req, &["name", "email", "password", "role"]).await
}

/// PATCH /api/user/{id}: any subset of fields.
#[tracing::instrument(skip(state, auth, req), fields(user_id = auth.user_id()))]
pub async fn patch_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UserRequest>,
) -> Result<Response, ApiError> {
    update(&state, &auth, id, req, &[]).await
}

async fn update(
    state: &AppState,
    auth: &AuthUser,
    id: i64,
    req: UserRequest,
    required: &[&str],
) -> Result<Response, ApiError> {
    let current = find_user(&state.pool, id).await?;
    ensure_can_manage(auth, id)?;

    let mut errors = req.check(required);
    check_email_free(&state.pool, &mut errors, req.email.as_deref(), Some(id)).await?;
    errors.into_result()?;
    let role = parse_field::<Role>("role", req.role.as_deref())?;
    ensure_can_assign_role(auth, role, current.role()?)?;

    let password_hash = req.password.as_deref().map(hash_password).transpose()?;
    let changes = UserChanges {
        name: req.name,
        email: req.email,
        password_hash,
        role,
    };
    save(state, id, &changes).await
}

async fn save(state: &AppState, id: i64, changes: &UserChanges) -> Result<Response, ApiError> {
    let user = UserRepo::update(&state.pool, id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?
        .into_user()?;
    tracing::info!(updated_user_id = id, "Updated user");
    Ok(respond(
        StatusCode::OK,
        json!({ "message": "User updated successfully", "user": user }),
    ))
}

/// DELETE /api/user/{id}: contracts and services go with the user.
#[tracing::instrument(skip(state, auth), fields(user_id = auth.user_id()))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    find_user(&state.pool, id).await?;
    ensure_can_manage(&auth, id)?;

    if !UserRepo::delete(&state.pool, id).await? {
        return Err(ApiError::not_found("User"));
    }
    tracing::info!(deleted_user_id = id, "Deleted user");
    Ok(respond(
        StatusCode::OK,
        json!({ "message": "User deleted successfully" }),
    ))
}

/// GET /api/profile/{id}
#[tracing::instrument(skip(state, auth), fields(user_id = auth.user_id()))]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    let row = find_user(&state.pool, id).await?;
    ensure_can_manage(&auth, id)?;
    let user = row.into_user()?;
    Ok(respond(StatusCode::OK, json!({ "user": user })))
}

/// PUT /api/profile/{id}, same rules as `PUT /api/user/{id}`.
#[tracing::instrument(skip(state, auth, req), fields(user_id = auth.user_id()))]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UserRequest>,
) -> Result<Response, ApiError> {
    replace(&state, &auth, id, req).await
}
