//! Account session lifecycle: register, login, who-am-i, logout and refresh.
//!
//! Handlers in `web::api::auth` only translate HTTP to and from these calls.

use crate::auth::{IssuedToken, hash_password, verify_password};
use crate::error::ApiError;
use crate::state::AppState;
use crate::web::api::contracts::nest_services;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use telecom_common::models::auth::{Claims, Role, User, UserProfile};
use telecom_common::validation::{ValidationErrors, lowercase, trimmed, verbatim};
use telecom_db::{ContractRepo, RevokedTokenRepo, UserRepo};
use validator::Validate;

/// A token handed to a client together with its owner.
#[derive(Debug)]
pub struct Session {
    pub token: IssuedToken,
    pub user: User,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(required, length(max = 255))]
    pub name: Option<String>,
    #[serde(deserialize_with = "lowercase")]
    #[validate(required, email, length(max = 255))]
    pub email: Option<String>,
    #[serde(deserialize_with = "verbatim")]
    #[validate(required, length(min = 6))]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[serde(deserialize_with = "lowercase")]
    #[validate(required, email)]
    pub email: Option<String>,
    #[serde(deserialize_with = "verbatim")]
    #[validate(required)]
    pub password: Option<String>,
}

/// Create a customer account and log it in.
pub async fn register(state: &AppState, req: &RegisterRequest) -> Result<Session, ApiError> {
    let mut errors = ValidationErrors::from_result(req.validate());
    if let Some(email) = req.email.as_deref() {
        if !errors.has("email") && UserRepo::get_by_email(&state.pool, email).await?.is_some() {
            errors.add("email", "The email has already been taken.");
        }
    }
    errors.into_result()?;
    let (Some(name), Some(email), Some(password)) = (&req.name, &req.email, &req.password) else {
        return Err(ValidationErrors::single("body", "Incomplete registration").into());
    };

    let password_hash = hash_password(password)?;
    // A concurrent registration can still win the race; the unique
    // constraint turns that into the same validation error.
    let user = UserRepo::create(&state.pool, name, email, &password_hash, Role::Customer).await?;
    tracing::info!(user_id = user.id, "Registered user");

    let token = state.tokens.mint(&user)?;
    Ok(Session {
        token,
        user: user.into_user()?,
    })
}

/// Exchange credentials for a token.
pub async fn login(state: &AppState, req: &LoginRequest) -> Result<Session, ApiError> {
    ValidationErrors::from_result(req.validate()).into_result()?;
    let (Some(email), Some(password)) = (&req.email, &req.password) else {
        return Err(ValidationErrors::single("body", "Incomplete credentials").into());
    };

    let user = UserRepo::get_by_email(&state.pool, email)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    if !verify_password(password, &user.password_hash)? {
        return Err(ApiError::unauthorized("Unauthorized - Invalid credentials"));
    }

    let token = state.tokens.mint(&user)?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok(Session {
        token,
        user: user.into_user()?,
    })
}

/// The authenticated user with their contracts and services.
pub async fn me(state: &AppState, user: User) -> Result<UserProfile, ApiError> {
    let contracts = ContractRepo::list_by_user(&state.pool, user.id).await?;
    let contracts = nest_services(&state.pool, contracts).await?;
    Ok(UserProfile { user, contracts })
}

/// Revoke the presented token until it would have expired anyway.
pub async fn logout(state: &AppState, claims: &Claims) -> Result<(), ApiError> {
    let user_id = claims
        .user_id()
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;
    RevokedTokenRepo::revoke(&state.pool, &claims.jti, user_id, token_expiry(claims)).await?;
    tracing::info!(user_id, "User logged out");

    purge_revoked(state).await;
    Ok(())
}

/// Trade a valid, or recently expired, token for a new one. The presented
/// token is revoked so it cannot be exchanged twice.
pub async fn refresh(state: &AppState, token: &str) -> Result<IssuedToken, ApiError> {
    let claims = state.tokens.verify_for_refresh(token)?;
    let user_id = claims
        .user_id()
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    let user = UserRepo::get_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    let newly_revoked =
        RevokedTokenRepo::revoke(&state.pool, &claims.jti, user_id, token_expiry(&claims)).await?;
    if !newly_revoked {
        tracing::debug!(user_id, "Refresh attempted with a revoked token");
        return Err(ApiError::unauthorized("Token has been revoked"));
    }

    let issued = state.tokens.mint(&user)?;
    tracing::info!(user_id, "Token refreshed");
    Ok(issued)
}

fn token_expiry(claims: &Claims) -> DateTime<Utc> {
    DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now)
}

/// Best-effort cleanup. Entries stay until their token is past the refresh
/// grace window, since refresh still consults them until then.
async fn purge_revoked(state: &AppState) {
    let Some(cutoff) = purge_cutoff(Utc::now(), state.tokens.refresh_grace_secs()) else {
        return;
    };
    match RevokedTokenRepo::purge_expired(&state.pool, cutoff).await {
        Ok(0) => {}
        Ok(n) => tracing::debug!("Purged {} expired revoked token(s)", n),
        Err(e) => tracing::warn!("Failed to purge revoked tokens: {:#}", e),
    }
}

/// Revocations of tokens that expired before this instant are no longer
/// needed. Refresh compares whole seconds, so the cutoff backs off one more
/// second to keep an entry whose deadline is the current second.
fn purge_cutoff(now: DateTime<Utc>, grace_secs: i64) -> Option<DateTime<Utc>> {
    let grace = Duration::try_seconds(grace_secs.checked_add(1)?)?;
    now.checked_sub_signed(grace)
}

/// Create the configured admin account unless that email is already taken.
/// Returns whether an account was created.
pub async fn seed_initial_admin(
    pool: &sqlx::PgPool,
    admin: &crate::config::InitialAdminConfig,
) -> anyhow::Result<bool> {
    let email = admin.email.trim().to_lowercase();
    if UserRepo::get_by_email(pool, &email).await?.is_some() {
        tracing::info!("Initial admin '{}' already exists, skipping seed", email);
        return Ok(false);
    }
    let password_hash = hash_password(&admin.password)?;
    UserRepo::create(pool, admin.name.trim(), &email, &password_hash, Role::Admin).await?;
    tracing::info!("Created initial admin: {}", email);
    Ok(true)
}
