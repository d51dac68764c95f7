use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;
use telecom_common::models::auth::{Claims, Role, User};
use telecom_db::{RevokedTokenRepo, UserRepo};

/// The raw token from an `Authorization: Bearer <token>` header, unchecked.
#[derive(Debug)]
pub struct BearerToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

        match auth_header.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(BearerToken(token.trim().to_string())),
            _ => Err(ApiError::unauthorized(
                "Invalid authorization header format",
            )),
        }
    }
}

/// Extractor that validates a JWT Bearer token, rejects revoked ones and
/// loads the account it was issued to. Handlers that need a logged-in user
/// take this.
///
/// The role comes from the stored account, not the token, so a demotion or
/// deletion takes effect on the next request.
#[derive(Debug)]
pub struct AuthUser {
    pub claims: Claims,
    pub user: User,
}

impl AuthUser {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }

    /// Whether this user may modify the user record `id`.
    pub fn can_manage_user(&self, id: i64) -> bool {
        self.is_admin() || self.user_id() == id
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let claims = state.tokens.verify(&token)?;

        if let Some(revoked) = RevokedTokenRepo::get(&state.pool, &claims.jti).await? {
            tracing::debug!(
                jti = %claims.jti,
                revoked_at = %revoked.revoked_at,
                "Rejected revoked token"
            );
            return Err(ApiError::unauthorized("Token has been revoked"));
        }

        let user_id = claims
            .user_id()
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;
        let Some(row) = UserRepo::get_by_id(&state.pool, user_id).await? else {
            tracing::debug!(user_id, "Rejected token of a deleted account");
            return Err(ApiError::unauthorized("Unauthorized"));
        };

        Ok(AuthUser {
            claims,
            user: row.into_user()?,
        })
    }
}
