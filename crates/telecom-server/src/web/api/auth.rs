use crate::error::ApiError;
use crate::session::{self, LoginRequest, RegisterRequest, Session};
use crate::state::AppState;
use crate::web::api::middleware::{AuthUser, BearerToken};
use crate::web::api::{ApiJson, respond};
use axum::{extract::State, http::StatusCode, response::Response};
use serde_json::json;
use std::sync::Arc;

fn token_response(state: &AppState, status: StatusCode, session: Session) -> Response {
    respond(
        status,
        json!({
            "access_token": session.token.token,
            "token_type": "bearer",
            "expires_in": state.tokens.ttl_secs(),
            "user": session.user,
        }),
    )
}

/// POST /api/register
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<Response, ApiError> {
    let session = session::register(&state, &req).await?;
    Ok(token_response(&state, StatusCode::CREATED, session))
}

/// POST /api/login
#[tracing::instrument(skip(state, req))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let session = session::login(&state, &req).await?;
    Ok(token_response(&state, StatusCode::OK, session))
}

/// GET /api/me
#[tracing::instrument(skip(state, auth), fields(user_id = auth.user_id()))]
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Response, ApiError> {
    let profile = session::me(&state, auth.user).await?;
    Ok(respond(StatusCode::OK, json!({ "user": profile })))
}

/// POST /api/logout
#[tracing::instrument(skip(state, auth), fields(user_id = auth.user_id()))]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Response, ApiError> {
    session::logout(&state, &auth.claims).await?;
    Ok(respond(
        StatusCode::OK,
        json!({ "message": "Logout successful" }),
    ))
}

/// POST /api/refresh
///
/// Takes the bearer token directly rather than through `AuthUser`: an
/// expired token is still accepted here within the grace window.
#[tracing::instrument(skip(state, token))]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    BearerToken(token): BearerToken,
) -> Result<Response, ApiError> {
    let issued = session::refresh(&state, &token).await?;
    Ok(respond(
        StatusCode::OK,
        json!({
            "access_token": issued.token,
            "token_type": "bearer",
            "expires_in": state.tokens.ttl_secs(),
        }),
    ))
}
