//! Registration, sessions and account administration.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::auth::{PasswordChange, ProfileInput, RegisterInput};
use super::handlers::{bearer_token, created, require_identity, AppState};
use super::views::{AccountView, MembershipView};
use crate::error::{Result, ServerError};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct GroupRequest {
    pub group: String,
}

#[derive(Deserialize)]
pub struct PermissionRequest {
    pub codename: String,
}

/// POST /api/auth/register - Create an account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(input): Json<RegisterInput>,
) -> Result<Response> {
    let user = state.auth.register(input).await?;
    let identity = state.auth.identity(&user).await?;
    Ok(created(AccountView::new(&user, &identity)))
}

/// POST /api/auth/login - Login and get a session token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Response> {
    let session = state.auth.login(&req.username, &req.password).await?;
    Ok(Json(serde_json::json!({
        "token": session.token,
        "username": session.user.username,
        "expires_at": session.expires_at
    }))
    .into_response())
}

/// POST /api/auth/logout - End the current session
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Response> {
    let token = bearer_token(&headers).ok_or(ServerError::AuthRequired)?;
    state.auth.logout(token).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn account_view(state: &AppState, headers: &HeaderMap) -> Result<AccountView> {
    let identity = require_identity(state, headers).await?;
    let user = state
        .auth
        .get_user_by_username(&identity.username)
        .await?
        .ok_or(ServerError::AuthFailed)?;
    Ok(AccountView::new(&user, &identity))
}

/// GET /api/account
pub async fn get_account(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Json<AccountView>> {
    Ok(Json(account_view(&state, &headers).await?))
}

/// PUT /api/account - Change email and names
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<ProfileInput>,
) -> Result<Json<AccountView>> {
    let identity = require_identity(&state, &headers).await?;
    let user = state.auth.update_profile(identity.user_id, input).await?;
    Ok(Json(AccountView::new(&user, &identity)))
}

/// POST /api/account/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<PasswordChange>,
) -> Result<Response> {
    let identity = require_identity(&state, &headers).await?;
    state.auth.change_password(identity.user_id, input).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// POST /api/users/:username/groups
pub async fn add_group(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    headers: HeaderMap,
    Json(req): Json<GroupRequest>,
) -> Result<Json<MembershipView>> {
    let acting = require_identity(&state, &headers).await?;
    let updated = state.auth.add_group(&acting, &username, &req.group).await?;
    Ok(Json(updated.into()))
}

/// DELETE /api/users/:username/groups/:group
pub async fn remove_group(
    State(state): State<Arc<AppState>>,
    Path((username, group)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<MembershipView>> {
    let acting = require_identity(&state, &headers).await?;
    let updated = state.auth.remove_group(&acting, &username, &group).await?;
    Ok(Json(updated.into()))
}

/// POST /api/users/:username/permissions
pub async fn grant_permission(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    headers: HeaderMap,
    Json(req): Json<PermissionRequest>,
) -> Result<Json<MembershipView>> {
    let acting = require_identity(&state, &headers).await?;
    let updated = state
        .auth
        .grant_permission(&acting, &username, &req.codename)
        .await?;
    Ok(Json(updated.into()))
}
