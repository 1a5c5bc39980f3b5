use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::app::{
    db::permission_grants::PermissionGrant,
    domain::Role,
    error::AppError,
    permissions,
    session::ApiAuthenticatedSession,
    AppState,
};

use super::parse_company_id;

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub role: Role,
    pub resource: String,
    pub action: String,
}

/// GET /api/companies/:company_id/permissions
pub async fn list(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Json<Vec<PermissionGrant>>, AppError> {
    let company_id = parse_company_id(&company_id)?;
    Ok(Json(permissions::list_grants(&state.db, &session.user_id, &company_id).await?))
}

/// PUT /api/companies/:company_id/permissions — Add an explicit allow.
pub async fn grant(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Json(request): Json<GrantRequest>,
) -> Result<StatusCode, AppError> {
    let company_id = parse_company_id(&company_id)?;
    permissions::set_grant(
        &state.db,
        &session.user_id,
        &company_id,
        request.role,
        &request.resource,
        &request.action,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/companies/:company_id/permissions — Remove an explicit allow.
pub async fn revoke(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Json(request): Json<GrantRequest>,
) -> Result<StatusCode, AppError> {
    let company_id = parse_company_id(&company_id)?;
    permissions::revoke_grant(
        &state.db,
        &session.user_id,
        &company_id,
        request.role,
        &request.resource,
        &request.action,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/api/companies/:company_id/permissions",
        get(list).put(grant).delete(revoke),
    )
}
