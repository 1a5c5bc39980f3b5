use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;

use crate::app::{
    db::memberships::Membership,
    domain::{Role, UserId},
    error::AppError,
    memberships,
    session::ApiAuthenticatedSession,
    AppState,
};

use super::parse_company_id;

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub user_id: String,
    pub role: Role,
}

fn parse_user_id(raw: &str) -> Result<UserId, AppError> {
    UserId::from_string(raw).map_err(|_| AppError::NotFound("not_found".to_string()))
}

/// GET /api/companies/:company_id/members
pub async fn list(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Json<Vec<Membership>>, AppError> {
    let company_id = parse_company_id(&company_id)?;
    Ok(Json(memberships::list_members(&state.db, &session.user_id, &company_id).await?))
}

/// PUT /api/companies/:company_id/members — Add a member or change their role.
pub async fn assign(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Json(request): Json<AssignRoleRequest>,
) -> Result<Json<Membership>, AppError> {
    let company_id = parse_company_id(&company_id)?;
    let user_id = parse_user_id(&request.user_id)?;

    let membership =
        memberships::assign_role(&state.db, &session.user_id, &company_id, &user_id, request.role).await?;
    Ok(Json(membership))
}

/// DELETE /api/companies/:company_id/members/:user_id
pub async fn remove(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
    Path((company_id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let company_id = parse_company_id(&company_id)?;
    let user_id = parse_user_id(&user_id)?;

    memberships::remove_membership(&state.db, &session.user_id, &company_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/companies/:company_id/members", get(list).put(assign))
        .route("/api/companies/:company_id/members/:user_id", delete(remove))
}
