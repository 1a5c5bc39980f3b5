use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::app::{
    authz, domain::CompanyId, error::AppError, session::ApiAuthenticatedSession, AppState,
};

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub company_id: String,
    pub resource: String,
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub allowed: bool,
}

/// GET /api/authorize — Ask whether the caller may perform `action` on
/// `resource` in a company. Always answers; an unknown company is a deny.
pub async fn check(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
    Query(query): Query<AuthorizeQuery>,
) -> Result<Json<AuthorizeResponse>, AppError> {
    let allowed = match CompanyId::from_string(&query.company_id) {
        Ok(company_id) => {
            authz::authorize(&state.db, &session.user_id, &company_id, &query.resource, &query.action).await
        }
        Err(_) => false,
    };
    Ok(Json(AuthorizeResponse { allowed }))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/authorize", get(check))
}
