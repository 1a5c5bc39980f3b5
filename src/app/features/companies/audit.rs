use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::app::{
    audit::{self, AuditFilter},
    db::audit_log::AuditRecord,
    error::AppError,
    session::ApiAuthenticatedSession,
    AppState,
};

use super::parse_company_id;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub action: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/companies/:company_id/audit — Newest first.
pub async fn list(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditRecord>>, AppError> {
    let company_id = parse_company_id(&company_id)?;
    let filter = AuditFilter {
        action: query.action,
        limit: query.limit,
        offset: query.offset,
    };
    Ok(Json(audit::list_for_company(&state.db, &session.user_id, &company_id, &filter).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/companies/:company_id/audit", get(list))
}
