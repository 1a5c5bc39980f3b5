use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::app::{
    companies::{self, SettingsUpdate},
    db::companies::Company,
    domain::Email,
    error::AppError,
    session::ApiAuthenticatedSession,
    AppState,
};

use super::parse_company_id;

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub name: Option<String>,
    pub contact_email: Option<String>,
}

/// GET /api/companies/:company_id — Company settings.
pub async fn show(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Json<Company>, AppError> {
    let company_id = parse_company_id(&company_id)?;
    Ok(Json(companies::get_company(&state.db, &session.user_id, &company_id).await?))
}

/// PATCH /api/companies/:company_id — Edit name or contact email.
pub async fn update(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<Company>, AppError> {
    let company_id = parse_company_id(&company_id)?;
    let contact_email = request
        .contact_email
        .as_deref()
        .map(Email::new)
        .transpose()
        .map_err(|_| AppError::Validation("Invalid contact email".to_string()))?;

    let company = companies::update_settings(
        &state.db,
        &session.user_id,
        &company_id,
        SettingsUpdate {
            name: request.name,
            contact_email,
        },
    )
    .await?;
    Ok(Json(company))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/companies/:company_id", get(show).patch(update))
}
