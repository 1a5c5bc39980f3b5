use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::app::{
    companies,
    db::companies::Company,
    domain::Email,
    error::AppError,
    session::ApiAuthenticatedSession,
    AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 254))]
    pub contact_email: String,
}

/// POST /api/companies — Create a company owned by the caller.
pub async fn create(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
    Json(request): Json<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<Company>), AppError> {
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;
    let contact_email = Email::new(&request.contact_email)
        .map_err(|_| AppError::Validation("Invalid contact email".to_string()))?;

    let company = companies::create_company(&state.db, &session.user_id, &request.name, &contact_email).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/companies", post(create))
}
