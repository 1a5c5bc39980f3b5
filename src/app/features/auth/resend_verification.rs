use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;

use crate::app::{domain::Email, error::AppError, verification, AppState};

use super::{service, signup::SignupResponse};

#[derive(Debug, Deserialize)]
pub struct ResendRequest {
    pub email: String,
}

/// POST /api/resend-verification — Rotate the pending token and mail it again.
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<ResendRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let email = Email::new(&request.email)
        .map_err(|_| AppError::Validation("Invalid email address".to_string()))?;

    let issued = verification::resend_verification(&state.db, &email, state.config.verification_ttl()).await?;
    service::send_verification_email(&state, &issued).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(SignupResponse {
            status: "verification_sent",
            email: issued.email.as_str().to_string(),
            expires_at: issued.expires_at.unix_timestamp(),
        }),
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/resend-verification", post(submit))
}
