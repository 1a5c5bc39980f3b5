use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::{
    domain::{Email, HashedPassword, Password},
    error::AppError,
    verification::{self, PendingAccount},
    AppState,
};

use super::service;

/// Signup request body.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub status: &'static str,
    pub email: String,
    pub expires_at: i64,
}

/// POST /api/signup — Hold the signup as a pending verification and mail the link.
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;

    let email = Email::new(&request.email)
        .map_err(|_| AppError::Validation("Invalid email address".to_string()))?;
    let password = Password::new(request.password).map_err(|e| {
        AppError::Validation(e.message.map(|m| m.to_string()).unwrap_or_else(|| "Invalid password".to_string()))
    })?;
    let password_hash = HashedPassword::from_password(&password).map_err(|_| AppError::Internal)?;

    let pending = PendingAccount {
        display_name: request.display_name.trim().to_string(),
        password_hash: Some(password_hash.as_str().to_string()),
    };
    let issued = verification::issue_verification(
        &state.db,
        &email,
        &pending,
        state.config.verification_ttl(),
    )
    .await?;

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
    Router::new().route("/api/signup", post(submit))
}
