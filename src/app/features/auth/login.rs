use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::{
    domain::{Email, Password},
    error::AppError,
    session::session_cookie,
    AppState,
};

use super::service;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
}

/// POST /api/login — Exchange credentials for a session cookie.
pub async fn submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let invalid = || AppError::Auth("Invalid email or password".to_string());

    request.validate().map_err(|_| invalid())?;
    let email = Email::new(&request.email).map_err(|_| invalid())?;

    // Strength rules apply at signup, not login.
    let password = Password::for_verification(request.password);

    let session_id = service::login(&state.db, &email, &password, state.config.session_ttl()).await?;

    Ok((jar.add(session_cookie(session_id)), Json(LoginResponse { status: "ok" })))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/login", post(submit))
}
