use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::app::{
    domain::Role,
    error::AppError,
    session::session_cookie,
    verification,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub user_id: String,
    pub company_id: Option<String>,
    pub role: Role,
    pub created: bool,
}

/// POST /api/verify-email — Consume the token, create the account and log it in.
pub async fn submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<VerifyRequest>,
) -> Result<(CookieJar, Json<VerifyResponse>), AppError> {
    let token = request.token.trim();
    if token.is_empty() {
        return Err(AppError::Validation("Missing verification token".to_string()));
    }

    let consumed = verification::consume_verification(
        &state.db,
        token,
        state.config.session_ttl(),
        state.config.retry_policy(),
    )
    .await?;

    let account = consumed.account;
    Ok((
        jar.add(session_cookie(consumed.session_id)),
        Json(VerifyResponse {
            user_id: account.user_id.as_str(),
            company_id: account.company_id.as_ref().map(|id| id.as_str()),
            role: account.role,
            created: account.created,
        }),
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/verify-email", post(submit))
}
