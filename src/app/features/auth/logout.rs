use axum::{extract::State, http::StatusCode, routing::post, Router};
use axum_extra::extract::cookie::CookieJar;

use crate::app::{
    db,
    error::AppError,
    session::{clear_session_cookie, SESSION_COOKIE},
    AppState,
};

/// POST /api/logout — End the current session, if any.
pub async fn submit(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        db::sessions::delete(&state.db, cookie.value()).await?;
    }

    Ok((jar.add(clear_session_cookie()), StatusCode::NO_CONTENT))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/logout", post(submit))
}
