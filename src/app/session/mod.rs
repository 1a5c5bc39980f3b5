use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::app::{db, domain::UserId, error::AppError, AppState};

pub const SESSION_COOKIE: &str = "session_id";

pub fn session_cookie(session_id: impl Into<String>) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id.into()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .removal()
        .into()
}

/// The principal behind a valid session cookie.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub id: String,
    pub user_id: UserId,
}

/// Extractor for JSON endpoints. Rejects with 401 instead of redirecting.
pub struct ApiAuthenticatedSession(pub CurrentSession);

#[axum::async_trait]
impl FromRequestParts<AppState> for ApiAuthenticatedSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let session_id = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(AppError::Unauthenticated)?;

        let session = db::sessions::find_valid(&state.db, &session_id)
            .await?
            .ok_or(AppError::Unauthenticated)?;
        let user_id = UserId::from_string(&session.user_id).map_err(|_| AppError::Unauthenticated)?;

        Ok(Self(CurrentSession {
            id: session.id,
            user_id,
        }))
    }
}
