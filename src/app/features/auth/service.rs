use sqlx::SqlitePool;

use crate::app::{
    config::Config,
    db,
    domain::{Email, HashedPassword, Password, UserId},
    error::AppError,
    mail::EmailMessage,
    verification::IssuedToken,
    AppState,
};

/// Log in a user. Returns the session ID on success.
pub async fn login(
    pool: &SqlitePool,
    email: &Email,
    password: &Password,
    ttl: time::Duration,
) -> Result<String, AppError> {
    let invalid = || AppError::Auth("Invalid email or password".to_string());

    let user = db::find_by_email(pool, email).await?.ok_or_else(invalid)?;

    // Principals created without a password (system actor, seeded operators) cannot log in.
    let stored_hash = user.password_hash.map(HashedPassword::from_string).ok_or_else(invalid)?;
    stored_hash.verify(password).map_err(|_| invalid())?;

    let user_id = UserId::from_string(&user.id).map_err(|_| AppError::Internal)?;

    let expires_at = time::OffsetDateTime::now_utc() + ttl;
    let session_id = db::sessions::create(pool, &user_id, expires_at).await?;

    tracing::info!(%user_id, "logged in");
    Ok(session_id)
}

/// Link a recipient follows to confirm their address.
pub fn verification_link(config: &Config, token: &str) -> String {
    format!("{}/verify-email?token={}", config.app_url_base(), urlencoding::encode(token))
}

/// Mail the verification link. Delivery failures are logged, not returned:
/// the token stays valid and can be re-sent.
pub async fn send_verification_email(state: &AppState, issued: &IssuedToken) {
    let link = verification_link(&state.config, &issued.token);
    let message = EmailMessage::verification(
        issued.email.clone(),
        state.config.mail_from.as_str(),
        &link,
        issued.expires_at,
    );

    if let Err(err) = state.mail.send(&message).await {
        tracing::warn!(%err, email = %issued.email, "failed to send verification email");
    }
}
