//! Email verification tokens.
//!
//! A signup is held as a pending token whose payload carries everything needed
//! to create the principal. Consuming the token materializes the account once;
//! issuing a new token for the same address supersedes older ones, resending
//! rotates the pending token in place.

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::app::{
    audit,
    db::{self, verification_tokens::VerificationToken},
    domain::{Email, HashedPassword},
    error::AppError,
    provisioning::{self, AccountDetails, ProvisionedAccount, RetryPolicy},
};

/// Signup data carried in `verification_tokens.payload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAccount {
    pub display_name: String,
    #[serde(default)]
    pub password_hash: Option<String>,
}

/// Lifecycle state of a token at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Pending,
    Verified,
    Superseded,
    Expired,
}

pub fn status_of(token: &VerificationToken, now: i64) -> TokenStatus {
    if token.consumed_at.is_some() {
        TokenStatus::Verified
    } else if token.superseded_at.is_some() {
        TokenStatus::Superseded
    } else if token.expires_at <= now {
        TokenStatus::Expired
    } else {
        TokenStatus::Pending
    }
}

/// A freshly issued or rotated token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub email: Email,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Result of consuming a token: the account and a session for it.
#[derive(Debug, Clone)]
pub struct ConsumedVerification {
    pub account: ProvisionedAccount,
    pub session_id: String,
}

/// 32 random bytes, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Start a signup: supersede any pending token for `email` and issue a new one.
pub async fn issue_verification(
    pool: &SqlitePool,
    email: &Email,
    pending: &PendingAccount,
    ttl: time::Duration,
) -> Result<IssuedToken, AppError> {
    if audit::is_reserved_email(email) {
        return Err(AppError::Validation("Email address is reserved".to_string()));
    }
    if db::find_by_email(pool, email).await?.is_some() {
        return Err(AppError::Auth(
            "Unable to create account. If you already have an account, please log in.".to_string(),
        ));
    }

    let payload = serde_json::to_string(pending).map_err(|_| AppError::Internal)?;
    let token = generate_token();
    let expires_at = OffsetDateTime::now_utc() + ttl;

    let mut tx = pool.begin().await?;
    let superseded = db::verification_tokens::supersede_for_email(&mut *tx, email).await?;
    db::verification_tokens::insert(
        &mut *tx,
        &db::verification_tokens::NewVerificationToken {
            id: ulid::Ulid::new().to_string(),
            email: email.clone(),
            token: token.clone(),
            payload,
            expires_at: expires_at.unix_timestamp(),
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(%email, superseded, "issued verification token");
    Ok(IssuedToken {
        email: email.clone(),
        token,
        expires_at,
    })
}

async fn consume_once(
    pool: &SqlitePool,
    token: &str,
    now: OffsetDateTime,
    session_ttl: time::Duration,
) -> Result<ConsumedVerification, AppError> {
    let invalid = || AppError::NotFound("invalid_or_expired".to_string());

    // Claiming is the first statement, under the write lock: a concurrent
    // consumer waits here and then finds the token already used.
    let mut tx = db::begin_write(pool).await?;
    let Some(record) = db::verification_tokens::claim(&mut *tx, token, now.unix_timestamp()).await? else {
        let expired = db::verification_tokens::find_by_token(&mut *tx, token)
            .await?
            .is_some_and(|r| status_of(&r, now.unix_timestamp()) == TokenStatus::Expired);
        return Err(if expired { AppError::Expired("expired".to_string()) } else { invalid() });
    };

    let pending: PendingAccount = serde_json::from_str(&record.payload).map_err(|err| {
        tracing::error!(%err, token_id = %record.id, "unreadable verification payload");
        AppError::Internal
    })?;
    let email = Email::new(&record.email).map_err(|_| AppError::Internal)?;
    let details = AccountDetails {
        email,
        display_name: pending.display_name,
        password_hash: pending.password_hash.map(HashedPassword::from_string),
    };

    let account = provisioning::provision_account(&mut tx, &details).await?;
    let session_id = db::sessions::create(&mut *tx, &account.user_id, now + session_ttl).await?;
    tx.commit().await?;

    Ok(ConsumedVerification { account, session_id })
}

/// Consume a token and materialize the account it describes.
///
/// Marking the token consumed, creating the principal and opening its session
/// commit together. A token is consumed at most once; every other attempt,
/// concurrent or later, fails `invalid_or_expired`.
pub async fn consume_verification(
    pool: &SqlitePool,
    token: &str,
    session_ttl: time::Duration,
    policy: RetryPolicy,
) -> Result<ConsumedVerification, AppError> {
    let now = OffsetDateTime::now_utc();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    let mut consumed = loop {
        attempt += 1;
        match consume_once(pool, token, now, session_ttl).await {
            Ok(consumed) => break consumed,
            Err(err) if provisioning::is_retryable(&err) && attempt < max_attempts => {
                tracing::debug!(%err, attempt, "verification retrying");
                tokio::time::sleep(policy.delay(attempt)).await;
            }
            // Still contended: another consumer holds the token.
            Err(err) if provisioning::is_retryable(&err) => {
                tracing::warn!(%err, attempt, "verification gave up");
                return Err(AppError::NotFound("invalid_or_expired".to_string()));
            }
            Err(err) => return Err(err),
        }
    };
    consumed.account.attempts = attempt;

    let account = &consumed.account;
    tracing::info!(user_id = %account.user_id, created = account.created, role = %account.role, "verified email");
    provisioning::record_provisioned(pool, Some(&account.user_id), account, "email_verification").await;

    Ok(consumed)
}

/// Re-send: give the pending token for `email` a new value and expiry.
/// The previous value stops working.
pub async fn resend_verification(
    pool: &SqlitePool,
    email: &Email,
    ttl: time::Duration,
) -> Result<IssuedToken, AppError> {
    let not_found = || AppError::NotFound("not_found".to_string());
    let pending = db::verification_tokens::find_pending_for_email(pool, email)
        .await?
        .ok_or_else(not_found)?;

    let token = generate_token();
    let expires_at = OffsetDateTime::now_utc() + ttl;
    let rotated =
        db::verification_tokens::rotate(pool, &pending.id, &token, expires_at.unix_timestamp()).await?;
    if rotated != 1 {
        return Err(not_found());
    }

    tracing::info!(%email, token_id = %pending.id, "rotated verification token");
    Ok(IssuedToken {
        email: email.clone(),
        token,
        expires_at,
    })
}

/// Delete unconsumed tokens that have expired. Returns how many were removed.
pub async fn cleanup_expired(pool: &SqlitePool) -> Result<u64, AppError> {
    let removed = db::verification_tokens::delete_expired(pool, db::now_ts()).await?;
    if removed > 0 {
        tracing::info!(removed, "swept expired verification tokens");
    }
    Ok(removed)
}
