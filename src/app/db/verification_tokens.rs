use sqlx::{FromRow, SqliteExecutor};

use crate::app::domain::Email;

use super::now_ts;

/// Database row for verification_tokens table.
///
/// A row is pending while `consumed_at` and `superseded_at` are NULL and
/// `expires_at` is in the future. Rows are never deleted except by the expiry sweep.
#[derive(Debug, Clone, FromRow)]
pub struct VerificationToken {
    pub id: String,
    pub email: String,
    pub token: String,
    pub payload: String,
    pub expires_at: i64,
    pub consumed_at: Option<i64>,
    pub superseded_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Data structure for inserting a new token.
pub struct NewVerificationToken {
    pub id: String,
    pub email: Email,
    pub token: String,
    pub payload: String,
    pub expires_at: i64,
}

const COLUMNS: &str =
    "id, email, token, payload, expires_at, consumed_at, superseded_at, created_at, updated_at";

/// Insert a verification token.
pub async fn insert<'e, E>(executor: E, token: &NewVerificationToken) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = now_ts();
    sqlx::query(
        "INSERT INTO verification_tokens (id, email, token, payload, expires_at, consumed_at, superseded_at, created_at, updated_at) VALUES (?, ?, ?, ?, ?, NULL, NULL, ?, ?)",
    )
    .bind(&token.id)
    .bind(token.email.as_str())
    .bind(&token.token)
    .bind(&token.payload)
    .bind(token.expires_at)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Find a token by value, whatever its state.
pub async fn find_by_token<'e, E>(
    executor: E,
    token: &str,
) -> Result<Option<VerificationToken>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, VerificationToken>(&format!(
        "SELECT {COLUMNS} FROM verification_tokens WHERE token = ?"
    ))
    .bind(token)
    .fetch_optional(executor)
    .await
}

/// The actionable token for an email: not consumed, not superseded, not expired.
pub async fn find_pending_for_email<'e, E>(
    executor: E,
    email: &Email,
) -> Result<Option<VerificationToken>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, VerificationToken>(&format!(
        "SELECT {COLUMNS} FROM verification_tokens WHERE email = ? AND consumed_at IS NULL AND superseded_at IS NULL AND expires_at > ? ORDER BY created_at DESC LIMIT 1"
    ))
    .bind(email.as_str())
    .bind(now_ts())
    .fetch_optional(executor)
    .await
}

/// Mark every unconsumed, not yet superseded token for the email as superseded.
pub async fn supersede_for_email<'e, E>(executor: E, email: &Email) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = now_ts();
    let result = sqlx::query(
        "UPDATE verification_tokens SET superseded_at = ?, updated_at = ? WHERE email = ? AND consumed_at IS NULL AND superseded_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(email.as_str())
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// Replace token value and expiry on a still-pending record.
/// Returns 0 if the record was consumed or superseded in the meantime.
pub async fn rotate<'e, E>(
    executor: E,
    id: &str,
    new_token: &str,
    expires_at: i64,
) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE verification_tokens SET token = ?, expires_at = ?, updated_at = ? WHERE id = ? AND consumed_at IS NULL AND superseded_at IS NULL",
    )
    .bind(new_token)
    .bind(expires_at)
    .bind(now_ts())
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// Atomically consume a pending token: not consumed, not superseded and
/// expiring after `now`. Returns the claimed row, or `None` when the token is
/// unknown or no longer pending.
pub async fn claim<'e, E>(executor: E, token: &str, now: i64) -> Result<Option<VerificationToken>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, VerificationToken>(&format!(
        "UPDATE verification_tokens SET consumed_at = ?, updated_at = ? WHERE token = ? AND consumed_at IS NULL AND superseded_at IS NULL AND expires_at > ? RETURNING {COLUMNS}"
    ))
    .bind(now)
    .bind(now)
    .bind(token)
    .bind(now)
    .fetch_optional(executor)
    .await
}

/// Delete unconsumed tokens whose expiry is at or before `cutoff`.
pub async fn delete_expired<'e, E>(executor: E, cutoff: i64) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "DELETE FROM verification_tokens WHERE consumed_at IS NULL AND expires_at <= ?",
    )
    .bind(cutoff)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
