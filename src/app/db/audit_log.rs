use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor};

use crate::app::domain::{CompanyId, UserId};

use super::now_ts;

/// Database row for audit_log table. Append-only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditRecord {
    pub id: String,
    pub subject_user_id: String,
    pub company_id: Option<String>,
    pub action: String,
    /// JSON document with the before/after snapshot.
    pub detail: String,
    pub actor_user_id: String,
    pub created_at: i64,
}

/// Data structure for appending a record.
pub struct NewAuditRecord {
    pub id: String,
    pub subject_user_id: UserId,
    pub company_id: Option<CompanyId>,
    pub action: String,
    pub detail: String,
    pub actor_user_id: UserId,
}

const COLUMNS: &str = "id, subject_user_id, company_id, action, detail, actor_user_id, created_at";

/// Append a record. There is no update or delete counterpart.
pub async fn insert<'e, E>(executor: E, record: &NewAuditRecord) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO audit_log (id, subject_user_id, company_id, action, detail, actor_user_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(record.subject_user_id.as_str())
    .bind(record.company_id.as_ref().map(CompanyId::as_str))
    .bind(&record.action)
    .bind(&record.detail)
    .bind(record.actor_user_id.as_str())
    .bind(now_ts())
    .execute(executor)
    .await?;
    Ok(())
}

/// Records scoped to a company, newest first.
pub async fn list_for_company<'e, E>(
    executor: E,
    company_id: &CompanyId,
    action: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<AuditRecord>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, AuditRecord>(&format!(
        "SELECT {COLUMNS} FROM audit_log WHERE company_id = ? AND (? IS NULL OR action = ?) ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?"
    ))
    .bind(company_id.as_str())
    .bind(action)
    .bind(action)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

/// Every record about one principal, oldest first.
pub async fn list_for_subject<'e, E>(
    executor: E,
    subject: &UserId,
) -> Result<Vec<AuditRecord>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, AuditRecord>(&format!(
        "SELECT {COLUMNS} FROM audit_log WHERE subject_user_id = ? ORDER BY created_at, rowid"
    ))
    .bind(subject.as_str())
    .fetch_all(executor)
    .await
}
