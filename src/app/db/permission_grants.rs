use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor};

use crate::app::domain::{ActionName, CompanyId, ResourceName, Role};

use super::now_ts;

/// Database row for permission_grants table. One row is one explicit allow.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PermissionGrant {
    pub company_id: String,
    pub role: String,
    pub resource: String,
    pub action: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Insert the grant, or refresh its `updated_at` if it already exists.
pub async fn upsert<'e, E>(
    executor: E,
    company_id: &CompanyId,
    role: Role,
    resource: &ResourceName,
    action: &ActionName,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = now_ts();
    sqlx::query(
        r#"INSERT INTO permission_grants (company_id, role, resource, action, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?)
           ON CONFLICT (company_id, role, resource, action) DO UPDATE SET updated_at = excluded.updated_at"#,
    )
    .bind(company_id.as_str())
    .bind(role.to_string())
    .bind(resource.as_str())
    .bind(action.as_str())
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Check whether an explicit allow exists.
pub async fn exists<'e, E>(
    executor: E,
    company_id: &CompanyId,
    role: Role,
    resource: &str,
    action: &str,
) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM permission_grants WHERE company_id = ? AND role = ? AND resource = ? AND action = ?",
    )
    .bind(company_id.as_str())
    .bind(role.to_string())
    .bind(resource)
    .bind(action)
    .fetch_one(executor)
    .await?;
    Ok(count > 0)
}

/// Remove a grant. Returns the number of rows removed.
pub async fn delete<'e, E>(
    executor: E,
    company_id: &CompanyId,
    role: Role,
    resource: &ResourceName,
    action: &ActionName,
) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "DELETE FROM permission_grants WHERE company_id = ? AND role = ? AND resource = ? AND action = ?",
    )
    .bind(company_id.as_str())
    .bind(role.to_string())
    .bind(resource.as_str())
    .bind(action.as_str())
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// All grants of a company, grouped by role.
pub async fn list_for_company<'e, E>(
    executor: E,
    company_id: &CompanyId,
) -> Result<Vec<PermissionGrant>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, PermissionGrant>(
        "SELECT company_id, role, resource, action, created_at, updated_at FROM permission_grants WHERE company_id = ? ORDER BY role, resource, action",
    )
    .bind(company_id.as_str())
    .fetch_all(executor)
    .await
}

/// Number of grants a company has.
pub async fn count_for_company<'e, E>(executor: E, company_id: &CompanyId) -> Result<i64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_scalar("SELECT count(*) FROM permission_grants WHERE company_id = ?")
        .bind(company_id.as_str())
        .fetch_one(executor)
        .await
}
