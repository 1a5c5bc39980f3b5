use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor};

use crate::app::domain::{CompanyId, Role, UserId};

use super::now_ts;

/// Database row for memberships table. Unique on (user_id, company_id).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Membership {
    pub user_id: String,
    pub company_id: String,
    pub role: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Membership {
    /// Parsed role. Unknown values stored by hand are treated as no role at all.
    pub fn role(&self) -> Option<Role> {
        self.role.parse::<Role>().ok().filter(|r| r.is_membership_role())
    }
}

const COLUMNS: &str = "user_id, company_id, role, created_at, updated_at";

/// Insert the membership, or overwrite the role if the pair already exists.
pub async fn upsert<'e, E>(
    executor: E,
    company_id: &CompanyId,
    user_id: &UserId,
    role: Role,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = now_ts();
    sqlx::query(
        r#"INSERT INTO memberships (user_id, company_id, role, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?)
           ON CONFLICT (user_id, company_id) DO UPDATE SET role = excluded.role, updated_at = excluded.updated_at"#,
    )
    .bind(user_id.as_str())
    .bind(company_id.as_str())
    .bind(role.to_string())
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Find the membership for a (company, user) pair.
pub async fn find<'e, E>(
    executor: E,
    company_id: &CompanyId,
    user_id: &UserId,
) -> Result<Option<Membership>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Membership>(&format!(
        "SELECT {COLUMNS} FROM memberships WHERE company_id = ? AND user_id = ?"
    ))
    .bind(company_id.as_str())
    .bind(user_id.as_str())
    .fetch_optional(executor)
    .await
}

/// Find a member's role in a company. Returns None if not a member.
pub async fn find_role<'e, E>(
    executor: E,
    company_id: &CompanyId,
    user_id: &UserId,
) -> Result<Option<Role>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    Ok(find(executor, company_id, user_id).await?.and_then(|m| m.role()))
}

/// Oldest membership of a user.
pub async fn first_for_user<'e, E>(
    executor: E,
    user_id: &UserId,
) -> Result<Option<Membership>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Membership>(&format!(
        "SELECT {COLUMNS} FROM memberships WHERE user_id = ? ORDER BY created_at, company_id LIMIT 1"
    ))
    .bind(user_id.as_str())
    .fetch_optional(executor)
    .await
}

/// Any admin membership the user holds.
pub async fn find_admin_for_user<'e, E>(
    executor: E,
    user_id: &UserId,
) -> Result<Option<Membership>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Membership>(&format!(
        "SELECT {COLUMNS} FROM memberships WHERE user_id = ? AND role = ? ORDER BY created_at, company_id LIMIT 1"
    ))
    .bind(user_id.as_str())
    .bind(Role::Admin.to_string())
    .fetch_optional(executor)
    .await
}

/// An admin of the company other than `user_id`, if there is one.
pub async fn find_other_admin<'e, E>(
    executor: E,
    company_id: &CompanyId,
    user_id: &UserId,
) -> Result<Option<Membership>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Membership>(&format!(
        "SELECT {COLUMNS} FROM memberships WHERE company_id = ? AND role = ? AND user_id <> ? ORDER BY created_at LIMIT 1"
    ))
    .bind(company_id.as_str())
    .bind(Role::Admin.to_string())
    .bind(user_id.as_str())
    .fetch_optional(executor)
    .await
}

/// All members of a company, oldest first.
pub async fn list_for_company<'e, E>(
    executor: E,
    company_id: &CompanyId,
) -> Result<Vec<Membership>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Membership>(&format!(
        "SELECT {COLUMNS} FROM memberships WHERE company_id = ? ORDER BY created_at, user_id"
    ))
    .bind(company_id.as_str())
    .fetch_all(executor)
    .await
}

/// Delete a membership. Returns the number of rows removed.
pub async fn delete<'e, E>(
    executor: E,
    company_id: &CompanyId,
    user_id: &UserId,
) -> Result<u64, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM memberships WHERE company_id = ? AND user_id = ?")
        .bind(company_id.as_str())
        .bind(user_id.as_str())
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
