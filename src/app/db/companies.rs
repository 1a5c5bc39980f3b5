use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor};

use crate::app::domain::{CompanyId, Email, UserId};

use super::now_ts;

/// Database row for companies table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub contact_email: String,
    pub owner_user_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Data structure for inserting a new company.
pub struct NewCompany {
    pub id: CompanyId,
    pub name: String,
    pub contact_email: Email,
    pub owner_user_id: UserId,
}

const COLUMNS: &str = "id, name, contact_email, owner_user_id, created_at, updated_at";

/// Find a company by ID.
pub async fn find_by_id<'e, E>(
    executor: E,
    company_id: &CompanyId,
) -> Result<Option<Company>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Company>(&format!("SELECT {COLUMNS} FROM companies WHERE id = ?"))
        .bind(company_id.as_str())
        .fetch_optional(executor)
        .await
}

/// Oldest company whose contact email equals `email` exactly.
pub async fn find_by_contact_email<'e, E>(
    executor: E,
    email: &Email,
) -> Result<Option<Company>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Company>(&format!(
        "SELECT {COLUMNS} FROM companies WHERE contact_email = ? ORDER BY created_at, id LIMIT 1"
    ))
    .bind(email.as_str())
    .fetch_optional(executor)
    .await
}

/// Oldest company whose contact email is on `domain`.
pub async fn find_by_contact_domain<'e, E>(
    executor: E,
    domain: &str,
) -> Result<Option<Company>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Company>(&format!(
        "SELECT {COLUMNS} FROM companies WHERE substr(contact_email, instr(contact_email, '@') + 1) = ? ORDER BY created_at, id LIMIT 1"
    ))
    .bind(domain)
    .fetch_optional(executor)
    .await
}

/// Insert a new company.
pub async fn insert<'e, E>(executor: E, company: &NewCompany) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = now_ts();
    sqlx::query(
        "INSERT INTO companies (id, name, contact_email, owner_user_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(company.id.as_str())
    .bind(&company.name)
    .bind(company.contact_email.as_str())
    .bind(company.owner_user_id.as_str())
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Update name and contact email.
pub async fn update_settings<'e, E>(
    executor: E,
    company_id: &CompanyId,
    name: &str,
    contact_email: &Email,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE companies SET name = ?, contact_email = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(contact_email.as_str())
        .bind(now_ts())
        .bind(company_id.as_str())
        .execute(executor)
        .await?;
    Ok(())
}

/// Hand ownership to another principal.
pub async fn set_owner<'e, E>(executor: E, company_id: &CompanyId, owner: &UserId) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE companies SET owner_user_id = ?, updated_at = ? WHERE id = ?")
        .bind(owner.as_str())
        .bind(now_ts())
        .bind(company_id.as_str())
        .execute(executor)
        .await?;
    Ok(())
}
