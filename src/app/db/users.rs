use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor};

use crate::app::domain::{CompanyId, Email, HashedPassword, UserId};

use super::now_ts;

/// Database row for users table (principals).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub global_override: bool,
    pub active_company_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    /// Parsed id. Rows are only ever written with valid ULIDs.
    pub fn user_id(&self) -> Option<UserId> {
        UserId::from_string(&self.id).ok()
    }
}

/// Data structure for inserting a new user.
pub struct NewUser {
    pub id: UserId,
    pub email: Email,
    pub display_name: String,
    pub password_hash: Option<HashedPassword>,
    pub global_override: bool,
}

const COLUMNS: &str =
    "id, email, display_name, password_hash, global_override, active_company_id, created_at, updated_at";

/// Find a user by email address.
pub async fn find_by_email<'e, E>(executor: E, email: &Email) -> Result<Option<User>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE email = ?"))
        .bind(email.as_str())
        .fetch_optional(executor)
        .await
}

/// Find a user by ID.
pub async fn find_by_id<'e, E>(executor: E, user_id: &UserId) -> Result<Option<User>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"))
        .bind(user_id.as_str())
        .fetch_optional(executor)
        .await
}

/// Insert a new user. A duplicate id or email surfaces as a unique violation.
pub async fn insert<'e, E>(executor: E, user: &NewUser) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = now_ts();
    sqlx::query(
        "INSERT INTO users (id, email, display_name, password_hash, global_override, active_company_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, NULL, ?, ?)",
    )
    .bind(user.id.as_str())
    .bind(user.email.as_str())
    .bind(&user.display_name)
    .bind(user.password_hash.as_ref().map(|h| h.as_str().to_string()))
    .bind(user.global_override)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

/// Insert the user unless the id already exists. Returns true when a row was created.
pub async fn insert_if_absent<'e, E>(executor: E, user: &NewUser) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let now = now_ts();
    let result = sqlx::query(
        "INSERT INTO users (id, email, display_name, password_hash, global_override, active_company_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, NULL, ?, ?) ON CONFLICT (id) DO NOTHING",
    )
    .bind(user.id.as_str())
    .bind(user.email.as_str())
    .bind(&user.display_name)
    .bind(user.password_hash.as_ref().map(|h| h.as_str().to_string()))
    .bind(user.global_override)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Set or clear the active company of a principal.
pub async fn set_active_company<'e, E>(
    executor: E,
    user_id: &UserId,
    company_id: Option<&CompanyId>,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE users SET active_company_id = ?, updated_at = ? WHERE id = ?")
        .bind(company_id.map(CompanyId::as_str))
        .bind(now_ts())
        .bind(user_id.as_str())
        .execute(executor)
        .await?;
    Ok(())
}

/// Set the global override flag.
pub async fn set_global_override<'e, E>(
    executor: E,
    user_id: &UserId,
    global_override: bool,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE users SET global_override = ?, updated_at = ? WHERE id = ?")
        .bind(global_override)
        .bind(now_ts())
        .bind(user_id.as_str())
        .execute(executor)
        .await?;
    Ok(())
}

/// Update a user's password hash.
pub async fn update_password<'e, E>(
    executor: E,
    user_id: &UserId,
    password_hash: &HashedPassword,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash.as_str())
        .bind(now_ts())
        .bind(user_id.as_str())
        .execute(executor)
        .await?;
    Ok(())
}
