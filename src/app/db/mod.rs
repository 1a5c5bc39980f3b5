pub mod audit_log;
pub mod companies;
pub mod memberships;
pub mod permission_grants;
pub mod sessions;
pub mod users;
pub mod verification_tokens;

pub use users::{find_by_email, NewUser, User};

/// Current time as stored in every `*_at` column.
pub(crate) fn now_ts() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// Begin a transaction that takes SQLite's write lock up front (`BEGIN IMMEDIATE`).
///
/// Read-then-write units of work use this so a concurrent writer makes them
/// wait on the busy timeout instead of failing on a stale snapshot.
pub async fn begin_write(pool: &sqlx::SqlitePool) -> Result<sqlx::Transaction<'static, sqlx::Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

/// Open a pool with WAL journaling and a busy timeout, then run embedded migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<sqlx::SqlitePool, sqlx::Error> {
    use std::{str::FromStr, time::Duration};

    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}
