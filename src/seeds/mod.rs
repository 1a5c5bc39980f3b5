//! Versioned bootstrap data. Each seed runs once per database and is tracked
//! in `_fleetgate_seeds`; a seed that opts out is left untracked and retried
//! on the next start.

mod dev_operator;
mod system_actor;

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Applied,
    /// Preconditions not met (e.g. env var unset). Not recorded.
    Skipped,
}

#[async_trait]
pub trait Seed: Send + Sync {
    /// `YYYYMMDDHHMMSS`; seeds run in ascending order.
    fn version(&self) -> i64;

    fn description(&self) -> &str;

    async fn run(&self, pool: &SqlitePool) -> Result<SeedOutcome, sqlx::Error>;
}

pub fn all_seeds() -> Vec<Box<dyn Seed>> {
    let mut seeds: Vec<Box<dyn Seed>> = vec![
        Box::new(system_actor::SystemActor),
        Box::new(dev_operator::DevOperator),
    ];
    seeds.sort_by_key(|s| s.version());
    seeds
}

/// Apply every untracked seed on an existing pool. Returns the versions applied now.
pub async fn run_seeds(pool: &SqlitePool) -> Result<Vec<i64>, sqlx::Error> {
    ensure_seeds_table(pool).await?;
    let tracked = applied_versions(pool).await?;

    let mut applied = Vec::new();
    for seed in all_seeds().into_iter().filter(|s| !tracked.contains(&s.version())) {
        match seed.run(pool).await? {
            SeedOutcome::Applied => {
                record_seed(pool, seed.version(), seed.description()).await?;
                tracing::info!(version = seed.version(), seed = seed.description(), "seed applied");
                applied.push(seed.version());
            }
            SeedOutcome::Skipped => {
                tracing::debug!(seed = seed.description(), "seed skipped");
            }
        }
    }
    Ok(applied)
}

pub async fn ensure_seeds_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _fleetgate_seeds (
            version INTEGER PRIMARY KEY NOT NULL,
            description TEXT NOT NULL,
            applied_at INTEGER NOT NULL DEFAULT (unixepoch())
        )",
    )
    .execute(pool)
    .await
    .map(|_| ())
}

pub async fn applied_versions(pool: &SqlitePool) -> Result<HashSet<i64>, sqlx::Error> {
    let versions: Vec<i64> = sqlx::query_scalar("SELECT version FROM _fleetgate_seeds")
        .fetch_all(pool)
        .await?;
    Ok(versions.into_iter().collect())
}

pub async fn record_seed(pool: &SqlitePool, version: i64, description: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR REPLACE INTO _fleetgate_seeds (version, description) VALUES (?, ?)")
        .bind(version)
        .bind(description)
        .execute(pool)
        .await
        .map(|_| ())
}

/// Untrack a version so it runs again.
pub async fn forget_seed(pool: &SqlitePool, version: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM _fleetgate_seeds WHERE version = ?")
        .bind(version)
        .execute(pool)
        .await
        .map(|_| ())
}
