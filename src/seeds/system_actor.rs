use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::app::audit;
use crate::seeds::{Seed, SeedOutcome};

/// Creates the principal that performs changes nobody is logged in for.
pub struct SystemActor;

#[async_trait]
impl Seed for SystemActor {
    fn version(&self) -> i64 {
        20260301000100
    }

    fn description(&self) -> &str {
        "system_actor"
    }

    async fn run(&self, pool: &SqlitePool) -> Result<SeedOutcome, sqlx::Error> {
        audit::ensure_system_actor(pool).await?;
        Ok(SeedOutcome::Applied)
    }
}
