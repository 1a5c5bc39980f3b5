use std::env;

use async_trait::async_trait;
use rand::prelude::{IndexedRandom, SliceRandom};
use serde_json::json;
use sqlx::SqlitePool;

use crate::app::audit::{self, actions, AuditEntry};
use crate::app::db::{self, NewUser};
use crate::app::domain::{Email, HashedPassword, Password, UserId};
use crate::seeds::{Seed, SeedOutcome};

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGIT: &[u8] = b"0123456789";

fn pick(rng: &mut impl rand::Rng, set: &[u8]) -> char {
    set.choose(rng).copied().unwrap_or(b'x') as char
}

fn random_password() -> String {
    let mut rng = rand::rng();
    let mut chars: Vec<char> = vec![
        pick(&mut rng, UPPER),
        pick(&mut rng, LOWER),
        pick(&mut rng, DIGIT),
    ];
    let pool: Vec<u8> = UPPER.iter().chain(LOWER).chain(DIGIT).copied().collect();
    for _ in 0..12 {
        chars.push(pick(&mut rng, &pool));
    }
    chars.shuffle(&mut rng);
    chars.into_iter().collect()
}

/// Creates a platform operator (global override) for local development from
/// `SEED_OPERATOR_EMAIL`. Skipped when the variable is unset.
pub struct DevOperator;

#[async_trait]
impl Seed for DevOperator {
    fn version(&self) -> i64 {
        20260301000200
    }

    fn description(&self) -> &str {
        "dev_operator"
    }

    async fn run(&self, pool: &SqlitePool) -> Result<SeedOutcome, sqlx::Error> {
        let email = match env::var("SEED_OPERATOR_EMAIL").ok().map(Email::new) {
            Some(Ok(email)) => email,
            _ => return Ok(SeedOutcome::Skipped),
        };
        if audit::is_reserved_email(&email) {
            return Ok(SeedOutcome::Skipped);
        }
        if let Some(existing) = db::find_by_email(pool, &email).await? {
            // Existing account: grant the override, keep its password.
            if !existing.global_override {
                let user_id = UserId::from_string(&existing.id).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
                db::users::set_global_override(pool, &user_id, true).await?;
                audit::record(
                    pool,
                    None,
                    AuditEntry::new(
                        &user_id,
                        actions::SET_GLOBAL_OVERRIDE,
                        json!({ "before": { "global_override": false }, "after": { "global_override": true } }),
                    ),
                )
                .await;
                eprintln!("Granted global override to {}", email.as_str());
            }
            return Ok(SeedOutcome::Applied);
        }

        let password = Password::new(random_password()).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
        let password_hash =
            HashedPassword::from_password(&password).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
        let user_id = UserId::new();

        db::users::insert(
            pool,
            &NewUser {
                id: user_id.clone(),
                email: email.clone(),
                display_name: "Operator".to_string(),
                password_hash: Some(password_hash),
                global_override: true,
            },
        )
        .await?;

        audit::record(
            pool,
            None,
            AuditEntry::new(
                &user_id,
                actions::SET_GLOBAL_OVERRIDE,
                json!({ "before": null, "after": { "email": email.as_str(), "global_override": true } }),
            ),
        )
        .await;

        eprintln!(
            "Created operator: {} / {}",
            email.as_str(),
            String::from_utf8_lossy(password.as_bytes())
        );
        Ok(SeedOutcome::Applied)
    }
}
