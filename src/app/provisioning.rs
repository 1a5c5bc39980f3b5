//! Account provisioning and promotion.
//!
//! Provisioning turns a verified signup into a principal, attaching it to the
//! company whose contact email shares its domain. Promotion lets a principal
//! claim the admin role of the company that lists its exact address as
//! contact email.

use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};

use crate::app::{
    audit::{self, actions, AuditEntry},
    db::{self, User},
    domain::{CompanyId, Email, HashedPassword, Role, UserId},
    error::{is_busy, is_unique_violation, AppError},
    permissions,
};

/// Bounded retry for account creation racing another writer.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Attempt `n` waits `n * backoff` before trying again.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// What a new principal is made from.
#[derive(Debug, Clone)]
pub struct AccountDetails {
    pub email: Email,
    pub display_name: String,
    pub password_hash: Option<HashedPassword>,
}

/// Result of provisioning. `created` is false when the principal existed.
#[derive(Debug, Clone)]
pub struct ProvisionedAccount {
    pub user: User,
    pub user_id: UserId,
    pub company_id: Option<CompanyId>,
    pub role: Role,
    pub created: bool,
    pub membership_created: bool,
    pub attempts: u32,
}

impl ProvisionedAccount {
    /// True when provisioning wrote anything.
    pub fn changed(&self) -> bool {
        self.created || self.membership_created
    }
}

impl RetryPolicy {
    /// Linear backoff: attempt `n` waits `n * backoff`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// A write that lost a race with another writer: lock contention, a
/// uniqueness conflict, or no free connection. A fresh transaction may succeed.
pub(crate) fn is_retryable(err: &AppError) -> bool {
    match err {
        AppError::Database(err) => {
            is_busy(err) || is_unique_violation(err) || matches!(err, sqlx::Error::PoolTimedOut)
        }
        _ => false,
    }
}

/// Find or create the principal for `details` and link it to the company
/// matching its email domain. One attempt, on the caller's transaction.
///
/// Idempotent: a second call for the same email returns the existing
/// principal and writes nothing. A concurrent creator surfaces as a unique
/// violation; callers retry the whole transaction (see [`is_retryable`]).
pub async fn provision_account(
    conn: &mut SqliteConnection,
    details: &AccountDetails,
) -> Result<ProvisionedAccount, AppError> {
    let (user, created) = match db::users::find_by_email(&mut *conn, &details.email).await? {
        Some(existing) => (existing, false),
        None => {
            let new_user = db::NewUser {
                id: UserId::new(),
                email: details.email.clone(),
                display_name: details.display_name.clone(),
                password_hash: details.password_hash.clone(),
                global_override: false,
            };
            db::users::insert(&mut *conn, &new_user).await?;
            let user = db::users::find_by_id(&mut *conn, &new_user.id)
                .await?
                .ok_or(AppError::Internal)?;
            (user, true)
        }
    };

    let user_id = user.user_id().ok_or(AppError::Internal)?;

    let Some(company) = db::companies::find_by_contact_domain(&mut *conn, details.email.domain()).await? else {
        return Ok(ProvisionedAccount {
            user,
            user_id,
            company_id: None,
            role: Role::User,
            created,
            membership_created: false,
            attempts: 1,
        });
    };

    let company_id = CompanyId::from_string(&company.id).map_err(|_| AppError::Internal)?;
    let (role, membership_created) =
        match db::memberships::find_role(&mut *conn, &company_id, &user_id).await? {
            Some(role) => (role, false),
            None => {
                db::memberships::upsert(&mut *conn, &company_id, &user_id, Role::Member).await?;
                permissions::seed_defaults(&mut *conn, &company_id).await?;
                (Role::Member, true)
            }
        };

    Ok(ProvisionedAccount {
        user,
        user_id,
        company_id: Some(company_id),
        role,
        created,
        membership_created,
        attempts: 1,
    })
}

/// Append the audit record for a provisioning run, if it wrote anything.
pub async fn record_provisioned(pool: &SqlitePool, actor: Option<&UserId>, account: &ProvisionedAccount, source: &str) {
    if !account.changed() {
        return;
    }

    let mut entry = AuditEntry::new(
        &account.user_id,
        actions::PROVISION_ACCOUNT,
        json!({
            "source": source,
            "before": if account.created { serde_json::Value::Null } else { json!({ "email": &account.user.email }) },
            "after": {
                "email": &account.user.email,
                "company_id": account.company_id.as_ref().map(CompanyId::as_str),
                "role": account.role,
            },
            "created": account.created,
            "membership_created": account.membership_created,
            "attempts": account.attempts,
        }),
    );
    if let Some(company_id) = &account.company_id {
        entry = entry.in_company(company_id);
    }
    audit::record(pool, actor, entry).await;
}

async fn provision_once(pool: &SqlitePool, details: &AccountDetails) -> Result<ProvisionedAccount, AppError> {
    let mut tx = db::begin_write(pool).await?;
    let account = provision_account(&mut tx, details).await?;
    tx.commit().await?;
    Ok(account)
}

/// Provision in a transaction of its own, e.g. an operator creating an
/// account directly. Racing creators of the same email all end up with the
/// one principal that won; only a race that outlasts `policy` fails, with
/// `Conflict("account_conflict")`.
pub async fn provision_standalone(
    pool: &SqlitePool,
    actor: Option<&UserId>,
    details: &AccountDetails,
    policy: RetryPolicy,
) -> Result<ProvisionedAccount, AppError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    let mut account = loop {
        attempt += 1;
        match provision_once(pool, details).await {
            Ok(account) => break account,
            Err(err) if is_retryable(&err) && attempt < max_attempts => {
                tracing::debug!(%err, email = %details.email, attempt, "account provisioning retrying");
                tokio::time::sleep(policy.delay(attempt)).await;
            }
            Err(err) if is_retryable(&err) => {
                tracing::warn!(%err, email = %details.email, attempt, "account provisioning gave up");
                return Err(AppError::Conflict("account_conflict".to_string()));
            }
            Err(err) => return Err(err),
        }
    };
    account.attempts = attempt;

    if account.changed() {
        tracing::info!(user_id = %account.user_id, role = %account.role, "provisioned account");
    }
    record_provisioned(pool, actor, &account, "standalone").await;
    Ok(account)
}

/// Success shape of [`promote_to_admin`].
#[derive(Debug, Clone, Serialize)]
pub struct PromotionOutcome {
    pub already_admin: bool,
    pub role: Role,
    pub company_id: String,
}

/// Make `principal` the admin and owner of the company whose contact email is
/// exactly the principal's email.
///
/// - already admin somewhere: success, nothing written
/// - no company lists the address: `NotFound("no_matching_company")`
/// - that company already has another admin: `Conflict("company_has_admin")`
///
/// Companies an operator set up for a customer start without an admin; this
/// is how the customer claims them. `global_override` is never touched.
pub async fn promote_to_admin(
    pool: &SqlitePool,
    actor: Option<&UserId>,
    principal: &UserId,
) -> Result<PromotionOutcome, AppError> {
    let started = Instant::now();

    let user = db::users::find_by_id(pool, principal)
        .await?
        .ok_or_else(|| AppError::NotFound("not_found".to_string()))?;

    if let Some(existing) = db::memberships::find_admin_for_user(pool, principal).await? {
        tracing::debug!(%principal, company_id = %existing.company_id, "already admin");
        return Ok(PromotionOutcome {
            already_admin: true,
            role: Role::Admin,
            company_id: existing.company_id,
        });
    }

    let email = Email::new(&user.email).map_err(|_| AppError::Internal)?;
    let company = db::companies::find_by_contact_email(pool, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("no_matching_company".to_string()))?;
    let company_id = CompanyId::from_string(&company.id).map_err(|_| AppError::Internal)?;

    // The admin check and the claim share the write lock, so two claimants
    // cannot both win.
    let mut tx = db::begin_write(pool).await?;
    if db::memberships::find_other_admin(&mut *tx, &company_id, principal).await?.is_some() {
        return Err(AppError::Conflict("company_has_admin".to_string()));
    }
    let previous = db::memberships::find(&mut *tx, &company_id, principal).await?;
    db::memberships::upsert(&mut *tx, &company_id, principal, Role::Admin).await?;
    db::companies::set_owner(&mut *tx, &company_id, principal).await?;
    let grants = permissions::seed_defaults(&mut tx, &company_id).await?;
    tx.commit().await?;

    let after = db::users::find_by_id(pool, principal)
        .await?
        .ok_or(AppError::Internal)?;
    let override_preserved = after.global_override == user.global_override;
    let duration_ms = started.elapsed().as_millis() as u64;

    tracing::info!(%principal, %company_id, duration_ms, "promoted to admin");
    audit::record(
        pool,
        actor,
        AuditEntry::new(
            principal,
            actions::PROMOTE_TO_ADMIN,
            json!({
                "company_id": &company.id,
                "company_name": &company.name,
                "matched_on": "contact_email",
                "before": previous.map(|m| m.role),
                "after": Role::Admin,
                "previous_owner": &company.owner_user_id,
                "grants_seeded": grants,
                "global_override": user.global_override,
                "global_override_preserved": override_preserved,
                "duration_ms": duration_ms,
            }),
        )
        .in_company(&company_id),
    )
    .await;

    Ok(PromotionOutcome {
        already_admin: false,
        role: Role::Admin,
        company_id: company.id,
    })
}
