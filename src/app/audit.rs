//! Audit log.
//!
//! Every mutation of a principal, membership or permission grant appends one
//! record here, right after the primary write has returned. Writing the record
//! is best effort: a failure is logged and swallowed, never returned.

use serde_json::Value;
use sqlx::SqlitePool;

use crate::app::{
    authz,
    db::{self, audit_log::AuditRecord},
    domain::{ActionName, CompanyId, Email, ResourceName, UserId},
    error::AppError,
};

/// Address of the reserved system principal. `.invalid` never resolves, and
/// signups on this domain are refused.
pub const SYSTEM_ACTOR_EMAIL: &str = "system@fleetgate.invalid";
pub const RESERVED_DOMAIN: &str = "fleetgate.invalid";

/// Action tags written to `audit_log.action`.
pub mod actions {
    pub const CREATE_SYSTEM_ACTOR: &str = "CREATE_SYSTEM_ACTOR";
    pub const PROVISION_ACCOUNT: &str = "PROVISION_ACCOUNT";
    pub const CREATE_COMPANY: &str = "CREATE_COMPANY";
    pub const UPDATE_COMPANY: &str = "UPDATE_COMPANY";
    pub const ADD_MEMBERSHIP: &str = "ADD_MEMBERSHIP";
    pub const UPDATE_MEMBERSHIP: &str = "UPDATE_MEMBERSHIP";
    pub const REMOVE_MEMBERSHIP: &str = "REMOVE_MEMBERSHIP";
    pub const GRANT_PERMISSION: &str = "GRANT_PERMISSION";
    pub const REVOKE_PERMISSION: &str = "REVOKE_PERMISSION";
    pub const SEED_DEFAULT_GRANTS: &str = "SEED_DEFAULT_GRANTS";
    pub const SWITCH_TENANT: &str = "SWITCH_TENANT";
    pub const PROMOTE_TO_ADMIN: &str = "PROMOTE_TO_ADMIN";
    pub const SET_GLOBAL_OVERRIDE: &str = "SET_GLOBAL_OVERRIDE";
    pub const CHANGE_PASSWORD: &str = "CHANGE_PASSWORD";
}

/// One logical change, described before the actor is resolved.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub subject: UserId,
    pub company_id: Option<CompanyId>,
    pub action: &'static str,
    pub detail: Value,
}

impl AuditEntry {
    pub fn new(subject: &UserId, action: &'static str, detail: Value) -> Self {
        Self {
            subject: subject.clone(),
            company_id: None,
            action,
            detail,
        }
    }

    pub fn in_company(mut self, company_id: &CompanyId) -> Self {
        self.company_id = Some(company_id.clone());
        self
    }
}

/// True for addresses on the reserved system domain.
pub fn is_reserved_email(email: &Email) -> bool {
    email.domain() == RESERVED_DOMAIN
}

/// Look up the system actor, creating it on first use.
///
/// The system actor holds `global_override` so that it can be the performer of
/// privileged changes made by jobs or direct data edits.
pub async fn ensure_system_actor(pool: &SqlitePool) -> Result<UserId, sqlx::Error> {
    let system_id = UserId::system();
    if db::users::find_by_id(pool, &system_id).await?.is_some() {
        return Ok(system_id);
    }

    let email = Email::new(SYSTEM_ACTOR_EMAIL).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
    let actor = db::NewUser {
        id: system_id.clone(),
        email,
        display_name: "System".to_string(),
        password_hash: None,
        global_override: true,
    };

    if db::users::insert_if_absent(pool, &actor).await? {
        tracing::info!(user_id = %system_id, "created system actor");
        let entry = AuditEntry::new(
            &system_id,
            actions::CREATE_SYSTEM_ACTOR,
            serde_json::json!({ "before": null, "after": { "email": SYSTEM_ACTOR_EMAIL, "global_override": true } }),
        );
        append(pool, &system_id, &entry).await;
    }

    Ok(system_id)
}

/// Append one record. `actor` is the authenticated principal, or `None` when
/// the change has no interactive caller and the system actor is used instead.
pub async fn record(pool: &SqlitePool, actor: Option<&UserId>, entry: AuditEntry) {
    let actor_id = match actor {
        Some(id) => id.clone(),
        None => match ensure_system_actor(pool).await {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(%err, action = entry.action, subject = %entry.subject, "audit skipped: system actor unavailable");
                return;
            }
        },
    };
    append(pool, &actor_id, &entry).await;
}

async fn append(pool: &SqlitePool, actor_id: &UserId, entry: &AuditEntry) {
    let record = db::audit_log::NewAuditRecord {
        id: ulid::Ulid::new().to_string(),
        subject_user_id: entry.subject.clone(),
        company_id: entry.company_id.clone(),
        action: entry.action.to_string(),
        detail: entry.detail.to_string(),
        actor_user_id: actor_id.clone(),
    };

    if let Err(err) = db::audit_log::insert(pool, &record).await {
        tracing::warn!(%err, action = entry.action, subject = %entry.subject, actor = %actor_id, "audit write failed");
    }
}

/// Filter for [`list_for_company`].
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub action: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Audit records of a company, readable by principals holding `users/view` there.
pub async fn list_for_company(
    pool: &SqlitePool,
    viewer: &UserId,
    company_id: &CompanyId,
    filter: &AuditFilter,
) -> Result<Vec<AuditRecord>, AppError> {
    authz::require(pool, viewer, company_id, ResourceName::USERS, ActionName::VIEW).await?;

    let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = filter.offset.unwrap_or(0).max(0);
    let records = db::audit_log::list_for_company(
        pool,
        company_id,
        filter.action.as_deref(),
        limit,
        offset,
    )
    .await?;
    Ok(records)
}
