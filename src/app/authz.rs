//! Authorization engine.
//!
//! One question, one answer: may `principal` perform `action` on `resource`
//! inside `company`? Precedence:
//!
//! 1. `global_override` on the principal: allow, regardless of membership.
//! 2. No membership in the company: deny.
//! 3. Otherwise allow iff the company grants `(role, resource, action)`.
//!
//! Anything that goes wrong while answering is a deny. The engine reads only;
//! it is never audited and never asks itself for permission.

use sqlx::SqlitePool;

use crate::app::{
    db,
    domain::{CompanyId, UserId},
    error::AppError,
};

/// Evaluate a permission check. Never errors: store faults fail closed.
pub async fn authorize(
    pool: &SqlitePool,
    principal: &UserId,
    company_id: &CompanyId,
    resource: &str,
    action: &str,
) -> bool {
    match decide(pool, principal, company_id, resource, action).await {
        Ok(allowed) => allowed,
        Err(err) => {
            tracing::warn!(%err, %principal, %company_id, resource, action, "authorization check failed, denying");
            false
        }
    }
}

/// Like [`authorize`] but as a guard: `Forbidden` on deny.
pub async fn require(
    pool: &SqlitePool,
    principal: &UserId,
    company_id: &CompanyId,
    resource: &str,
    action: &str,
) -> Result<(), AppError> {
    if authorize(pool, principal, company_id, resource, action).await {
        Ok(())
    } else {
        tracing::debug!(%principal, %company_id, resource, action, "permission denied");
        Err(AppError::Forbidden)
    }
}

/// Whether the principal carries the global override flag. Unknown principals do not.
pub async fn has_global_override(pool: &SqlitePool, principal: &UserId) -> bool {
    match db::users::find_by_id(pool, principal).await {
        Ok(user) => user.map(|u| u.global_override).unwrap_or(false),
        Err(err) => {
            tracing::warn!(%err, %principal, "override lookup failed, treating as ordinary principal");
            false
        }
    }
}

async fn decide(
    pool: &SqlitePool,
    principal: &UserId,
    company_id: &CompanyId,
    resource: &str,
    action: &str,
) -> Result<bool, sqlx::Error> {
    let Some(user) = db::users::find_by_id(pool, principal).await? else {
        return Ok(false);
    };
    if user.global_override {
        return Ok(true);
    }

    let Some(role) = db::memberships::find_role(pool, company_id, principal).await? else {
        return Ok(false);
    };

    db::permission_grants::exists(pool, company_id, role, resource, action).await
}
