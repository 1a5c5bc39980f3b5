//! Tenant context selector.
//!
//! An ordinary principal is always scoped to the company of its oldest
//! membership. Only principals holding `global_override` can pick another
//! company (or none) to work in.

use serde_json::json;
use sqlx::SqlitePool;

use crate::app::{
    audit::{self, actions, AuditEntry},
    db,
    domain::{CompanyId, UserId},
    error::AppError,
};

/// The company `principal` is currently working in, if any.
pub async fn current_tenant(pool: &SqlitePool, principal: &UserId) -> Result<Option<CompanyId>, AppError> {
    let user = db::users::find_by_id(pool, principal)
        .await?
        .ok_or_else(|| AppError::NotFound("not_found".to_string()))?;

    let raw = if user.global_override {
        user.active_company_id
    } else {
        db::memberships::first_for_user(pool, principal)
            .await?
            .map(|m| m.company_id)
    };

    Ok(raw.and_then(|id| CompanyId::from_string(&id).ok()))
}

/// Switch the active company of an override principal. `None` clears it.
pub async fn set_active_tenant(
    pool: &SqlitePool,
    principal: &UserId,
    company_id: Option<&CompanyId>,
) -> Result<Option<CompanyId>, AppError> {
    let user = db::users::find_by_id(pool, principal)
        .await?
        .ok_or_else(|| AppError::NotFound("not_found".to_string()))?;
    if !user.global_override {
        return Err(AppError::Forbidden);
    }

    if let Some(company_id) = company_id {
        if db::companies::find_by_id(pool, company_id).await?.is_none() {
            return Err(AppError::NotFound("not_found".to_string()));
        }
    }

    let before = user.active_company_id;
    db::users::set_active_company(pool, principal, company_id).await?;

    tracing::info!(%principal, company_id = ?company_id.map(CompanyId::as_str), "switched tenant");
    let mut entry = AuditEntry::new(
        principal,
        actions::SWITCH_TENANT,
        json!({ "before": before, "after": company_id.map(CompanyId::as_str) }),
    );
    if let Some(company_id) = company_id {
        entry = entry.in_company(company_id);
    }
    audit::record(pool, Some(principal), entry).await;

    Ok(company_id.cloned())
}
