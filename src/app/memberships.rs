//! Membership store: who belongs to which company, in which role.

use serde_json::json;
use sqlx::SqlitePool;

use crate::app::{
    audit::{self, actions, AuditEntry},
    authz,
    db::{self, memberships::Membership},
    domain::{ActionName, CompanyId, ResourceName, Role, UserId},
    error::AppError,
};

/// Insert or update the role of `user_id` in `company_id`.
///
/// This is the internal entry point: it is not permission-gated, callers that
/// act on behalf of a principal go through [`assign_role`]. The company owner
/// is pinned to the owner role.
pub async fn add_membership(
    pool: &SqlitePool,
    actor: Option<&UserId>,
    company_id: &CompanyId,
    user_id: &UserId,
    role: Role,
) -> Result<Membership, AppError> {
    if !role.is_membership_role() {
        return Err(AppError::Validation(format!("{role} is not a membership role")));
    }

    let company = db::companies::find_by_id(pool, company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("not_found".to_string()))?;
    if db::users::find_by_id(pool, user_id).await?.is_none() {
        return Err(AppError::NotFound("not_found".to_string()));
    }
    if company.owner_user_id == user_id.as_str() && role != Role::OWNER {
        return Err(AppError::Conflict("owner_role_locked".to_string()));
    }

    let before = db::memberships::find(pool, company_id, user_id).await?;
    db::memberships::upsert(pool, company_id, user_id, role).await?;
    let after = db::memberships::find(pool, company_id, user_id)
        .await?
        .ok_or(AppError::Internal)?;

    let action = if before.is_some() {
        actions::UPDATE_MEMBERSHIP
    } else {
        actions::ADD_MEMBERSHIP
    };
    tracing::info!(%company_id, %user_id, %role, action, "membership written");
    audit::record(
        pool,
        actor,
        AuditEntry::new(
            user_id,
            action,
            json!({
                "before": before.as_ref().map(|m| &m.role),
                "after": &after.role,
            }),
        )
        .in_company(company_id),
    )
    .await;

    Ok(after)
}

/// Set a member's role on behalf of `editor`. Requires `users/edit`, and an
/// editor can neither grant nor override a role ranked above their own.
pub async fn assign_role(
    pool: &SqlitePool,
    editor: &UserId,
    company_id: &CompanyId,
    user_id: &UserId,
    role: Role,
) -> Result<Membership, AppError> {
    authz::require(pool, editor, company_id, ResourceName::USERS, ActionName::EDIT).await?;

    let current = db::memberships::find_role(pool, company_id, user_id).await?;
    let needed = role.rank().max(current.map(Role::rank).unwrap_or(0));
    check_rank(pool, editor, company_id, needed).await?;

    add_membership(pool, Some(editor), company_id, user_id, role).await
}

/// Remove a member. Requires `users/delete`. The owner cannot be removed.
pub async fn remove_membership(
    pool: &SqlitePool,
    editor: &UserId,
    company_id: &CompanyId,
    user_id: &UserId,
) -> Result<(), AppError> {
    authz::require(pool, editor, company_id, ResourceName::USERS, ActionName::DELETE).await?;

    let company = db::companies::find_by_id(pool, company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("not_found".to_string()))?;
    if company.owner_user_id == user_id.as_str() {
        return Err(AppError::Conflict("owner_role_locked".to_string()));
    }

    let Some(before) = db::memberships::find(pool, company_id, user_id).await? else {
        return Err(AppError::NotFound("not_found".to_string()));
    };
    if let Some(role) = before.role() {
        check_rank(pool, editor, company_id, role.rank()).await?;
    }

    db::memberships::delete(pool, company_id, user_id).await?;

    tracing::info!(%company_id, %user_id, "membership removed");
    audit::record(
        pool,
        Some(editor),
        AuditEntry::new(
            user_id,
            actions::REMOVE_MEMBERSHIP,
            json!({ "before": before.role, "after": null }),
        )
        .in_company(company_id),
    )
    .await;
    Ok(())
}

/// Members of a company, oldest first. Requires `users/view`.
pub async fn list_members(
    pool: &SqlitePool,
    viewer: &UserId,
    company_id: &CompanyId,
) -> Result<Vec<Membership>, AppError> {
    authz::require(pool, viewer, company_id, ResourceName::USERS, ActionName::VIEW).await?;
    Ok(db::memberships::list_for_company(pool, company_id).await?)
}

async fn check_rank(
    pool: &SqlitePool,
    editor: &UserId,
    company_id: &CompanyId,
    needed: u8,
) -> Result<(), AppError> {
    if authz::has_global_override(pool, editor).await {
        return Ok(());
    }
    let editor_rank = db::memberships::find_role(pool, company_id, editor)
        .await?
        .map(Role::rank)
        .unwrap_or(0);
    if editor_rank < needed {
        return Err(AppError::Forbidden);
    }
    Ok(())
}
