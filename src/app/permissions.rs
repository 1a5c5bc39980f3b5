//! Permission catalog: per-company grants and the default role templates.

use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};

use crate::app::{
    audit::{self, actions, AuditEntry},
    authz,
    db::{self, permission_grants::PermissionGrant},
    domain::{ActionName, CompanyId, ResourceName, Role, UserId},
    error::AppError,
};

/// Default `(resource, action)` pairs a role gets in a new company.
///
/// Admins and managers get everything, members can view and create, viewers
/// can only view.
pub fn default_template(role: Role) -> Vec<(&'static str, &'static str)> {
    let actions: &[&'static str] = match role {
        Role::Admin | Role::Manager => ActionName::DEFAULTS,
        Role::Member => &[ActionName::VIEW, ActionName::CREATE],
        Role::Viewer => &[ActionName::VIEW],
        Role::User => &[],
    };

    ResourceName::DEFAULTS
        .iter()
        .flat_map(|resource| actions.iter().map(move |action| (*resource, *action)))
        .collect()
}

const TEMPLATE_ROLES: [Role; 4] = [Role::Admin, Role::Manager, Role::Member, Role::Viewer];

/// Write the default grants for every role. Idempotent: existing rows only
/// have `updated_at` refreshed. Returns how many grants were written.
pub async fn seed_defaults(conn: &mut SqliteConnection, company_id: &CompanyId) -> Result<usize, sqlx::Error> {
    let mut written = 0;
    for role in TEMPLATE_ROLES {
        for (resource, action) in default_template(role) {
            let resource = ResourceName::new(resource).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
            let action = ActionName::new(action).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
            db::permission_grants::upsert(&mut *conn, company_id, role, &resource, &action).await?;
            written += 1;
        }
    }
    Ok(written)
}

/// Seed defaults for an existing company as one unit, then audit it.
/// `actor` is `None` for jobs, which run as the system actor.
pub async fn reseed_defaults(
    pool: &SqlitePool,
    actor: Option<&UserId>,
    company_id: &CompanyId,
) -> Result<usize, AppError> {
    let company = db::companies::find_by_id(pool, company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("not_found".to_string()))?;

    let mut tx = pool.begin().await?;
    let before = db::permission_grants::count_for_company(&mut *tx, company_id).await?;
    let written = seed_defaults(&mut tx, company_id).await?;
    let after = db::permission_grants::count_for_company(&mut *tx, company_id).await?;
    tx.commit().await?;

    let subject = actor
        .cloned()
        .or_else(|| UserId::from_string(&company.owner_user_id).ok())
        .unwrap_or_else(UserId::system);
    audit::record(
        pool,
        actor,
        AuditEntry::new(
            &subject,
            actions::SEED_DEFAULT_GRANTS,
            json!({ "before": { "grants": before }, "after": { "grants": after }, "written": written }),
        )
        .in_company(company_id),
    )
    .await;

    Ok(written)
}

fn parse_grant(role: Role, resource: &str, action: &str) -> Result<(ResourceName, ActionName), AppError> {
    if !role.is_membership_role() {
        return Err(AppError::Validation("role cannot hold grants".to_string()));
    }
    let resource = ResourceName::new(resource).map_err(|e| AppError::Validation(validation_message(&e)))?;
    let action = ActionName::new(action).map_err(|e| AppError::Validation(validation_message(&e)))?;
    Ok((resource, action))
}

fn validation_message(err: &validator::ValidationError) -> String {
    err.message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| err.code.to_string())
}

/// Add an explicit allow. Requires `settings/edit` in the company.
pub async fn set_grant(
    pool: &SqlitePool,
    editor: &UserId,
    company_id: &CompanyId,
    role: Role,
    resource: &str,
    action: &str,
) -> Result<(), AppError> {
    let (resource, action) = parse_grant(role, resource, action)?;
    authz::require(pool, editor, company_id, ResourceName::SETTINGS, ActionName::EDIT).await?;

    let existed =
        db::permission_grants::exists(pool, company_id, role, resource.as_str(), action.as_str()).await?;
    db::permission_grants::upsert(pool, company_id, role, &resource, &action).await?;

    tracing::info!(%company_id, %role, resource = resource.as_str(), action = action.as_str(), "granted permission");
    audit::record(
        pool,
        Some(editor),
        AuditEntry::new(
            editor,
            actions::GRANT_PERMISSION,
            json!({
                "role": role,
                "resource": resource,
                "action": action,
                "before": existed,
                "after": true,
            }),
        )
        .in_company(company_id),
    )
    .await;
    Ok(())
}

/// Remove an explicit allow. Requires `settings/edit` in the company.
pub async fn revoke_grant(
    pool: &SqlitePool,
    editor: &UserId,
    company_id: &CompanyId,
    role: Role,
    resource: &str,
    action: &str,
) -> Result<(), AppError> {
    let (resource, action) = parse_grant(role, resource, action)?;
    authz::require(pool, editor, company_id, ResourceName::SETTINGS, ActionName::EDIT).await?;

    let removed = db::permission_grants::delete(pool, company_id, role, &resource, &action).await?;
    if removed == 0 {
        return Err(AppError::NotFound("not_found".to_string()));
    }

    tracing::info!(%company_id, %role, resource = resource.as_str(), action = action.as_str(), "revoked permission");
    audit::record(
        pool,
        Some(editor),
        AuditEntry::new(
            editor,
            actions::REVOKE_PERMISSION,
            json!({
                "role": role,
                "resource": resource,
                "action": action,
                "before": true,
                "after": false,
            }),
        )
        .in_company(company_id),
    )
    .await;
    Ok(())
}

/// All grants of a company. Requires `settings/view`.
pub async fn list_grants(
    pool: &SqlitePool,
    viewer: &UserId,
    company_id: &CompanyId,
) -> Result<Vec<PermissionGrant>, AppError> {
    authz::require(pool, viewer, company_id, ResourceName::SETTINGS, ActionName::VIEW).await?;
    Ok(db::permission_grants::list_for_company(pool, company_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_and_manager_templates_cover_everything() {
        let full = ResourceName::DEFAULTS.len() * ActionName::DEFAULTS.len();
        assert_eq!(default_template(Role::Admin).len(), full);
        assert_eq!(default_template(Role::Manager).len(), full);
    }

    #[test]
    fn member_can_view_and_create_but_not_delete() {
        let template = default_template(Role::Member);
        assert!(template.contains(&("vehicles", "view")));
        assert!(template.contains(&("work_orders", "create")));
        assert!(!template.contains(&("vehicles", "delete")));
        assert!(!template.contains(&("settings", "edit")));
    }

    #[test]
    fn viewer_only_views() {
        let template = default_template(Role::Viewer);
        assert_eq!(template.len(), ResourceName::DEFAULTS.len());
        assert!(template.iter().all(|(_, action)| *action == "view"));
    }

    #[test]
    fn user_role_gets_nothing() {
        assert!(default_template(Role::User).is_empty());
    }
}
