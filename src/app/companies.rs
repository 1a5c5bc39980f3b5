//! Tenant directory: creating companies and editing their settings.

use serde_json::json;
use sqlx::SqlitePool;

use crate::app::{
    audit::{self, actions, AuditEntry},
    authz,
    db::{self, companies::Company},
    domain::{ActionName, CompanyId, Email, ResourceName, Role, UserId},
    error::AppError,
    permissions,
};

const MAX_NAME_LEN: usize = 200;

fn clean_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Company name must be 1-{MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Create a company owned by `owner`.
///
/// The company row, the owner's admin membership and the default grants are
/// written in one transaction; the owner is never left without a role.
///
/// An operator (global override) creating a company for someone else's
/// contact address leaves it unclaimed: no membership is written, and the
/// principal holding the contact address claims admin and ownership through
/// promotion. The override already covers the operator meanwhile.
pub async fn create_company(
    pool: &SqlitePool,
    owner: &UserId,
    name: &str,
    contact_email: &Email,
) -> Result<Company, AppError> {
    let name = clean_name(name)?;
    let creator = db::users::find_by_id(pool, owner)
        .await?
        .ok_or_else(|| AppError::NotFound("not_found".to_string()))?;
    let unclaimed = creator.global_override && creator.email != contact_email.as_str();

    let company_id = CompanyId::new();
    let new_company = db::companies::NewCompany {
        id: company_id.clone(),
        name,
        contact_email: contact_email.clone(),
        owner_user_id: owner.clone(),
    };

    let mut tx = pool.begin().await?;
    db::companies::insert(&mut *tx, &new_company).await?;
    if !unclaimed {
        db::memberships::upsert(&mut *tx, &company_id, owner, Role::OWNER).await?;
    }
    let grants = permissions::seed_defaults(&mut tx, &company_id).await?;
    tx.commit().await?;

    let company = db::companies::find_by_id(pool, &company_id)
        .await?
        .ok_or(AppError::Internal)?;

    tracing::info!(%company_id, %owner, unclaimed, "created company");
    audit::record(
        pool,
        Some(owner),
        AuditEntry::new(
            owner,
            actions::CREATE_COMPANY,
            json!({
                "before": null,
                "after": {
                    "name": &company.name,
                    "contact_email": &company.contact_email,
                    "role": if unclaimed { None } else { Some(Role::OWNER) },
                },
                "unclaimed": unclaimed,
                "grants_seeded": grants,
            }),
        )
        .in_company(&company_id),
    )
    .await;

    Ok(company)
}

/// Load a company visible to `viewer` (`settings/view`).
pub async fn get_company(pool: &SqlitePool, viewer: &UserId, company_id: &CompanyId) -> Result<Company, AppError> {
    authz::require(pool, viewer, company_id, ResourceName::SETTINGS, ActionName::VIEW).await?;
    db::companies::find_by_id(pool, company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("not_found".to_string()))
}

/// Changes to a company's settings. Absent fields stay as they are.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub name: Option<String>,
    pub contact_email: Option<Email>,
}

/// Edit name and contact email. Requires `settings/edit`.
///
/// The contact email decides who can claim the company through promotion, so
/// the change is audited against the editor.
pub async fn update_settings(
    pool: &SqlitePool,
    editor: &UserId,
    company_id: &CompanyId,
    update: SettingsUpdate,
) -> Result<Company, AppError> {
    authz::require(pool, editor, company_id, ResourceName::SETTINGS, ActionName::EDIT).await?;

    let before = db::companies::find_by_id(pool, company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("not_found".to_string()))?;

    let name = match update.name.as_deref() {
        Some(name) => clean_name(name)?,
        None => before.name.clone(),
    };
    let contact_email = match update.contact_email {
        Some(email) => email,
        None => Email::new(&before.contact_email).map_err(|_| AppError::Internal)?,
    };

    db::companies::update_settings(pool, company_id, &name, &contact_email).await?;
    let after = db::companies::find_by_id(pool, company_id)
        .await?
        .ok_or(AppError::Internal)?;

    tracing::info!(%company_id, %editor, "updated company settings");
    audit::record(
        pool,
        Some(editor),
        AuditEntry::new(
            editor,
            actions::UPDATE_COMPANY,
            json!({
                "before": { "name": before.name, "contact_email": before.contact_email },
                "after": { "name": &after.name, "contact_email": &after.contact_email },
            }),
        )
        .in_company(company_id),
    )
    .await;

    Ok(after)
}
