use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::app::{
    audit::{self, actions, AuditEntry},
    authz,
    db::{self, User},
    domain::{CompanyId, Email, HashedPassword, Password},
    error::AppError,
    provisioning::{self, AccountDetails, PromotionOutcome},
    session::ApiAuthenticatedSession,
    tenant, AppState,
};

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub current_company_id: Option<String>,
    pub current_role: Option<String>,
}

/// GET /api/me — The principal, its current tenant and its role there.
pub async fn show(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
) -> Result<Json<MeResponse>, AppError> {
    let user = db::users::find_by_id(&state.db, &session.user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    let current = tenant::current_tenant(&state.db, &session.user_id).await?;
    let current_role = match &current {
        Some(company_id) => db::memberships::find(&state.db, company_id, &session.user_id)
            .await?
            .map(|m| m.role),
        None => None,
    };

    Ok(Json(MeResponse {
        user,
        current_company_id: current.map(|id| id.as_str()),
        current_role,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SwitchTenantRequest {
    pub company_id: Option<String>,
}

/// PUT /api/me/tenant — Pick the working company. Override principals only.
pub async fn switch_tenant(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
    Json(request): Json<SwitchTenantRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let company_id = request
        .company_id
        .as_deref()
        .map(CompanyId::from_string)
        .transpose()
        .map_err(|_| AppError::NotFound("not_found".to_string()))?;

    let active = tenant::set_active_tenant(&state.db, &session.user_id, company_id.as_ref()).await?;
    Ok(Json(json!({ "current_company_id": active.map(|id| id.as_str()) })))
}

#[derive(Debug, Serialize)]
pub struct PromoteResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: PromotionOutcome,
}

/// POST /api/me/promote — Claim the admin role of the company listing this address.
pub async fn promote(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
) -> Result<Json<PromoteResponse>, AppError> {
    let outcome = provisioning::promote_to_admin(&state.db, Some(&session.user_id), &session.user_id).await?;
    Ok(Json(PromoteResponse {
        success: true,
        outcome,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// POST /api/me/password — Update password after verifying the current one.
/// Validation first (no DB), then verify, then write.
pub async fn change_password(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    request
        .validate()
        .map_err(|_| AppError::Validation("New password must be 8-128 characters".to_string()))?;
    let new_password = Password::new(request.new_password).map_err(|e| {
        AppError::Validation(e.message.map(|m| m.into_owned()).unwrap_or_else(|| "Invalid new password".to_string()))
    })?;
    let password_hash = HashedPassword::from_password(&new_password).map_err(|_| AppError::Internal)?;

    let user = db::users::find_by_id(&state.db, &session.user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    let current = Password::for_verification(request.current_password);
    let verified = user
        .password_hash
        .map(HashedPassword::from_string)
        .is_some_and(|stored| stored.verify(&current).is_ok());
    if !verified {
        return Err(AppError::Auth("Current password is wrong".to_string()));
    }

    db::users::update_password(&state.db, &session.user_id, &password_hash).await?;

    audit::record(
        &state.db,
        Some(&session.user_id),
        AuditEntry::new(&session.user_id, actions::CHANGE_PASSWORD, json!({ "password_changed": true })),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProvisionAccountRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProvisionAccountResponse {
    pub user_id: String,
    pub company_id: Option<String>,
    pub role: Option<String>,
    pub created: bool,
}

/// POST /api/accounts — Operators create an account directly, skipping email
/// verification. Linked to the company sharing its email domain like a signup.
pub async fn provision(
    ApiAuthenticatedSession(session): ApiAuthenticatedSession,
    State(state): State<AppState>,
    Json(request): Json<ProvisionAccountRequest>,
) -> Result<(StatusCode, Json<ProvisionAccountResponse>), AppError> {
    if !authz::has_global_override(&state.db, &session.user_id).await {
        return Err(AppError::Forbidden);
    }
    request
        .validate()
        .map_err(|_| AppError::Validation("Invalid input".to_string()))?;
    let email = Email::new(&request.email).map_err(|_| AppError::Validation("Invalid email".to_string()))?;
    if audit::is_reserved_email(&email) {
        return Err(AppError::Validation("Email address is reserved".to_string()));
    }
    let password_hash = match request.password {
        Some(raw) => {
            let password = Password::new(raw).map_err(|e| {
                AppError::Validation(e.message.map(|m| m.into_owned()).unwrap_or_else(|| "Invalid password".to_string()))
            })?;
            Some(HashedPassword::from_password(&password).map_err(|_| AppError::Internal)?)
        }
        None => None,
    };

    let details = AccountDetails {
        email,
        display_name: request.display_name,
        password_hash,
    };
    let account =
        provisioning::provision_standalone(&state.db, Some(&session.user_id), &details, state.config.retry_policy())
            .await?;

    let status = if account.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(ProvisionAccountResponse {
            user_id: account.user_id.as_str(),
            company_id: account.company_id.as_ref().map(CompanyId::as_str),
            role: account.company_id.as_ref().map(|_| account.role.to_string()),
            created: account.created,
        }),
    ))
}

/// Account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(show))
        .route("/api/me/tenant", put(switch_tenant))
        .route("/api/me/promote", post(promote))
        .route("/api/me/password", post(change_password))
        .route("/api/accounts", post(provision))
}
