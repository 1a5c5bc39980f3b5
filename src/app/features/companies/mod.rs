mod audit;
mod create;
mod members;
mod permissions;
mod settings;

use axum::Router;

use crate::app::{domain::CompanyId, error::AppError, AppState};

/// Company directory, membership, grant and audit routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(create::routes())
        .merge(settings::routes())
        .merge(members::routes())
        .merge(permissions::routes())
        .merge(audit::routes())
}

/// Parse a company id from a path. Malformed ids are indistinguishable from unknown ones.
pub(crate) fn parse_company_id(raw: &str) -> Result<CompanyId, AppError> {
    CompanyId::from_string(raw).map_err(|_| AppError::NotFound("not_found".to_string()))
}
