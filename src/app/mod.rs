use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;

/// Human-readable application name, used in outgoing mail.
pub const APP_NAME: &str = "Fleetgate";

/// Shared state available to all handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub mail: Arc<dyn mail::EmailSender>,
    pub config: config::Config,
}

/// JSON API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(features::auth::routes())
        .merge(features::account::routes())
        .merge(features::authorize::routes())
        .merge(features::companies::routes())
}

pub mod audit;
pub mod authz;
pub mod companies;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod features;
pub mod mail;
pub mod memberships;
pub mod permissions;
pub mod provisioning;
pub mod session;
pub mod tenant;
pub mod verification;
