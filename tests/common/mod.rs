#![allow(dead_code)]

use axum::body::Body;
use fleetgate::app::{
    self,
    db,
    domain::{CompanyId, Email, HashedPassword, Password, UserId},
};
use fleetgate::create_router;
use http_body_util::BodyExt;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tower::ServiceExt;

pub const PASSWORD: &str = "Password123";

/// In-memory database with migrations applied. A single connection, so
/// every query sees the same database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

/// File-backed database with several connections, for tests that race
/// writers against each other. Each call gets a fresh file.
pub async fn file_pool() -> SqlitePool {
    let path = std::env::temp_dir().join(format!("fleetgate-{}.db", ulid::Ulid::new()));
    db::connect(&format!("sqlite://{}", path.display()), 8).await.unwrap()
}

pub fn test_state(pool: SqlitePool) -> app::AppState {
    app::AppState {
        db: pool,
        mail: std::sync::Arc::new(app::mail::ConsoleMailer),
        config: app::config::Config::for_tests(),
    }
}

pub fn test_router(pool: SqlitePool) -> axum::Router {
    create_router(test_state(pool))
}

/// Create a principal directly in the database (bypasses signup).
pub async fn create_user(pool: &SqlitePool, email: &str, global_override: bool) -> UserId {
    let password = Password::new(PASSWORD.to_string()).unwrap();
    let user_id = UserId::new();
    db::users::insert(
        pool,
        &db::NewUser {
            id: user_id.clone(),
            email: Email::new(email).unwrap(),
            display_name: email.split('@').next().unwrap().to_string(),
            password_hash: Some(HashedPassword::from_password(&password).unwrap()),
            global_override,
        },
    )
    .await
    .unwrap();
    user_id
}

/// Create a company owned by `owner` with default grants. The owner becomes
/// its admin unless an operator is creating it for another contact address.
pub async fn create_company(pool: &SqlitePool, owner: &UserId, name: &str, contact_email: &str) -> CompanyId {
    let company = app::companies::create_company(pool, owner, name, &Email::new(contact_email).unwrap())
        .await
        .unwrap();
    CompanyId::from_string(&company.id).unwrap()
}

/// Company with a fresh owner. Returns (company, owner).
pub async fn company_with_owner(pool: &SqlitePool, name: &str, owner_email: &str) -> (CompanyId, UserId) {
    let owner = create_user(pool, owner_email, false).await;
    let company = create_company(pool, &owner, name, owner_email).await;
    (company, owner)
}

/// Make `user` a member of `company` with `role`, as the system actor.
pub async fn add_member(pool: &SqlitePool, company: &CompanyId, user: &UserId, role: app::domain::Role) {
    app::memberships::add_membership(pool, None, company, user, role)
        .await
        .unwrap();
}

pub async fn audit_count(pool: &SqlitePool, action: &str) -> i64 {
    sqlx::query_scalar("SELECT count(*) FROM audit_log WHERE action = ?")
        .bind(action)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn audit_total(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT count(*) FROM audit_log")
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn extract_session_id_from_cookie(set_cookie_header: &str) -> Option<&str> {
    set_cookie_header.split(';').next()?.strip_prefix("session_id=")
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Option<serde_json::Value>) -> http::Request<Body> {
    let mut builder = http::Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

/// Log in through the API and return a `cookie` header value.
pub async fn login_cookie(app: &axum::Router, email: &str, password: &str) -> String {
    let request = json_request(
        "POST",
        "/api/login",
        None,
        Some(serde_json::json!({ "email": email, "password": password })),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);

    let set_cookie = response
        .headers()
        .get("set-cookie")
        .expect("login must set a session cookie")
        .to_str()
        .unwrap();
    let session_id = extract_session_id_from_cookie(set_cookie).expect("cookie must contain session_id");
    format!("session_id={session_id}")
}

/// Latest token value issued for an email.
pub async fn latest_token(pool: &SqlitePool, email: &str) -> String {
    sqlx::query_scalar("SELECT token FROM verification_tokens WHERE email = ? ORDER BY created_at DESC, rowid DESC LIMIT 1")
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Push a token's expiry into the past.
pub async fn expire_token(pool: &SqlitePool, token: &str) {
    sqlx::query("UPDATE verification_tokens SET expires_at = created_at - 1 WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await
        .unwrap();
}
