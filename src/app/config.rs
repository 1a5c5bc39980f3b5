use std::time::Duration;

use crate::app::provisioning::RetryPolicy;

/// Centralized environment configuration.
/// All env vars and defaults are defined here.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL. Required.
    pub database_url: String,

    /// Address the HTTP server binds to.
    /// Default: 0.0.0.0:3000
    pub bind_addr: String,

    /// Base URL for generating links in emails.
    /// Default: http://localhost:3000
    pub app_url: String,

    /// From/reply address for outgoing emails.
    /// Default: please-configure@example.com
    pub mail_from: String,

    /// Mail adapter: "console" or "smtp".
    /// Default: console
    pub mail_adapter: String,

    /// SMTP host. Required when mail_adapter=smtp.
    pub smtp_host: Option<String>,

    /// SMTP port.
    /// Default: 587
    pub smtp_port: u16,

    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,

    /// Lifetime of a verification token.
    /// Default: 24
    pub verification_ttl_hours: i64,

    /// Attempts at creating an account before a uniqueness conflict is surfaced.
    /// Default: 3
    pub provision_max_attempts: u32,

    /// Base backoff between provisioning attempts; attempt N waits N * base.
    /// Default: 50
    pub provision_backoff_ms: u64,

    /// Session lifetime.
    /// Default: 30
    pub session_ttl_days: i64,
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{name} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Build config from environment variables.
    /// Returns an error if required vars are missing or malformed.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set in .env")?;

        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let app_url = std::env::var("APP_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let mail_from = std::env::var("MAIL_FROM")
            .unwrap_or_else(|_| "please-configure@example.com".to_string());

        let mail_adapter = std::env::var("MAIL_ADAPTER")
            .unwrap_or_else(|_| "console".to_string());

        let smtp_host = std::env::var("SMTP_HOST").ok();
        let smtp_port = parse_env("SMTP_PORT", 587u16)?;
        let smtp_user = std::env::var("SMTP_USER").ok();
        let smtp_pass = std::env::var("SMTP_PASS").ok();

        let verification_ttl_hours = parse_env("VERIFICATION_TTL_HOURS", 24i64)?;
        let provision_max_attempts = parse_env("PROVISION_MAX_ATTEMPTS", 3u32)?;
        let provision_backoff_ms = parse_env("PROVISION_BACKOFF_MS", 50u64)?;
        let session_ttl_days = parse_env("SESSION_TTL_DAYS", 30i64)?;

        if verification_ttl_hours <= 0 {
            return Err("VERIFICATION_TTL_HOURS must be positive".to_string());
        }
        if provision_max_attempts == 0 {
            return Err("PROVISION_MAX_ATTEMPTS must be at least 1".to_string());
        }

        Ok(Self {
            database_url,
            bind_addr,
            app_url,
            mail_from,
            mail_adapter,
            smtp_host,
            smtp_port,
            smtp_user,
            smtp_pass,
            verification_ttl_hours,
            provision_max_attempts,
            provision_backoff_ms,
            session_ttl_days,
        })
    }

    /// Returns the base URL without trailing slash, for building links.
    pub fn app_url_base(&self) -> &str {
        self.app_url.trim_end_matches('/')
    }

    pub fn verification_ttl(&self) -> time::Duration {
        time::Duration::hours(self.verification_ttl_hours)
    }

    pub fn session_ttl(&self) -> time::Duration {
        time::Duration::days(self.session_ttl_days)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.provision_max_attempts,
            backoff: Duration::from_millis(self.provision_backoff_ms),
        }
    }

    /// Config for tests. Uses in-memory database URL and console mailer.
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            app_url: "http://localhost:3000".to_string(),
            mail_from: "test@example.com".to_string(),
            mail_adapter: "console".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_user: None,
            smtp_pass: None,
            verification_ttl_hours: 24,
            provision_max_attempts: 3,
            provision_backoff_ms: 1,
            session_ttl_days: 30,
        }
    }
}
