use dotenvy::dotenv;
use fleetgate::app;

/// Delete expired, never-consumed verification tokens. Meant for cron.
#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "fleetgate=info".into()),
        )
        .init();

    let config = app::config::Config::from_env()
        .expect("Failed to load config (check DATABASE_URL and other env vars)");

    let pool = app::db::connect(&config.database_url, 1)
        .await
        .expect("Failed to connect to database");

    match app::verification::cleanup_expired(&pool).await {
        Ok(removed) => eprintln!("Removed {removed} expired verification token(s)"),
        Err(e) => {
            tracing::error!(error = %e, "token sweep failed");
            std::process::exit(1);
        }
    }
}
