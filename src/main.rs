use dotenvy::dotenv;
use fleetgate::{app, seeds};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (silently ignore if missing)
    dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug,tower_http=debug", env!("CARGO_PKG_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config from environment
    let config = app::config::Config::from_env()
        .expect("Failed to load config (check DATABASE_URL and other env vars)");

    // Connect to SQLite and run embedded migrations
    let pool = app::db::connect(&config.database_url, 5)
        .await
        .expect("Failed to connect to database");

    // Pending seeds (system actor, dev operator)
    seeds::run_seeds(&pool).await.expect("Failed to run seeds");

    // Build the mail adapter from config
    let mail = app::mail::from_config(&config).unwrap_or_else(|e| {
        tracing::error!("Failed to initialize mail adapter: {}", e);
        std::process::exit(1);
    });

    let bind_addr = config.bind_addr.clone();
    let state = app::AppState {
        db: pool,
        mail,
        config,
    };
    let router = fleetgate::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {bind_addr}: {e}"));

    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, router).await.expect("Server error");
}
