mod analytics;
mod config;
mod errors;
mod fetcher;
mod records;
mod server;
mod state;
mod store;

use crate::fetcher::BetFetcher;
use crate::state::AppState;
use crate::store::auth::ServiceAccountAuth;
use crate::store::client::FirestoreStore;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("bet_dashboard starting");

    // Load config
    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    // Init Firestore auth
    let auth = match ServiceAccountAuth::new(&cfg.service_account) {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("firestore auth error: {e}");
            std::process::exit(1);
        }
    };

    let store = FirestoreStore::new(&cfg.firestore_base_url, auth, cfg.timestamp_encoding);
    tracing::info!(collection = %cfg.collection, "firestore client initialized");

    let fetcher = BetFetcher::new(store, &cfg.collection, cfg.fallback_limit);
    let app_state = AppState::new(fetcher, cfg.recent_limit);
    let app = server::router(app_state, &cfg.static_dir);

    let addr = format!("0.0.0.0:{}", cfg.server_port);
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("server error: {e}");
    }

    tracing::info!("server stopped, firestore client released");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("ctrl-c handler error: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
