use std::net::{IpAddr, SocketAddr};

use barbcut_api::config::ServerConfig;
use barbcut_api::router::build_app_router;
use barbcut_api::state::AppState;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "barbcut_api=debug,barbcut_pipeline=debug,tower_http=debug";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env().expect("Invalid server configuration");
    let host: IpAddr = config.host.parse().expect("HOST must be an IP address");
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(
        %addr,
        cors_origins = config.cors_origins.len(),
        timeout_secs = config.request_timeout_secs,
        "Loaded server configuration"
    );

    let database_url = std::env::var("DATABASE_URL").ok();
    let store = barbcut_db::connect(database_url.as_deref())
        .await
        .expect("Failed to connect to document store");

    let app = build_app_router(AppState::new(store, config));

    let listener = TcpListener::bind(addr).await.expect("Failed to bind listener");
    tracing::info!(%addr, "Generation API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await
        .expect("Server error");

    tracing::info!("Generation API stopped");
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.expect("Failed to listen for Ctrl-C");
                tracing::info!("Ctrl-C received, draining connections");
            }
            _ = sigterm.recv() => tracing::info!("SIGTERM received, draining connections"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl-C");
        tracing::info!("Ctrl-C received, draining connections");
    }
}
