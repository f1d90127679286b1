//! EstatePro API server.
//!
//! Composition root: the database pool, relay registry, event bus and relay
//! task are built here and handed to handlers through [`AppState`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use estate_api::config::ServerConfig;
use estate_api::notifications::RelayRouter;
use estate_api::router::build_app_router;
use estate_api::state::AppState;
use estate_api::ws::{start_heartbeat, WsManager};
use estate_db::DbPool;
use estate_events::EventBus;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "estate_api=debug,tower_http=debug";
const RELAY_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = config.port, "Configuration loaded");

    let pool = connect_database().await;

    let ws_manager = Arc::new(WsManager::new());
    let heartbeat = start_heartbeat(Arc::clone(&ws_manager));

    let event_bus = Arc::new(EventBus::default());
    let relay = tokio::spawn(RelayRouter::new(Arc::clone(&ws_manager)).run(event_bus.subscribe()));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        event_bus: Arc::clone(&event_bus),
    };
    let app = build_app_router(state, &config);

    let addr = SocketAddr::new(
        config.host.parse().expect("HOST must be an IP address"),
        config.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {addr}: {e}"));
    tracing::info!(%addr, "Listening");

    // ConnectInfo supplies the peer address recorded on new sessions.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // The router (and its state clones) is gone; this is the last bus handle.
    drop(event_bus);
    if tokio::time::timeout(RELAY_DRAIN_TIMEOUT, relay).await.is_err() {
        tracing::warn!("Relay did not drain in time");
    }

    let open = ws_manager.connection_count().await;
    ws_manager.shutdown_all().await;
    heartbeat.abort();
    tracing::info!(closed_connections = open, "Shutdown complete");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Connect, probe, and migrate. Any failure aborts startup.
async fn connect_database() -> DbPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = estate_db::create_pool(&url)
        .await
        .expect("Failed to connect to database");
    estate_db::health_check(&pool)
        .await
        .expect("Database did not answer the health probe");
    estate_db::run_migrations(&pool)
        .await
        .expect("Failed to apply migrations");
    tracing::info!("Database ready");
    pool
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("SIGINT received, draining"),
        () = terminate => tracing::info!("SIGTERM received, draining"),
    }
}
