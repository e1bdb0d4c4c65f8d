use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exchange_core::config::AppConfig;
use exchange_core::db::Database;
use exchange_core::events::{BroadcastEventSink, EventSink};
use exchange_core::{api, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "exchange_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;

    tracing::info!(
        "Starting exchange-core v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!(environment = %config.environment, "loaded configuration");

    let db = Database::connect(&config.database_url).await?;
    tracing::info!("database connected, migrations applied");

    let events = Arc::new(BroadcastEventSink::new(1024));

    // Every published event is logged at debug regardless of whether any
    // transport subscriber exists; this keeps the core observable even when
    // run standalone with no websocket/pubsub layer attached.
    let mut debug_log_rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match debug_log_rx.recv().await {
                Ok(event) => tracing::debug!(?event, "core event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("event debug logger lagged {} events", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let port = config.port;
    let cors_origin = config.cors_origin.clone();

    let state = Arc::new(AppState { config, db, events });

    let cors = if cors_origin == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(cors_origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::routes::create_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
