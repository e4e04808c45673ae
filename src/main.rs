//! turnstack - directory administration bot
//!
//! Runs multi-turn directory dialogs on a persisted dialog stack and
//! serves them over HTTP.

mod activity;
mod api;
mod config;
mod db;
mod dialog;
mod runtime;
mod services;
mod turn;

use api::{create_router, AppState};
use config::AppConfig;
use db::Database;
use dialog::{DialogSet, Services};
use runtime::{DatabaseStorage, DialogRuntime};
use services::{
    AdaptiveTemplateRenderer, GraphDirectory, IntentClassifier, LoggingDirectory, LuisClassifier,
    SessionTokenStore, StaticClassifier,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turnstack=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    // Collaborators
    let tokens = Arc::new(SessionTokenStore::new());

    let nlu: Arc<dyn IntentClassifier> = if let Some(luis) = config.luis.clone() {
        tracing::info!(endpoint = %luis.endpoint, "Using LUIS intent classifier");
        Arc::new(LuisClassifier::new(luis)?)
    } else {
        tracing::warn!(
            "No intent classifier configured. Set LUIS_APP_ID, LUIS_KEY and LUIS_ENDPOINT."
        );
        Arc::new(StaticClassifier::default())
    };

    let graph = GraphDirectory::new(&config.graph_base_url, config.write_mode)?;
    tracing::info!(
        base_url = %config.graph_base_url,
        write_mode = ?config.write_mode,
        "Directory client initialized"
    );

    let services = Services {
        auth: tokens.clone(),
        nlu,
        directory: Arc::new(LoggingDirectory::new(Arc::new(graph))),
        renderer: Arc::new(AdaptiveTemplateRenderer::new()),
        settings: config.dialog.clone(),
    };

    // Create application state
    let runtime = DialogRuntime::new(
        DatabaseStorage::new(db),
        Arc::new(DialogSet::standard()),
        services,
    );
    let state = AppState::new(runtime, tokens);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("turnstack server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
