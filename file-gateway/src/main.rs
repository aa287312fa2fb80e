use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{delete, get, post},
    Router,
};
use std::{convert::Infallible, net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

mod config;
mod error;
mod handlers;
mod models;
mod storage;

use config::Config;
use storage::{ObjectStore, PublicUrlBuilder};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub urls: Arc<PublicUrlBuilder>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    shared::observability::init_logging(&config.logging)?;
    tracing::info!("Starting File Gateway...");

    let store = storage::connect(&config.storage)
        .await
        .context("Failed to initialize object storage")?;
    tracing::info!(backend = store.backend_name(), "Object storage initialized");

    let state = AppState {
        store,
        urls: Arc::new(PublicUrlBuilder::from_config(&config.storage)),
    };

    let app = create_router(state, config.server.max_upload_bytes());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid HOST/PORT combination")?;
    tracing::info!("File Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router
pub(crate) fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/upload",
            post(handlers::file_upload::upload_files)
                .layer::<_, Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_upload_bytes)),
        )
        .route("/files", get(handlers::file_management::list_files))
        .route(
            "/delete/:file_name",
            delete(handlers::file_management::delete_file),
        )
        .route(
            "/download/:file_name",
            get(handlers::file_download::download_file),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
