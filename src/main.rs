//! Client Gallery
//!
//! A self-hosted video gallery: an owner uploads videos organised under clients
//! and folders, anyone else browses them read-only. Video payloads and the
//! client tree live in local SQLite files.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod gallery;
mod media;
mod models;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::{BinaryStore, MemoryMetadataStore, MetadataStore, SqliteBinaryStore, SqliteMetadataStore};
use gallery::Gallery;

/// Shown when video payloads cannot be persisted.
pub const STORAGE_NOTICE: &str = "Video storage may not work properly. Please use a modern browser. The app will still work for basic features.";

/// Shown when the saved gallery could not be read at all.
pub const LOAD_NOTICE: &str =
    "An error occurred while loading the page. Please refresh and try again.";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gallery: Arc<Gallery>,
    pub config: Arc<Config>,
    /// Startup problem to surface to the user, if any
    pub notice: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Client Gallery");
    tracing::info!("Metadata path: {:?}", config.meta_db_path);
    tracing::info!("Video store path: {:?}", config.video_db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Allowed cross-origin callers: {:?}", config.allowed_origins);

    if config.owner_passphrase == config::DEFAULT_OWNER_PASSPHRASE {
        tracing::warn!("Using the default owner passphrase (GALLERY_OWNER_PASSPHRASE not set)");
    }

    let state = build_state(config.clone()).await;
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Open both stores and load the gallery.
///
/// Never fails: an unavailable video store leaves the gallery metadata-only, an
/// unavailable metadata store falls back to an empty in-memory one (viewer
/// mode, nothing saved).
pub async fn build_state(config: Config) -> AppState {
    let mut notice = None;

    let binary = Arc::new(SqliteBinaryStore::new(&config.video_db_path));
    if let Err(e) = binary.open().await {
        tracing::error!("Video store error: {}", e);
        notice = Some(STORAGE_NOTICE.to_string());
    }

    let metadata: Arc<dyn MetadataStore> =
        match SqliteMetadataStore::open(&config.meta_db_path).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::error!("Metadata store error, nothing will be saved: {}", e);
                notice = Some(LOAD_NOTICE.to_string());
                Arc::new(MemoryMetadataStore::new())
            }
        };

    let gallery = Gallery::start(binary, metadata, config.owner_passphrase.clone()).await;

    AppState {
        gallery: Arc::new(gallery),
        config: Arc::new(config),
        notice,
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS: only the configured origins may read responses cross-site
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins(&state.config)))
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = state.config.max_upload_bytes;

    // API routes
    let api_routes = Router::new()
        // Status and session
        .route("/status", get(api::get_status))
        .route("/session", get(api::get_session))
        .route("/session/login", post(api::login))
        .route("/session/logout", post(api::logout))
        // Tree
        .route("/gallery", get(api::get_gallery))
        .route("/clients", post(api::create_client))
        .route("/clients/{client_id}", delete(api::delete_client))
        .route("/clients/{client_id}/folders", post(api::create_folder))
        .route(
            "/clients/{client_id}/folders/{folder_id}",
            delete(api::delete_folder),
        )
        .route(
            "/clients/{client_id}/folders/{folder_id}/videos",
            post(api::upload_video),
        )
        .route(
            "/clients/{client_id}/folders/{folder_id}/videos/{video_key}",
            delete(api::delete_video),
        )
        // Deletion tickets
        .route(
            "/confirmations/{token}",
            post(api::confirm_deletion).delete(api::cancel_deletion),
        );

    let media_routes = Router::new().route("/media/{token}", get(api::get_media));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(media_routes)
        .merge(health_routes)
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn allowed_origins(config: &Config) -> Vec<HeaderValue> {
    config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) if origin != "*" => Some(value),
            _ => {
                tracing::warn!("Ignoring allowed origin {:?}", origin);
                None
            }
        })
        .collect()
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
