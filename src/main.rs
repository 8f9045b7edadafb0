mod api;
mod catalog;
mod config;
mod db;
mod error;
mod storage;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use catalog::SystemClock;
use config::ServerConfig;
use storage::LocalStorage;

/// Room for the JSON around a base64 image (4/3 of the raw size).
const BODY_OVERHEAD: usize = 64 * 1024;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipe_catalog=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().expect("Invalid configuration");

    // Initialize database
    let db_path = config.database_path();
    let db = db::init_database(&db_path)
        .await
        .expect("Failed to initialize database");
    let db = Arc::new(db);
    tracing::info!("Database initialized at {:?}", db_path);

    let media_path = config.media_path();
    let storage = Arc::new(LocalStorage::new(media_path.clone()));
    tracing::info!("Storing images under {:?}", media_path);

    let body_limit = config.max_image_bytes / 3 * 4 + BODY_OVERHEAD;
    let addr = config.bind_addr;
    let admin_password = config.admin_password.clone();
    let state = Arc::new(AppState::new(config, db, storage, Arc::new(SystemClock)));

    // Ensure default admin user exists (for bootstrapping)
    state
        .auth
        .ensure_admin_user(&admin_password)
        .await
        .expect("Failed to create admin user");

    match state.auth.cleanup_expired_sessions().await {
        Ok(0) => {}
        Ok(n) => tracing::info!("Removed {} expired sessions", n),
        Err(e) => tracing::warn!("Failed to clean up sessions: {}", e),
    }

    let app = api::router()
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http());

    tracing::info!("Recipe catalog starting on http://{}", addr);
    tracing::info!("");
    tracing::info!("API Endpoints:");
    tracing::info!("  POST /api/auth/register - Register new user");
    tracing::info!("  POST /api/auth/login    - Login and get token");
    tracing::info!("  GET  /api/recipes       - Browse recipes");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    axum::serve(listener, app).await.expect("Server error");
}
