use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use config::Config;
use handlers::AppState;
use services::{AuthService, FileService, SessionCache};

/// Wires the services together. The session cache is built here once and
/// injected everywhere; nothing reaches for globals.
pub async fn build_state(config: Config) -> AppState {
    let sessions = Arc::new(SessionCache::load(&config.session_file).await);
    let auth = Arc::new(AuthService::new(&config, sessions.clone()));
    let files = Arc::new(FileService::new(&config.upload_dir));

    AppState {
        config,
        sessions,
        auth,
        files,
    }
}

/// Slack on top of the quota ceiling for multipart boundaries and headers.
const UPLOAD_BODY_OVERHEAD: usize = 1024 * 1024;

pub fn create_app(state: AppState) -> Router {
    // The transport-level body cap must never undercut the quota system:
    // rejection of an oversized upload is quota-driven (413), not a
    // framework default.
    let body_limit = state.config.default_quota_bytes.max(0) as usize + UPLOAD_BODY_OVERHEAD;

    Router::new()
        .route("/health", get(handlers::health::liveness))
        .route("/auth/login", get(handlers::auth::login))
        .route("/auth/callback", get(handlers::auth::callback))
        .route("/auth/user", get(handlers::auth::current_user))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/user/info", get(handlers::user::info))
        .route("/user/storage", get(handlers::user::storage))
        .route("/user/files", get(handlers::user::list_files))
        .route("/user/exists", get(handlers::user::exists))
        .route("/user/upload", post(handlers::user::upload))
        .route("/user/download/*path", get(handlers::user::download))
        .route("/user/delete/*path", delete(handlers::user::delete))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
