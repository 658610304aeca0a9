use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use super::{conversion, handlers, middleware::metrics_middleware, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let server_config = &state.config().server;
    let upload_limit = server_config.max_upload_bytes;
    let static_dir = server_config.static_dir.clone();

    // API routes
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics))
        // Converter state
        .route("/status", get(handlers::get_status))
        .route("/formats", get(handlers::get_formats))
        .route("/ws", get(ws::ws_handler))
        // Drop and download
        .route(
            "/drop",
            post(conversion::post_drop).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/output", get(conversion::get_output))
        .with_state(state);

    let router = Router::new().nest("/api/v1", api_routes);

    // Serve the UI with SPA fallback
    let router = match static_dir {
        Some(dir) => {
            let index_path = dir.join("index.html");
            router.fallback_service(ServeDir::new(&dir).fallback(ServeFile::new(index_path)))
        }
        None => router,
    };

    router
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
