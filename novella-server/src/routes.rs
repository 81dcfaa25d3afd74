//! API routes

use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Uploaded EPUBs are read fully into memory
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

const DEV_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

/// Build the CORS layer from `NOVELLA_CORS_ORIGINS`
/// (comma-separated list of origins, or "*" for any)
fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let allow_origin = match origins {
        Some("*") => AllowOrigin::any(),
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            AllowOrigin::list(allowed)
        }
        // Default: allow localhost origins for development
        None => AllowOrigin::list(DEV_ORIGINS.into_iter().map(HeaderValue::from_static)),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origins.as_deref());
    let assets = ServeDir::new(state.config.assets_path());

    let api_routes = Router::new()
        .route(
            "/novels",
            get(handlers::list_novels).post(handlers::import_novel),
        )
        .route("/novels/:id", get(handlers::get_novel))
        .route("/novels/:id/chapters", get(handlers::list_chapters))
        .route("/novels/:id/languages", post(handlers::add_language))
        // SSE endpoint
        .route("/sync", get(handlers::sync_events))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    Router::new()
        .nest("/api/v1", api_routes)
        .nest_service("/assets", assets)
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
