//! Router configuration for the Sharebox API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use super::handlers::{
    create_folder, delete_file, delete_folder, download_file, download_folder, list_files,
    move_file, move_folder, preview_file, rename_file, rename_folder, upload_files, AppState,
};
use super::middleware::{create_cors_layer, security_headers};
use super::openapi::ApiDoc;

/// Create the main API router.
///
/// Cross-cutting layers are added by [`apply_layers`] once every router is
/// merged.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Uploads are streamed to disk and bounded by the transfer gate.
    let file_routes = Router::new()
        .route("/", get(list_files))
        .route(
            "/upload",
            post(upload_files).layer(DefaultBodyLimit::disable()),
        )
        .route("/download/:filename", get(download_file))
        .route("/download-folder", get(download_folder))
        .route("/preview/:filename", get(preview_file))
        .route("/rename/:filename", put(rename_file))
        .route("/move/:filename", put(move_file))
        .route("/:filename", delete(delete_file));

    let folder_routes = Router::new()
        .route("/", post(create_folder))
        .route("/rename/:foldername", put(rename_folder))
        .route("/move/:foldername", put(move_folder))
        .route("/:foldername", delete(delete_folder));

    Router::new()
        .nest("/api/files", file_routes)
        .nest("/api/folders", folder_routes)
        .route("/api-docs/openapi.json", get(openapi_json))
        .with_state(app_state)
}

/// Wrap every route in tracing, CORS and the security headers.
pub fn apply_layers(router: Router, cors_origins: &[String]) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(create_cors_layer(cors_origins))
            .layer(middleware::from_fn(security_headers)),
    )
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Serve the web front-end from `static_path`.
///
/// Unknown paths fall back to `index.html` so client-side routes resolve.
/// Returns `None` if the directory does not exist.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    let dir = Path::new(static_path);
    if !dir.is_dir() {
        tracing::warn!("Static directory not found: {}", static_path);
        return None;
    }

    let serve_dir = ServeDir::new(dir)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(dir.join("index.html")));

    Some(Router::new().fallback_service(serve_dir))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
