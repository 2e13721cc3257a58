//! HTTP server setup and routing
use axum::{
    extract::DefaultBodyLimit,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

use super::{catalog, error::ApiError, radio};
use crate::application::services::{RadioService, RecommendationService};
use crate::config::ServerConfig;

/// Shared context passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub recommendations: Arc<RecommendationService>,
    pub radio: Arc<RadioService>,
    pub server: ServerConfig,
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let static_dir = state.server.static_dir.clone();
    let body_limit = state.server.max_upload_bytes;

    Router::new()
        .route("/health", get(catalog::health))
        .route("/product-recommendation", post(catalog::product_recommendation))
        .route("/ocr-query", post(catalog::ocr_query))
        .route("/image-product-search", post(catalog::image_product_search))
        .route("/service-status", get(catalog::service_status))
        .route("/dataset-summary", get(catalog::dataset_summary))
        .route("/admin/initialize", post(catalog::initialize))
        .merge(radio::radio_routes())
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(catalog::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::map_response(json_payload_too_large))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Body-limit rejections outside the upload handlers come back as plain text
async fn json_payload_too_large(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if response.status() == StatusCode::PAYLOAD_TOO_LARGE && !is_json {
        return ApiError::PayloadTooLarge.into_response();
    }
    response
}

/// Bind the configured address and serve until ctrl-c
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.server.host, state.server.port).parse()?;
    let app = build_router(state);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
