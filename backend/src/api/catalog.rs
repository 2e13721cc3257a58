/// Handlers for the product-finding routes
use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        rejection::FormRejection,
        State,
    },
    http::StatusCode,
    response::IntoResponse,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::error::{ApiError, ApiResult, CatalogRoute};
use super::server::AppState;
use crate::application::dto::{
    DatasetSummary, ImageSearchResponse, OcrQueryResponse, TextQueryResponse,
};
use crate::application::services::{DatasetError, RecommendationError, ServiceStatus};
use crate::domain::value_objects::UploadFormat;

#[derive(Debug, Deserialize)]
pub struct QueryForm {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// POST /product-recommendation
pub async fn product_recommendation(
    State(state): State<AppState>,
    form: Result<Form<QueryForm>, FormRejection>,
) -> ApiResult<Json<TextQueryResponse>> {
    let route = CatalogRoute::TextQuery;
    let query = match form {
        Ok(Form(form)) => form.query.unwrap_or_default(),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(ApiError::PayloadTooLarge)
        }
        Err(_) => String::new(),
    };

    if query.trim().is_empty() {
        return Err(ApiError::catalog(
            route,
            StatusCode::BAD_REQUEST,
            "Query parameter is required",
            "Please provide a search query.",
        ));
    }

    let result = state
        .recommendations
        .process_text_query(&query)
        .await
        .map_err(|e| ApiError::recommendation(route, e))?;
    Ok(Json(result))
}

/// POST /ocr-query
pub async fn ocr_query(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<OcrQueryResponse>> {
    let route = CatalogRoute::OcrQuery;
    let image = read_upload(
        route,
        multipart,
        "image_data",
        "No image file provided",
        "Please upload an image file.",
    )
    .await?;

    info!("Received {} byte image for OCR", image.len());
    let result = state
        .recommendations
        .process_ocr_query(&image)
        .await
        .map_err(|e| ApiError::recommendation(route, e))?;
    Ok(Json(result))
}

/// POST /image-product-search
pub async fn image_product_search(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ImageSearchResponse>> {
    let route = CatalogRoute::ImageSearch;
    let image = read_upload(
        route,
        multipart,
        "product_image",
        "No product image provided",
        "Please upload a product image.",
    )
    .await?;

    info!("Received {} byte product photo", image.len());
    let result = state
        .recommendations
        .process_image_product_search(&image)
        .await
        .map_err(|e| ApiError::recommendation(route, e))?;
    Ok(Json(result))
}

/// GET /service-status
pub async fn service_status(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(state.recommendations.service_status().await)
}

/// GET /dataset-summary
pub async fn dataset_summary(State(state): State<AppState>) -> ApiResult<Json<DatasetSummary>> {
    match state.recommendations.dataset_summary().await {
        Ok(summary) => Ok(Json(summary)),
        Err(RecommendationError::Initialization(DatasetError::Unavailable)) => {
            Err(ApiError::Status {
                status: StatusCode::NOT_FOUND,
                message: DatasetError::Unavailable.to_string(),
            })
        }
        Err(e) => Err(ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }),
    }
}

/// POST /admin/initialize
pub async fn initialize(State(state): State<AppState>) -> impl IntoResponse {
    match state.recommendations.initialize().await {
        Ok(()) => (
            StatusCode::OK,
            Json(InitializeResponse {
                success: true,
                message: "Services initialized successfully".to_string(),
            }),
        ),
        Err(e) => {
            // Failure is reported in the body; the cause only goes to the log
            error!("Initialization failed: {}", e);
            (
                StatusCode::OK,
                Json(InitializeResponse {
                    success: false,
                    message: "Failed to initialize services".to_string(),
                }),
            )
        }
    }
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::EndpointNotFound
}

/// Find the named file field, check its extension and return its bytes
async fn read_upload(
    route: CatalogRoute,
    multipart: Result<Multipart, MultipartRejection>,
    field_name: &str,
    missing_error: &str,
    missing_response: &str,
) -> ApiResult<Vec<u8>> {
    let missing = || {
        ApiError::catalog(route, StatusCode::BAD_REQUEST, missing_error, missing_response)
    };

    let mut multipart = multipart.map_err(|_| missing())?;

    while let Some(field) = multipart.next_field().await.map_err(|e| upload_error(route, e))? {
        if field.name() != Some(field_name) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if UploadFormat::from_filename(&filename).is_err() {
            let extension = std::path::Path::new(&filename)
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                .unwrap_or_default();
            return Err(ApiError::catalog(
                route,
                StatusCode::BAD_REQUEST,
                format!("Unsupported file type: {}", extension),
                "Please upload a valid image file (JPG, PNG, BMP, TIFF, GIF).",
            ));
        }

        let bytes = field.bytes().await.map_err(|e| upload_error(route, e))?;
        if bytes.is_empty() {
            return Err(ApiError::catalog(
                route,
                StatusCode::BAD_REQUEST,
                "Empty image file",
                "The uploaded image file is empty.",
            ));
        }
        return Ok(bytes.to_vec());
    }

    Err(missing())
}

fn upload_error(route: CatalogRoute, err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge;
    }
    ApiError::catalog(
        route,
        StatusCode::BAD_REQUEST,
        format!("Invalid upload: {}", err.body_text()),
        "Please upload an image file.",
    )
}
