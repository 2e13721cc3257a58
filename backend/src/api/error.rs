use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::application::services::{RadioError, RecommendationError};
use crate::domain::base::DomainError;

/// Catalog route an error belongs to; image routes add an empty result field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogRoute {
    TextQuery,
    OcrQuery,
    ImageSearch,
}

impl CatalogRoute {
    fn extra_field(&self) -> Option<&'static str> {
        match self {
            CatalogRoute::TextQuery => None,
            CatalogRoute::OcrQuery => Some("extracted_text"),
            CatalogRoute::ImageSearch => Some("predicted_class"),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failure on a catalog route, rendered with an empty product list
    #[error("{error}")]
    Catalog {
        route: CatalogRoute,
        status: StatusCode,
        error: String,
        response: String,
        extracted_text: Option<String>,
    },

    #[error(transparent)]
    Radio(#[from] RadioError),

    /// Plain `{error}` body
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("Endpoint not found")]
    EndpointNotFound,

    #[error("File too large")]
    PayloadTooLarge,
}

impl ApiError {
    pub fn catalog(
        route: CatalogRoute,
        status: StatusCode,
        error: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        ApiError::Catalog {
            route,
            status,
            error: error.into(),
            response: response.into(),
            extracted_text: None,
        }
    }

    pub fn recommendation(route: CatalogRoute, err: RecommendationError) -> Self {
        // Pipeline failures are server errors carrying the friendly message
        let status = match &err {
            RecommendationError::InvalidQuery(_)
            | RecommendationError::InvalidExtractedQuery { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let response = match (route, &err) {
            (CatalogRoute::OcrQuery, RecommendationError::Internal(_)) => {
                "Sorry, there was an error processing your image. Please try again."
            }
            (CatalogRoute::ImageSearch, RecommendationError::Internal(_)) => {
                "Sorry, there was an error processing your product image. Please try again."
            }
            _ => err.user_message(),
        };

        ApiError::Catalog {
            route,
            status,
            error: err.to_string(),
            response: response.to_string(),
            extracted_text: err.extracted_text().map(str::to_string),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Catalog { status, .. } | ApiError::Status { status, .. } => *status,
            ApiError::Radio(err) => radio_status(err),
            ApiError::EndpointNotFound => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

fn radio_status(err: &RadioError) -> StatusCode {
    match err {
        RadioError::NotFound => StatusCode::NOT_FOUND,
        RadioError::Unauthenticated | RadioError::InvalidToken => StatusCode::UNAUTHORIZED,
        RadioError::Validation(_) | RadioError::Parse(_) => StatusCode::BAD_REQUEST,
        RadioError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        RadioError::Repository(DomainError::NotFound(_)) => StatusCode::NOT_FOUND,
        RadioError::Repository(DomainError::InvalidValue(_))
        | RadioError::Repository(DomainError::BusinessRuleViolation(_)) => StatusCode::BAD_REQUEST,
        RadioError::Repository(DomainError::InvalidOperation(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            ApiError::Catalog {
                route,
                error,
                response,
                extracted_text,
                ..
            } => {
                let mut body = Map::new();
                body.insert("error".to_string(), Value::String(error));
                body.insert("products".to_string(), Value::Array(Vec::new()));
                body.insert("response".to_string(), Value::String(response));
                if let Some(field) = route.extra_field() {
                    let value = match (field, extracted_text) {
                        ("extracted_text", Some(text)) => text,
                        _ => String::new(),
                    };
                    body.insert(field.to_string(), Value::String(value));
                }
                Value::Object(body)
            }
            ApiError::Radio(RadioError::Validation(errors)) => json!(errors),
            ApiError::Radio(err) => {
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("Radio request failed: {}", err);
                }
                json!({ "detail": err.to_string() })
            }
            ApiError::Status { message, .. } => json!({ "error": message }),
            ApiError::EndpointNotFound => json!({
                "error": "Endpoint not found",
                "message": "The requested endpoint does not exist.",
            }),
            ApiError::PayloadTooLarge => json!({
                "error": "File too large",
                "products": [],
                "response": "The uploaded file is too large. Maximum size is 16MB.",
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
