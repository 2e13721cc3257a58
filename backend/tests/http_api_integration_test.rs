//! HTTP tests for the product-finder routes, driven through the router with `oneshot`
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use shoplens::api::{build_router, AppState};
use shoplens::application::services::{RadioService, RecommendationService};
use shoplens::config::{CatalogConfig, ServerConfig, VectorDbConfig};
use shoplens::infrastructure::ocr::{OcrBackend, OcrError, OcrOutput, OcrResult, ProcessingMethod};
use shoplens::infrastructure::persistence::SqliteRadioRepository;
use shoplens::infrastructure::vision::{
    ClassifierResult, ImageClassifier, ModelInfo, Prediction,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

const RAW_DATASET: &str = "\
InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country
536365,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,2010-12-01 08:26:00,2.55,17850,United Kingdom
536365,71053,WHITE METAL LANTERN,6,2010-12-01 08:26:00,3.39,17850,United Kingdom
536366,22633,HAND WARMER UNION JACK,6,2010-12-01 08:28:00,1.85,,United Kingdom
536367,84879,ASSORTED COLOUR BIRD ORNAMENT,32,2010-12-02 08:34:00,1.69,13047,France
";

const BOUNDARY: &str = "shoplens-test-boundary";

struct StubOcr;

#[async_trait]
impl OcrBackend for StubOcr {
    async fn extract_text(&self, image: &[u8], _preprocess: bool) -> OcrResult<OcrOutput> {
        if image.starts_with(b"blank") {
            return Ok(OcrOutput {
                extracted_text: String::new(),
                raw_text: String::new(),
                confidence: 0.0,
                word_count: 0,
                processing_method: ProcessingMethod::EnhancedPreprocessing,
            });
        }
        if !image.starts_with(b"note") {
            return Err(OcrError::Decode);
        }
        Ok(OcrOutput {
            extracted_text: "metal lantern".to_string(),
            raw_text: "metal lantern".to_string(),
            confidence: 87.0,
            word_count: 2,
            processing_method: ProcessingMethod::EnhancedPreprocessing,
        })
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "stub"
    }
}

struct StubClassifier;

impl ImageClassifier for StubClassifier {
    fn predict(&self, _image: &[u8]) -> ClassifierResult<Prediction> {
        Ok(Prediction {
            predicted_class: "bird ornament".to_string(),
            confidence: 0.876,
            top_predictions: Vec::new(),
            all_class_probabilities: BTreeMap::new(),
        })
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model_exists: true,
            model_loaded: true,
            num_classes: 1,
            class_names: vec!["bird ornament".to_string()],
            embedding_model: "stub".to_string(),
            feature_length: 0,
            validation_accuracy: None,
            trained_at: None,
        }
    }

    fn reload(&self) -> ClassifierResult<()> {
        Ok(())
    }
}

/// Test helper: router over a dataset in a temp dir
fn setup_app(max_upload_bytes: usize) -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("dataset.csv");
    std::fs::write(&raw, RAW_DATASET).unwrap();

    let catalog = CatalogConfig {
        dataset_path: raw,
        cleaned_dataset_path: dir.path().join("cleaned.csv"),
        ..CatalogConfig::default()
    };
    let recommendations = RecommendationService::new(
        catalog,
        VectorDbConfig::default(),
        Arc::new(StubOcr),
        Arc::new(StubClassifier),
    );
    let radio = RadioService::new(Box::new(SqliteRadioRepository::new_in_memory().unwrap()));

    let state = AppState {
        recommendations: Arc::new(recommendations),
        radio: Arc::new(radio),
        server: ServerConfig {
            max_upload_bytes,
            static_dir: dir.path().join("static"),
            ..ServerConfig::default()
        },
    };
    (dir, build_router(state))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_file(uri: &str, field: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Test helper: status and JSON body
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app) = setup_app(1024 * 1024);
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "shoplens");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_text_recommendation() {
    let (_dir, app) = setup_app(1024 * 1024);
    let (status, body) = send(&app, post_form("/product-recommendation", "query=hand+warmer")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query_processed"], "hand warmer");
    assert_eq!(body["products"][0]["stock_code"], "22633");
    assert_eq!(body["total_matches"], body["products"].as_array().unwrap().len());
    assert!(body["response"]
        .as_str()
        .unwrap()
        .starts_with("I found a great match for 'hand warmer'"));
}

#[tokio::test]
async fn test_text_recommendation_errors() {
    let (_dir, app) = setup_app(1024 * 1024);

    let (status, body) = send(&app, post_form("/product-recommendation", "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Query parameter is required");
    assert_eq!(body["response"], "Please provide a search query.");
    assert_eq!(body["products"], serde_json::json!([]));

    let (status, body) = send(&app, post_form("/product-recommendation", "query=x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Query too short");
}

#[tokio::test]
async fn test_ocr_query() {
    let (_dir, app) = setup_app(1024 * 1024);
    let (status, body) = send(
        &app,
        post_file("/ocr-query", "image_data", "note.png", b"note-bytes"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["extracted_text"], "metal lantern");
    assert_eq!(body["ocr_processing_method"], "enhanced_preprocessing");
    assert_eq!(body["products"][0]["stock_code"], "71053");
}

#[tokio::test]
async fn test_ocr_query_upload_errors() {
    let (_dir, app) = setup_app(1024 * 1024);

    let (status, body) = send(&app, post_file("/ocr-query", "other", "note.png", b"note")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image file provided");

    let (status, body) = send(&app, post_file("/ocr-query", "image_data", "note.txt", b"note")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unsupported file type: .txt");

    let (status, body) = send(&app, post_file("/ocr-query", "image_data", "note.png", b"")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Empty image file");

    let (status, body) = send(&app, post_file("/ocr-query", "image_data", "blank.png", b"blank")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["extracted_text"], "");

    let (status, body) = send(&app, post_file("/ocr-query", "image_data", "junk.jpg", b"junk")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["products"], serde_json::json!([]));
    assert_eq!(body["error"], "OCR failed: Unable to decode image bytes");
}

#[tokio::test]
async fn test_image_product_search() {
    let (_dir, app) = setup_app(1024 * 1024);
    let (status, body) = send(
        &app,
        post_file("/image-product-search", "product_image", "photo.JPG", b"jpeg"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predicted_class"], "bird ornament");
    assert_eq!(body["products"][0]["stock_code"], "84879");
    assert!(body["response"].as_str().unwrap().contains("87.6%"));
}

#[tokio::test]
async fn test_upload_too_large() {
    let (_dir, app) = setup_app(1024);
    let big = vec![b'n'; 8 * 1024];
    let (status, body) = send(
        &app,
        post_file("/image-product-search", "product_image", "photo.png", &big),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "File too large");
    assert_eq!(
        body["response"],
        "The uploaded file is too large. Maximum size is 16MB."
    );
}

#[tokio::test]
async fn test_status_summary_and_initialize() {
    let (_dir, app) = setup_app(1024 * 1024);

    let (status, body) = send(&app, get("/service-status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recommendation_service"], false);
    assert_eq!(body["ocr_processor"], true);
    assert!(body["similarity_metrics"]["primary_metric"].is_string());
    assert!(body["similarity_metrics"]["justification"]
        .as_str()
        .unwrap()
        .starts_with("Cosine similarity works well"));

    let (status, body) = send(&app, get("/dataset-summary")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No dataset available");

    let request = Request::builder()
        .method("POST")
        .uri("/admin/initialize")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(&app, get("/dataset-summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_records"], 4);
    assert_eq!(body["data_quality"]["missing_customer_ids"], 1);

    let (_, body) = send(&app, get("/service-status")).await;
    assert_eq!(body["recommendation_service"], true);
    assert_eq!(body["vector_db_stats"]["total_vectors"], 4);
}

#[tokio::test]
async fn test_failed_initialize_reports_in_body() {
    let (dir, app) = setup_app(1024 * 1024);
    std::fs::remove_file(dir.path().join("dataset.csv")).unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/admin/initialize")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Failed to initialize services");

    let (_, body) = send(&app, get("/service-status")).await;
    assert_eq!(body["recommendation_service"], false);
}

#[tokio::test]
async fn test_unknown_endpoint() {
    let (_dir, app) = setup_app(1024 * 1024);
    let (status, body) = send(&app, get("/no-such-route")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Endpoint not found");
}
