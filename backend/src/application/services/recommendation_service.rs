/// Query router for the three product-finding pipelines
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use super::dataset_cleaner::{CleanedDataset, DatasetCleaner, DatasetError};
use crate::application::dto::{
    DatasetInfo, DatasetSummary, DateRange, ImageSearchResponse, IndexStats, OcrQueryResponse,
    SimilarityMetrics, TextQueryResponse,
};
use crate::application::use_cases::{image_reply, QueryValidationError, RecommendProducts};
use crate::config::{CatalogConfig, VectorDbConfig};
use crate::infrastructure::ocr::{OcrBackend, OcrError};
use crate::infrastructure::search::{IndexBackend, ProductIndex};
use crate::infrastructure::vision::{ClassifierError, ImageClassifier, ModelInfo};

const GENERIC_FAILURE: &str = "Sorry, there was an error processing your request. Please try again.";

#[derive(Error, Debug)]
pub enum RecommendationError {
    #[error("{0}")]
    InvalidQuery(#[from] QueryValidationError),

    /// Text read from an image was not a usable query
    #[error("{source}")]
    InvalidExtractedQuery {
        source: QueryValidationError,
        extracted_text: String,
    },

    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("No text found in image")]
    NoTextFound,

    #[error("Image classification failed: {0}")]
    Classification(#[from] ClassifierError),

    #[error("Failed to initialize services: {0}")]
    Initialization(#[from] DatasetError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RecommendationError {
    /// Message meant for the person who sent the query
    pub fn user_message(&self) -> &'static str {
        match self {
            RecommendationError::InvalidQuery(_)
            | RecommendationError::InvalidExtractedQuery { .. } => "",
            RecommendationError::Ocr(_) => {
                "Could not extract text from the image. Please ensure the image is clear and contains readable text."
            }
            RecommendationError::NoTextFound => {
                "No readable text found in the image. Please try with a clearer image."
            }
            RecommendationError::Classification(_) => {
                "Could not identify the product in the image. Please try with a clearer product image."
            }
            RecommendationError::Initialization(_) | RecommendationError::Internal(_) => {
                GENERIC_FAILURE
            }
        }
    }

    /// Text recognized before the failure, if any
    pub fn extracted_text(&self) -> Option<&str> {
        match self {
            RecommendationError::InvalidExtractedQuery { extracted_text, .. } => {
                Some(extracted_text)
            }
            _ => None,
        }
    }
}

pub type RecommendationResult<T> = Result<T, RecommendationError>;

/// Component flags and statistics for the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub recommendation_service: bool,
    pub data_cleaner: bool,
    pub vector_service: bool,
    pub ocr_processor: bool,
    pub image_classifier: bool,
    pub vector_db_stats: Option<IndexStats>,
    pub similarity_metrics: SimilarityMetrics,
    pub classifier_model_info: ModelInfo,
    pub dataset_info: Option<DatasetInfo>,
}

/// Everything built by initialization
struct CatalogState {
    dataset: CleanedDataset,
    index: ProductIndex,
}

/// Routes text, handwriting and product-photo queries to catalog search.
/// The dataset and index are built on first use.
pub struct RecommendationService {
    catalog_config: CatalogConfig,
    vector_db_config: VectorDbConfig,
    ocr: Arc<dyn OcrBackend>,
    classifier: Arc<dyn ImageClassifier>,
    state: RwLock<Option<Arc<CatalogState>>>,
    init_lock: Mutex<()>,
}

impl RecommendationService {
    pub fn new(
        catalog_config: CatalogConfig,
        vector_db_config: VectorDbConfig,
        ocr: Arc<dyn OcrBackend>,
        classifier: Arc<dyn ImageClassifier>,
    ) -> Self {
        RecommendationService {
            catalog_config,
            vector_db_config,
            ocr,
            classifier,
            state: RwLock::new(None),
            init_lock: Mutex::new(()),
        }
    }

    /// Load (or clean) the dataset and rebuild the product index
    pub async fn initialize(&self) -> RecommendationResult<()> {
        let _guard = self.init_lock.lock().await;
        self.build_state().await.map(|_| ())
    }

    /// Replace the dataset with one already in memory and rebuild the index
    pub async fn load_dataset(&self, dataset: CleanedDataset) -> RecommendationResult<()> {
        let _guard = self.init_lock.lock().await;
        self.install(dataset).await;
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.is_some()
    }

    pub async fn process_text_query(&self, query: &str) -> RecommendationResult<TextQueryResponse> {
        let state = self.ensure_initialized().await?;
        let use_case = RecommendProducts::new(
            &state.index,
            self.catalog_config.top_k,
            self.catalog_config.min_similarity,
        );
        Ok(use_case.execute(query).await?)
    }

    /// Read a handwritten query from an image and run it through text search
    pub async fn process_ocr_query(&self, image: &[u8]) -> RecommendationResult<OcrQueryResponse> {
        let state = self.ensure_initialized().await?;

        let output = self.ocr.extract_text(image, true).await.map_err(|e| {
            warn!("OCR failed: {}", e);
            RecommendationError::Ocr(e)
        })?;
        if output.extracted_text.trim().is_empty() {
            return Err(RecommendationError::NoTextFound);
        }
        info!(
            "OCR read {} words (confidence {:.1}): {}",
            output.word_count, output.confidence, output.extracted_text
        );

        let use_case = RecommendProducts::new(
            &state.index,
            self.catalog_config.top_k,
            self.catalog_config.min_similarity,
        );
        let result = use_case
            .execute(&output.extracted_text)
            .await
            .map_err(|source| RecommendationError::InvalidExtractedQuery {
                source,
                extracted_text: output.extracted_text.clone(),
            })?;

        Ok(OcrQueryResponse {
            result,
            extracted_text: output.extracted_text,
            ocr_confidence: output.confidence,
            ocr_processing_method: output.processing_method.as_str().to_string(),
        })
    }

    /// Classify a product photo and search the catalog for the predicted label
    pub async fn process_image_product_search(
        &self,
        image: &[u8],
    ) -> RecommendationResult<ImageSearchResponse> {
        let state = self.ensure_initialized().await?;

        let classifier = Arc::clone(&self.classifier);
        let bytes = image.to_vec();
        let prediction = tokio::task::spawn_blocking(move || classifier.predict(&bytes))
            .await
            .map_err(|e| RecommendationError::Internal(e.to_string()))??;
        info!(
            "Classified product photo as '{}' ({:.3})",
            prediction.predicted_class, prediction.confidence
        );

        let use_case = RecommendProducts::new(
            &state.index,
            self.catalog_config.top_k,
            self.catalog_config.min_similarity,
        );
        let products = use_case.find_matches(&prediction.predicted_class).await;
        let response = image_reply(
            &prediction.predicted_class,
            prediction.confidence,
            !products.is_empty(),
        );

        Ok(ImageSearchResponse {
            total_matches: products.len(),
            products,
            response,
            predicted_class: prediction.predicted_class,
            prediction_confidence: prediction.confidence,
        })
    }

    pub async fn service_status(&self) -> ServiceStatus {
        let state = self.current_state().await;

        let vector_db_stats = match &state {
            Some(state) => Some(index_stats(state.index.backend().await)),
            None => None,
        };
        let classifier_model_info = self.classifier.model_info();

        ServiceStatus {
            recommendation_service: state.is_some(),
            data_cleaner: state.is_some(),
            vector_service: state.is_some(),
            ocr_processor: self.ocr.is_available().await,
            image_classifier: classifier_model_info.model_loaded,
            vector_db_stats,
            similarity_metrics: similarity_metrics(),
            classifier_model_info,
            dataset_info: state.as_ref().map(|s| dataset_info(&s.dataset)),
        }
    }

    pub async fn dataset_summary(&self) -> RecommendationResult<DatasetSummary> {
        self.current_state()
            .await
            .map(|state| state.dataset.summary())
            .ok_or(RecommendationError::Initialization(DatasetError::Unavailable))
    }

    async fn current_state(&self) -> Option<Arc<CatalogState>> {
        self.state.read().await.as_ref().map(Arc::clone)
    }

    async fn ensure_initialized(&self) -> RecommendationResult<Arc<CatalogState>> {
        if let Some(state) = self.current_state().await {
            return Ok(state);
        }

        let _guard = self.init_lock.lock().await;
        // Another caller may have finished while we waited
        if let Some(state) = self.current_state().await {
            return Ok(state);
        }
        self.build_state().await
    }

    async fn build_state(&self) -> RecommendationResult<Arc<CatalogState>> {
        let raw_path = self.catalog_config.dataset_path.clone();
        let cleaned_path = self.catalog_config.cleaned_dataset_path.clone();

        let dataset = tokio::task::spawn_blocking(move || {
            DatasetCleaner::new().load_or_clean(&raw_path, &cleaned_path)
        })
        .await
        .map_err(|e| RecommendationError::Internal(e.to_string()))?
        .map_err(|e| {
            error!("Dataset loading failed: {}", e);
            RecommendationError::Initialization(e)
        })?;

        if let Err(e) = self.classifier.reload() {
            info!("Classifier model not reloaded: {}", e);
        }

        Ok(self.install(dataset).await)
    }

    async fn install(&self, dataset: CleanedDataset) -> Arc<CatalogState> {
        let catalog = dataset.catalog(self.catalog_config.sample_size);
        info!(
            "Building product index from {} records ({} products)",
            dataset.len(),
            catalog.len()
        );
        let index = ProductIndex::build(catalog, &self.vector_db_config).await;

        let state = Arc::new(CatalogState { dataset, index });
        *self.state.write().await = Some(Arc::clone(&state));
        info!("Recommendation service initialized");
        state
    }
}

fn index_stats(backend: IndexBackend) -> IndexStats {
    match backend {
        IndexBackend::Remote {
            total_vectors,
            dimension,
        } => IndexStats::Remote {
            total_vectors,
            dimension,
        },
        IndexBackend::Local {
            total_vectors,
            dimension,
        } => IndexStats::Local {
            status: "using_local_fallback".to_string(),
            total_vectors,
            dimension,
        },
    }
}

pub fn similarity_metrics() -> SimilarityMetrics {
    SimilarityMetrics {
        primary_metric: "cosine_similarity".to_string(),
        vectorization: "tf_idf".to_string(),
        features: "384_dimensional".to_string(),
        description: "Cosine similarity on TF-IDF vectors for product descriptions and metadata"
            .to_string(),
        fallback_metric: "local_cosine_similarity".to_string(),
        justification: "Cosine similarity works well for text-based product matching as it \
                        measures the angle between vectors, making it ideal for document \
                        similarity regardless of magnitude."
            .to_string(),
    }
}

fn dataset_info(dataset: &CleanedDataset) -> DatasetInfo {
    DatasetInfo {
        total_records: dataset.len(),
        unique_products: dataset.unique_products(),
        date_range: dataset.date_range().map(|(start, end)| DateRange {
            start: start.format("%Y-%m-%d %H:%M:%S").to_string(),
            end: end.format("%Y-%m-%d %H:%M:%S").to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::TransactionRecord;
    use crate::infrastructure::ocr::{OcrOutput, OcrResult, ProcessingMethod};
    use crate::infrastructure::vision::{ClassifierResult, Prediction};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    struct FixedOcr(Option<String>);

    #[async_trait]
    impl OcrBackend for FixedOcr {
        async fn extract_text(&self, _image: &[u8], preprocess: bool) -> OcrResult<OcrOutput> {
            let text = self.0.clone().ok_or(OcrError::Decode)?;
            Ok(OcrOutput {
                word_count: text.split_whitespace().count(),
                raw_text: text.clone(),
                extracted_text: text,
                confidence: 88.0,
                processing_method: if preprocess {
                    ProcessingMethod::EnhancedPreprocessing
                } else {
                    ProcessingMethod::DirectExtraction
                },
            })
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct FixedClassifier(Option<&'static str>);

    impl ImageClassifier for FixedClassifier {
        fn predict(&self, _image: &[u8]) -> ClassifierResult<Prediction> {
            let class = self.0.ok_or(ClassifierError::NoModel)?;
            Ok(Prediction {
                predicted_class: class.to_string(),
                confidence: 0.9,
                top_predictions: Vec::new(),
                all_class_probabilities: BTreeMap::new(),
            })
        }

        fn model_info(&self) -> ModelInfo {
            ModelInfo {
                model_exists: self.0.is_some(),
                model_loaded: self.0.is_some(),
                num_classes: usize::from(self.0.is_some()),
                class_names: self.0.iter().map(|c| c.to_string()).collect(),
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

    fn record(code: &str, description: &str, price: f64) -> TransactionRecord {
        TransactionRecord {
            invoice_no: "536365".to_string(),
            stock_code: code.to_string(),
            description: description.to_string(),
            quantity: 6.0,
            invoice_date: NaiveDate::from_ymd_opt(2010, 12, 1)
                .unwrap()
                .and_hms_opt(8, 26, 0)
                .unwrap(),
            unit_price: price,
            customer_id: 17850,
            country: "United Kingdom".to_string(),
        }
    }

    fn dataset() -> CleanedDataset {
        CleanedDataset::from_cleaned(vec![
            record("85123A", "WHITE HANGING HEART T-LIGHT HOLDER", 2.55),
            record("71053", "WHITE METAL LANTERN", 3.39),
            record("84406B", "CREAM CUPID HEARTS COAT HANGER", 2.75),
            record("22633", "HAND WARMER UNION JACK", 1.85),
            record("84879", "ASSORTED COLOUR BIRD ORNAMENT", 1.69),
        ])
    }

    fn service(ocr: Option<&str>, class: Option<&'static str>) -> RecommendationService {
        let missing = std::env::temp_dir().join("shoplens-missing-dataset");
        let catalog = CatalogConfig {
            dataset_path: missing.join("raw.csv"),
            cleaned_dataset_path: missing.join("cleaned.csv"),
            ..CatalogConfig::default()
        };
        RecommendationService::new(
            catalog,
            VectorDbConfig::default(),
            Arc::new(FixedOcr(ocr.map(str::to_string))),
            Arc::new(FixedClassifier(class)),
        )
    }

    async fn loaded(ocr: Option<&str>, class: Option<&'static str>) -> RecommendationService {
        let service = service(ocr, class);
        service.load_dataset(dataset()).await.unwrap();
        service
    }

    #[tokio::test]
    async fn test_text_query() {
        let service = loaded(None, None).await;
        let result = service.process_text_query("hand warmer").await.unwrap();
        assert_eq!(result.total_matches, 1);
        assert_eq!(result.products[0].stock_code, "22633");
        assert!(result.response.starts_with("I found a great match for 'hand warmer'"));
    }

    #[tokio::test]
    async fn test_invalid_text_query() {
        let service = loaded(None, None).await;
        let err = service.process_text_query("x").await.unwrap_err();
        assert_eq!(err.to_string(), "Query too short");
        assert_eq!(err.user_message(), "");
    }

    #[tokio::test]
    async fn test_missing_dataset_fails_initialization() {
        let service = service(None, None);
        let err = service.process_text_query("lantern").await.unwrap_err();
        assert!(matches!(
            err,
            RecommendationError::Initialization(DatasetError::Unavailable)
        ));
        assert!(!service.is_initialized().await);
        assert!(service.dataset_summary().await.is_err());
    }

    #[tokio::test]
    async fn test_ocr_query() {
        let service = loaded(Some("metal lantern"), None).await;
        let result = service.process_ocr_query(b"png").await.unwrap();
        assert_eq!(result.extracted_text, "metal lantern");
        assert_eq!(result.ocr_processing_method, "enhanced_preprocessing");
        assert_eq!(result.result.products[0].stock_code, "71053");
    }

    #[tokio::test]
    async fn test_ocr_failures() {
        let service = loaded(None, None).await;
        let err = service.process_ocr_query(b"junk").await.unwrap_err();
        assert_eq!(err.to_string(), "OCR failed: Unable to decode image bytes");

        let service = loaded(Some("   "), None).await;
        let err = service.process_ocr_query(b"png").await.unwrap_err();
        assert_eq!(err.to_string(), "No text found in image");

        let service = loaded(Some("I"), None).await;
        let err = service.process_ocr_query(b"png").await.unwrap_err();
        assert_eq!(err.extracted_text(), Some("I"));
    }

    #[tokio::test]
    async fn test_image_search() {
        let service = loaded(None, Some("bird ornament")).await;
        let result = service.process_image_product_search(b"jpg").await.unwrap();
        assert_eq!(result.predicted_class, "bird ornament");
        assert_eq!(result.total_matches, 1);
        assert!(result.response.contains("with 90.0% confidence. Here are similar"));
    }

    #[tokio::test]
    async fn test_image_search_without_model() {
        let service = loaded(None, None).await;
        let err = service.process_image_product_search(b"jpg").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Image classification failed: No trained model available"
        );
    }

    #[tokio::test]
    async fn test_status_and_summary() {
        let service = service(None, Some("mug"));
        let status = service.service_status().await;
        assert!(!status.recommendation_service);
        assert!(status.vector_db_stats.is_none());
        assert!(status.image_classifier);

        service.load_dataset(dataset()).await.unwrap();
        let status = service.service_status().await;
        assert!(status.recommendation_service);
        assert!(matches!(
            status.vector_db_stats,
            Some(IndexStats::Local { total_vectors: 5, .. })
        ));
        assert_eq!(status.dataset_info.unwrap().unique_products, 5);

        let summary = service.dataset_summary().await.unwrap();
        assert_eq!(summary.total_records, 5);
    }
}
