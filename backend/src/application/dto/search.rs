use serde::Serialize;

use crate::domain::entities::Product;

/// A catalog product matched by a query, with its similarity to that query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductMatch {
    pub stock_code: String,
    pub description: String,
    pub unit_price: f64,
    pub country: String,
    /// Cosine similarity between query and product vectors
    pub similarity_score: f32,
}

impl ProductMatch {
    pub fn from_product(product: &Product, similarity_score: f32) -> Self {
        ProductMatch {
            stock_code: product.stock_code().as_str().to_string(),
            description: product.description().to_string(),
            unit_price: product.unit_price().value(),
            country: product.country().to_string(),
            similarity_score,
        }
    }
}

/// Result of the text pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextQueryResponse {
    pub products: Vec<ProductMatch>,
    pub response: String,
    pub query_processed: String,
    pub total_matches: usize,
}

/// Result of the OCR pipeline: the text pipeline result plus what was read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrQueryResponse {
    #[serde(flatten)]
    pub result: TextQueryResponse,
    pub extracted_text: String,
    pub ocr_confidence: f32,
    pub ocr_processing_method: String,
}

/// Result of the product-photo pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSearchResponse {
    pub products: Vec<ProductMatch>,
    pub response: String,
    pub predicted_class: String,
    pub prediction_confidence: f32,
    pub total_matches: usize,
}

/// Where product vectors currently live
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IndexStats {
    Remote {
        total_vectors: u64,
        dimension: u64,
    },
    Local {
        status: String,
        total_vectors: usize,
        dimension: usize,
    },
}

/// Description of the similarity measure used by the product index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityMetrics {
    pub primary_metric: String,
    pub vectorization: String,
    pub features: String,
    pub description: String,
    pub fallback_metric: String,
    pub justification: String,
}
