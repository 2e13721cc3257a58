use crate::application::dto::{ProductMatch, TextQueryResponse};
use crate::infrastructure::search::ProductIndex;

use super::query_validation::{validate_query, QueryValidationError};

/// Number of products listed by name in a multi-match reply
const LISTED_IN_REPLY: usize = 3;

/// Use case for turning a free-text query into product recommendations
pub struct RecommendProducts<'a> {
    index: &'a ProductIndex,
    top_k: usize,
    min_similarity: f32,
}

impl<'a> RecommendProducts<'a> {
    pub fn new(index: &'a ProductIndex, top_k: usize, min_similarity: f32) -> Self {
        Self {
            index,
            top_k,
            min_similarity,
        }
    }

    /// Validate the query, search the index and compose the reply
    pub async fn execute(&self, query: &str) -> Result<TextQueryResponse, QueryValidationError> {
        let cleaned = validate_query(query)?;
        let products = self.find_matches(&cleaned).await;
        let response = text_reply(&cleaned, &products);

        Ok(TextQueryResponse {
            total_matches: products.len(),
            products,
            response,
            query_processed: cleaned,
        })
    }

    /// Search without validation, for labels produced internally
    pub async fn find_matches(&self, text: &str) -> Vec<ProductMatch> {
        self.index
            .search(text, self.top_k, self.min_similarity)
            .await
            .iter()
            .map(|hit| ProductMatch::from_product(&hit.product, hit.score))
            .collect()
    }
}

/// Natural-language reply for a text query
pub fn text_reply(query: &str, products: &[ProductMatch]) -> String {
    match products {
        [] => format!(
            "I couldn't find any products matching '{}'. Please try a different search term or browse our catalog.",
            query
        ),
        [product] => format!(
            "I found a great match for '{}': {} (Stock: {}) priced at ${:.2}.",
            query, product.description, product.stock_code, product.unit_price
        ),
        _ => {
            let mut reply = format!(
                "I found {} products matching '{}'. Here are the top recommendations:",
                products.len(),
                query
            );
            let listed = products.len().min(LISTED_IN_REPLY);
            for (i, product) in products.iter().take(listed).enumerate() {
                reply.push_str(&format!(
                    " {}. {} (${:.2})",
                    i + 1,
                    product.description,
                    product.unit_price
                ));
                if i + 1 < listed {
                    reply.push(',');
                }
            }
            if products.len() > LISTED_IN_REPLY {
                reply.push_str(&format!(
                    " and {} more options.",
                    products.len() - LISTED_IN_REPLY
                ));
            }
            reply
        }
    }
}

/// Reply for a classified product photo; `confidence` is a fraction
pub fn image_reply(predicted_class: &str, confidence: f32, found_products: bool) -> String {
    let percent = confidence * 100.0;
    if found_products {
        format!(
            "I identified this as a '{}' with {:.1}% confidence. Here are similar products I found:",
            predicted_class, percent
        )
    } else {
        format!(
            "I identified this as a '{}' with {:.1}% confidence, but couldn't find similar products in our catalog.",
            predicted_class, percent
        )
    }
}
