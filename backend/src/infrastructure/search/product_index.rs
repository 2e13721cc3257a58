/// Product index: TF-IDF vectors served from Qdrant when available, otherwise from memory
use crate::config::VectorDbConfig;
use crate::domain::aggregates::Catalog;
use crate::domain::entities::Product;
use crate::domain::value_objects::{StockCode, UnitPrice};
use tracing::{info, warn};

use super::local_index::LocalIndex;
use super::qdrant_store::{ProductHit, QdrantProductStore};
use super::tfidf::{DEFAULT_MAX_FEATURES, TfidfVectorizer};

/// A catalog product with its similarity to a query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredProduct {
    pub product: Product,
    pub score: f32,
}

/// Where vectors are currently searched
#[derive(Debug, Clone, PartialEq)]
pub enum IndexBackend {
    Remote { total_vectors: u64, dimension: u64 },
    Local { total_vectors: usize, dimension: usize },
}

pub struct ProductIndex {
    catalog: Catalog,
    vectorizer: TfidfVectorizer,
    local: LocalIndex,
    remote: Option<QdrantProductStore>,
}

impl ProductIndex {
    /// Vectorize the catalog and upsert it to the vector database when one is configured.
    /// Any failure talking to the database leaves the index in local mode.
    pub async fn build(catalog: Catalog, vector_db: &VectorDbConfig) -> Self {
        let mut index = Self::build_local(catalog);

        if let Some(url) = vector_db.url.as_deref() {
            match QdrantProductStore::connect(
                url,
                vector_db.api_key.as_deref(),
                vector_db.collection_name.clone(),
                vector_db.dimension,
            )
            .await
            {
                Ok(store) => {
                    match store
                        .upsert_products(
                            index.catalog.products(),
                            index.local.vectors(),
                            vector_db.batch_size,
                        )
                        .await
                    {
                        Ok(()) => index.remote = Some(store),
                        Err(e) => warn!("Vector database upsert failed, using local search: {:#}", e),
                    }
                }
                Err(e) => warn!("Vector database unavailable, using local search: {:#}", e),
            }
        } else {
            info!("No vector database configured, using local search");
        }

        index
    }

    /// Build an in-memory index only
    pub fn build_local(catalog: Catalog) -> Self {
        let mut vectorizer = TfidfVectorizer::new(DEFAULT_MAX_FEATURES);
        let vectors = vectorizer.fit_transform(&catalog.documents());
        info!(
            "Vectorized {} products into {} features",
            vectors.len(),
            vectorizer.dimension()
        );

        ProductIndex {
            catalog,
            vectorizer,
            local: LocalIndex::new(vectors),
            remote: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn uses_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Most similar products for a free-text query.
    /// Remote results are not thresholded; local results must exceed `min_similarity`.
    pub async fn search(&self, query: &str, top_k: usize, min_similarity: f32) -> Vec<ScoredProduct> {
        let vector = self.vectorizer.transform(query);

        if let Some(store) = &self.remote {
            match store.search(&vector, top_k as u64).await {
                Ok(hits) => return hits.into_iter().filter_map(hit_to_product).collect(),
                Err(e) => warn!("Vector database search failed, using local search: {:#}", e),
            }
        }

        self.local
            .search(&vector, top_k, min_similarity)
            .into_iter()
            .filter_map(|hit| {
                self.catalog.at(hit.position).map(|product| ScoredProduct {
                    product: product.clone(),
                    score: hit.score,
                })
            })
            .collect()
    }

    /// Current backend with its vector count and dimension
    pub async fn backend(&self) -> IndexBackend {
        if let Some(store) = &self.remote {
            match store.get_collection_info().await {
                Ok(info) => {
                    return IndexBackend::Remote {
                        total_vectors: info.points_count.unwrap_or(0),
                        dimension: info.dimension,
                    }
                }
                Err(e) => warn!("Could not read collection info: {:#}", e),
            }
        }

        IndexBackend::Local {
            total_vectors: self.local.len(),
            dimension: self.vectorizer.dimension(),
        }
    }
}

fn hit_to_product(hit: ProductHit) -> Option<ScoredProduct> {
    let stock_code = StockCode::new(hit.stock_code).ok()?;
    let unit_price = UnitPrice::new(hit.unit_price).ok()?;
    Some(ScoredProduct {
        product: Product::new(stock_code, hit.description, unit_price, hit.country),
        score: hit.score,
    })
}
