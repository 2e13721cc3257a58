/// Qdrant vector store for catalog products
use anyhow::{Context, Result};
use qdrant_client::{
    Payload,
    Qdrant,
    qdrant::{
        Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
        Range, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
    },
};
use serde_json::json;
use tracing::{debug, info};

use crate::domain::entities::Product;
use crate::domain::value_objects::FeatureVector;

/// Vector store implementation using Qdrant
pub struct QdrantProductStore {
    client: Qdrant,
    collection_name: String,
    dimension_count: usize,
}

impl QdrantProductStore {
    /// Connect and make sure the collection exists
    ///
    /// # Arguments
    /// * `url` - Qdrant server URL (e.g., "http://localhost:6334")
    /// * `api_key` - Optional API key for managed deployments
    /// * `collection_name` - Name of the collection to use
    /// * `dimension_count` - Vector dimension; shorter vectors are zero-padded
    pub async fn connect(
        url: &str,
        api_key: Option<&str>,
        collection_name: impl Into<String>,
        dimension_count: usize,
    ) -> Result<Self> {
        info!("Connecting to Qdrant at {}", url);

        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key.to_string());
        }
        let client = builder.build().context("Failed to connect to Qdrant")?;

        let store = QdrantProductStore {
            client,
            collection_name: collection_name.into(),
            dimension_count,
        };

        if !store.collection_exists().await? {
            info!("Creating collection: {}", store.collection_name);
            store.create_collection().await?;
        } else {
            info!("Collection '{}' already exists", store.collection_name);
        }

        Ok(store)
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    async fn create_collection(&self) -> Result<()> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection_name).vectors_config(
                    VectorParamsBuilder::new(self.dimension_count as u64, Distance::Cosine),
                ),
            )
            .await
            .context("Failed to create collection")?;

        info!(
            "Created collection '{}' with {} dimensions",
            self.collection_name, self.dimension_count
        );
        Ok(())
    }

    async fn collection_exists(&self) -> Result<bool> {
        let collections = self.client.list_collections().await?;
        Ok(collections
            .collections
            .iter()
            .any(|c| c.name == self.collection_name))
    }

    /// Delete the collection (useful for testing)
    pub async fn delete_collection(&self) -> Result<()> {
        self.client
            .delete_collection(&self.collection_name)
            .await
            .context("Failed to delete collection")?;
        info!("Deleted collection: {}", self.collection_name);
        Ok(())
    }

    /// Upsert products with their vectors; point ids are catalog positions.
    /// Points left over from a larger earlier catalog are removed afterwards.
    pub async fn upsert_products(
        &self,
        products: &[Product],
        vectors: &[FeatureVector],
        batch_size: usize,
    ) -> Result<()> {
        let batch_size = batch_size.max(1);
        let points: Vec<PointStruct> = products
            .iter()
            .zip(vectors.iter())
            .enumerate()
            .map(|(position, (product, vector))| {
                let payload: Payload = json!({
                    "stock_code": product.stock_code().as_str(),
                    "description": product.description(),
                    "unit_price": product.unit_price().value(),
                    "country": product.country(),
                    "position": position as u64,
                })
                .try_into()
                .context("Failed to serialize payload")?;

                Ok(PointStruct::new(
                    position as u64,
                    vector.resized(self.dimension_count).values().to_vec(),
                    payload,
                ))
            })
            .collect::<Result<_>>()?;

        let total = points.len();
        let mut points = points.into_iter().peekable();
        let mut batch_number = 0;
        while points.peek().is_some() {
            let batch: Vec<PointStruct> = points.by_ref().take(batch_size).collect();
            batch_number += 1;
            debug!("Upserting batch {} ({} points)", batch_number, batch.len());

            self.client
                .upsert_points(UpsertPointsBuilder::new(&self.collection_name, batch).wait(true))
                .await
                .context("Failed to upsert batch")?;
        }

        info!("Upserted {} products to '{}'", total, self.collection_name);
        self.remove_points_from(total).await
    }

    /// Delete every point whose catalog position is at or past `position`
    async fn remove_points_from(&self, position: usize) -> Result<()> {
        let stale = Filter::must([Condition::range(
            "position",
            Range {
                gte: Some(position as f64),
                ..Default::default()
            },
        )]);
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection_name)
                    .points(stale)
                    .wait(true),
            )
            .await
            .context("Failed to remove stale points")?;
        debug!("Removed points at positions >= {}", position);
        Ok(())
    }

    /// Nearest products by cosine similarity, best first
    pub async fn search(&self, query: &FeatureVector, limit: u64) -> Result<Vec<ProductHit>> {
        debug!("Searching with limit: {}", limit);

        let search_result = self
            .client
            .search_points(
                SearchPointsBuilder::new(
                    &self.collection_name,
                    query.resized(self.dimension_count).values().to_vec(),
                    limit,
                )
                .with_payload(true),
            )
            .await
            .context("Search failed")?;

        let results: Vec<ProductHit> = search_result
            .result
            .into_iter()
            .map(|point| {
                let payload = point.payload;
                let text = |key: &str| {
                    payload
                        .get(key)
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string())
                        .unwrap_or_default()
                };
                ProductHit {
                    stock_code: text("stock_code"),
                    description: text("description"),
                    unit_price: payload
                        .get("unit_price")
                        .and_then(|v| v.as_double())
                        .unwrap_or_default(),
                    country: text("country"),
                    score: point.score,
                }
            })
            .collect();

        debug!("Found {} results", results.len());
        Ok(results)
    }

    pub async fn get_collection_info(&self) -> Result<CollectionInfo> {
        let collection = self
            .client
            .collection_info(&self.collection_name)
            .await
            .context("Failed to get collection info")?;

        let points_count = collection.result.and_then(|r| r.points_count);

        Ok(CollectionInfo {
            name: self.collection_name.clone(),
            points_count,
            dimension: self.dimension_count as u64,
        })
    }
}

/// A product returned by the vector database
#[derive(Debug, Clone, PartialEq)]
pub struct ProductHit {
    pub stock_code: String,
    pub description: String,
    pub unit_price: f64,
    pub country: String,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub name: String,
    pub points_count: Option<u64>,
    pub dimension: u64,
}
