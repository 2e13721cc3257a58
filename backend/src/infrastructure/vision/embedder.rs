/// Pretrained image embeddings that the classifier head is trained on
use fastembed::{ImageEmbedding, ImageEmbeddingModel, ImageInitOptions};
use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};

use super::classifier::{ClassifierError, ClassifierResult};
use crate::domain::value_objects::FeatureVector;

/// Supported image embedding models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageModelKind {
    #[default]
    Resnet50,
    ClipVitB32,
}

impl ImageModelKind {
    pub fn dimension(&self) -> usize {
        match self {
            ImageModelKind::Resnet50 => 2048,
            ImageModelKind::ClipVitB32 => 512,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ImageModelKind::Resnet50 => "resnet50",
            ImageModelKind::ClipVitB32 => "clip-vit-b32",
        }
    }

    fn fastembed_model(&self) -> ImageEmbeddingModel {
        match self {
            ImageModelKind::Resnet50 => ImageEmbeddingModel::Resnet50,
            ImageModelKind::ClipVitB32 => ImageEmbeddingModel::ClipVitB32,
        }
    }
}

impl fmt::Display for ImageModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Turns encoded images into feature vectors.
///
/// Calls block on model inference, so async callers go through `spawn_blocking`.
pub trait ImageEmbedder: Send + Sync {
    /// One vector per input, in input order
    fn embed(&self, images: &[&[u8]]) -> ClassifierResult<Vec<FeatureVector>>;

    /// Stored in the model file so a head is never paired with the wrong backbone
    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;
}

/// Reject bytes that are not a recognisable image without decoding the pixels
pub fn ensure_decodable(image: &[u8]) -> ClassifierResult<()> {
    ImageReader::new(Cursor::new(image))
        .with_guessed_format()
        .map_err(|_| ClassifierError::Decode)?
        .into_dimensions()
        .map_err(|_| ClassifierError::Decode)?;
    Ok(())
}

/// [`ImageEmbedder`] over a fastembed model, loaded on first use
pub struct FastEmbedImageEmbedder {
    kind: ImageModelKind,
    cache_dir: Option<PathBuf>,
    model: Mutex<Option<ImageEmbedding>>,
}

impl FastEmbedImageEmbedder {
    pub fn new(kind: ImageModelKind, cache_dir: Option<PathBuf>) -> Self {
        FastEmbedImageEmbedder {
            kind,
            cache_dir,
            model: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> ImageModelKind {
        self.kind
    }

    fn load(&self) -> ClassifierResult<ImageEmbedding> {
        info!("Initializing image embedding model: {}", self.kind);
        let mut options =
            ImageInitOptions::new(self.kind.fastembed_model()).with_show_download_progress(true);
        if let Some(dir) = &self.cache_dir {
            options = options.with_cache_dir(dir.clone());
        }
        let model = ImageEmbedding::try_new(options).map_err(|e| {
            ClassifierError::Embedding(format!("Failed to initialize image model: {}", e))
        })?;
        info!("Image embedding model initialized successfully");
        Ok(model)
    }
}

impl ImageEmbedder for FastEmbedImageEmbedder {
    fn embed(&self, images: &[&[u8]]) -> ClassifierResult<Vec<FeatureVector>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding batch of {} images", images.len());

        let mut slot = self
            .model
            .lock()
            .map_err(|_| ClassifierError::Embedding("Image model lock poisoned".to_string()))?;
        if slot.is_none() {
            *slot = Some(self.load()?);
        }
        let model = slot
            .as_mut()
            .ok_or_else(|| ClassifierError::Embedding("Image model unavailable".to_string()))?;

        let embeddings = model
            .embed_bytes(images, None)
            .map_err(|e| ClassifierError::Embedding(format!("Failed to embed images: {}", e)))?;

        embeddings
            .into_iter()
            .map(|values| {
                FeatureVector::new(values)
                    .map_err(|e| ClassifierError::Embedding(format!("Invalid embedding: {}", e)))
            })
            .collect()
    }

    fn model_name(&self) -> &str {
        self.kind.name()
    }

    fn dimension(&self) -> usize {
        self.kind.dimension()
    }
}
