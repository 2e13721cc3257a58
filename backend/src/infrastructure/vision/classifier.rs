/// Trainable product image classifier: a centroid head over pretrained image embeddings
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{info, warn};

use super::embedder::{ensure_decodable, ImageEmbedder};
use crate::domain::value_objects::FeatureVector;
use crate::infrastructure::file_system::discover_image_classes;

/// Every n-th image of a class is held out for validation
const VALIDATION_EVERY: usize = 5;

/// Classes with fewer samples than this produce a warning
const MIN_SAMPLES_PER_CLASS: usize = 10;

/// Sharpens the softmax over cosine similarities, which all sit close together
const SOFTMAX_TEMPERATURE: f32 = 0.05;

const TOP_PREDICTIONS: usize = 3;

/// Images per embedding call during training
const EMBED_BATCH: usize = 16;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("No trained model available")]
    NoModel,

    #[error("Could not decode image")]
    Decode,

    #[error("No training data found in {0}")]
    NoTrainingData(String),

    #[error("Invalid model file: {0}")]
    InvalidModel(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model file error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ClassifierResult<T> = Result<T, ClassifierError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScore {
    pub class: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub predicted_class: String,
    pub confidence: f32,
    pub top_predictions: Vec<ClassScore>,
    pub all_class_probabilities: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub model_exists: bool,
    pub model_loaded: bool,
    pub num_classes: usize,
    pub class_names: Vec<String>,
    pub embedding_model: String,
    pub feature_length: usize,
    pub validation_accuracy: Option<f32>,
    pub trained_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub num_classes: usize,
    pub training_samples: usize,
    pub validation_samples: usize,
    pub validation_accuracy: Option<f32>,
    pub class_names: Vec<String>,
    pub samples_per_class: BTreeMap<String, usize>,
    pub embedding_model: String,
}

/// Something that can name the product shown in a photo
pub trait ImageClassifier: Send + Sync {
    fn predict(&self, image: &[u8]) -> ClassifierResult<Prediction>;

    fn model_info(&self) -> ModelInfo;

    /// Re-read the persisted model
    fn reload(&self) -> ClassifierResult<()>;
}

/// Persisted nearest-centroid head; one centroid per class in embedding space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidModel {
    pub class_names: Vec<String>,
    pub centroids: Vec<FeatureVector>,
    pub embedding_model: String,
    pub validation_accuracy: Option<f32>,
    pub trained_at: DateTime<Utc>,
}

impl CentroidModel {
    /// Build from labelled embeddings; `samples[i]` belongs to `class_names[i]`
    pub fn fit(
        class_names: Vec<String>,
        embedding_model: impl Into<String>,
        samples: &[Vec<FeatureVector>],
    ) -> Self {
        let centroids = samples.iter().map(|vectors| centroid(vectors)).collect();
        CentroidModel {
            class_names,
            centroids,
            embedding_model: embedding_model.into(),
            validation_accuracy: None,
            trained_at: Utc::now(),
        }
    }

    /// Embedding length the centroids were built from
    pub fn dimension(&self) -> usize {
        self.centroids.first().map(FeatureVector::len).unwrap_or(0)
    }

    /// Every class needs exactly one centroid, all of the same non-zero length
    pub fn validate(&self) -> ClassifierResult<()> {
        if self.class_names.is_empty() {
            return Err(ClassifierError::InvalidModel("model has no classes".to_string()));
        }
        if self.class_names.len() != self.centroids.len() {
            return Err(ClassifierError::InvalidModel(format!(
                "{} class names but {} centroids",
                self.class_names.len(),
                self.centroids.len()
            )));
        }
        let dimension = self.dimension();
        if dimension == 0 || self.centroids.iter().any(|c| c.len() != dimension) {
            return Err(ClassifierError::InvalidModel(
                "centroids must share one non-zero length".to_string(),
            ));
        }
        Ok(())
    }

    /// Class probabilities in class order
    pub fn probabilities(&self, features: &FeatureVector) -> Vec<f32> {
        let scaled: Vec<f32> = self
            .centroids
            .iter()
            .map(|c| features.cosine_similarity(c) / SOFTMAX_TEMPERATURE)
            .collect();
        softmax(&scaled)
    }

    pub fn predict_features(&self, features: &FeatureVector) -> ClassifierResult<Prediction> {
        self.validate()?;
        if features.len() != self.dimension() {
            return Err(ClassifierError::InvalidModel(format!(
                "expected {} features, got {}",
                self.dimension(),
                features.len()
            )));
        }

        let probabilities = self.probabilities(features);
        let mut ranked: Vec<ClassScore> = self
            .class_names
            .iter()
            .zip(probabilities.iter())
            .map(|(class, &confidence)| ClassScore {
                class: class.clone(),
                confidence,
            })
            .collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let all_class_probabilities = ranked
            .iter()
            .map(|s| (s.class.clone(), s.confidence))
            .collect();
        let best = ranked.first().cloned().ok_or(ClassifierError::NoModel)?;
        ranked.truncate(TOP_PREDICTIONS);

        Ok(Prediction {
            predicted_class: best.class,
            confidence: best.confidence,
            top_predictions: ranked,
            all_class_probabilities,
        })
    }

    pub fn save(&self, path: &Path) -> ClassifierResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        info!("Model saved to {}", path.display());
        Ok(())
    }

    /// Read and validate a model file
    pub fn load(path: &Path) -> ClassifierResult<Self> {
        let bytes = std::fs::read(path)?;
        let model: CentroidModel = serde_json::from_slice(&bytes)?;
        model.validate()?;
        Ok(model)
    }
}

fn centroid(vectors: &[FeatureVector]) -> FeatureVector {
    let len = vectors.first().map(FeatureVector::len).unwrap_or(0);
    let mut sum = vec![0.0f32; len];
    for v in vectors {
        for (acc, value) in sum.iter_mut().zip(v.values()) {
            *acc += value;
        }
    }
    let n = vectors.len().max(1) as f32;
    FeatureVector::new(sum.into_iter().map(|v| v / n).collect())
        .unwrap_or_else(|_| FeatureVector::zeros(len))
}

fn softmax(values: &[f32]) -> Vec<f32> {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values.iter().map(|v| (v - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Embed readable images in batches; unrecognisable files are skipped
fn embed_images(
    embedder: &dyn ImageEmbedder,
    images: Vec<(PathBuf, Vec<u8>)>,
) -> ClassifierResult<Vec<FeatureVector>> {
    let usable: Vec<Vec<u8>> = images
        .into_iter()
        .filter_map(|(path, bytes)| match ensure_decodable(&bytes) {
            Ok(()) => Some(bytes),
            Err(_) => {
                warn!("Skipping unreadable image {}", path.display());
                None
            }
        })
        .collect();

    let mut vectors = Vec::with_capacity(usable.len());
    for chunk in usable.chunks(EMBED_BATCH) {
        let batch: Vec<&[u8]> = chunk.iter().map(Vec::as_slice).collect();
        vectors.extend(embedder.embed(&batch)?);
    }
    Ok(vectors)
}

/// Train on `<image_dir>/<class>/*.{jpg,jpeg,png,bmp}` and persist the model
pub async fn train_classifier(
    image_dir: &Path,
    model_path: &Path,
    embedder: Arc<dyn ImageEmbedder>,
) -> ClassifierResult<TrainingReport> {
    if !image_dir.exists() {
        return Err(ClassifierError::NoTrainingData(image_dir.display().to_string()));
    }
    let classes = discover_image_classes(image_dir).await?;

    let mut class_names = Vec::new();
    let mut training = Vec::new();
    let mut validation: Vec<(usize, FeatureVector)> = Vec::new();
    let mut samples_per_class = BTreeMap::new();

    for class in classes {
        let mut files = Vec::with_capacity(class.images.len());
        for path in &class.images {
            match tokio::fs::read(path).await {
                Ok(bytes) => files.push((path.clone(), bytes)),
                Err(e) => warn!("Skipping unreadable image {}: {}", path.display(), e),
            }
        }

        let class_embedder = Arc::clone(&embedder);
        let vectors = tokio::task::spawn_blocking(move || embed_images(class_embedder.as_ref(), files))
            .await
            .map_err(|e| ClassifierError::Embedding(format!("Embedding task failed: {}", e)))??;

        let mut train_vectors = Vec::new();
        let mut held_out = Vec::new();
        for (i, features) in vectors.into_iter().enumerate() {
            if i % VALIDATION_EVERY == VALIDATION_EVERY - 1 {
                held_out.push(features);
            } else {
                train_vectors.push(features);
            }
        }

        if train_vectors.is_empty() {
            warn!("Class '{}' has no usable images", class.class_name);
            continue;
        }

        let count = train_vectors.len() + held_out.len();
        if count < MIN_SAMPLES_PER_CLASS {
            warn!("Class '{}' has only {} samples", class.class_name, count);
        }
        info!("Loaded {} images for class '{}'", count, class.class_name);

        let class_index = class_names.len();
        validation.extend(held_out.into_iter().map(|f| (class_index, f)));
        samples_per_class.insert(class.class_name.clone(), count);
        class_names.push(class.class_name);
        training.push(train_vectors);
    }

    if class_names.is_empty() {
        return Err(ClassifierError::NoTrainingData(image_dir.display().to_string()));
    }

    let mut model = CentroidModel::fit(class_names.clone(), embedder.model_name(), &training);

    if !validation.is_empty() {
        let correct = validation
            .iter()
            .filter(|(label, features)| {
                model
                    .predict_features(features)
                    .map(|p| Some(&p.predicted_class) == model.class_names.get(*label))
                    .unwrap_or(false)
            })
            .count();
        model.validation_accuracy = Some(correct as f32 / validation.len() as f32);
    }
    model.save(model_path)?;

    let report = TrainingReport {
        num_classes: class_names.len(),
        training_samples: training.iter().map(Vec::len).sum(),
        validation_samples: validation.len(),
        validation_accuracy: model.validation_accuracy,
        class_names,
        samples_per_class,
        embedding_model: model.embedding_model.clone(),
    };
    info!(
        "Trained classifier on {} classes over {} embeddings (validation accuracy: {:?})",
        report.num_classes, report.embedding_model, report.validation_accuracy
    );
    Ok(report)
}

/// [`ImageClassifier`] backed by an [`ImageEmbedder`] and a [`CentroidModel`] file
pub struct CentroidClassifier {
    model_path: PathBuf,
    embedder: Arc<dyn ImageEmbedder>,
    model: RwLock<Option<CentroidModel>>,
}

impl CentroidClassifier {
    /// Load the model if it exists; a missing model is not an error until prediction
    pub fn new(model_path: impl Into<PathBuf>, embedder: Arc<dyn ImageEmbedder>) -> Self {
        let classifier = CentroidClassifier {
            model_path: model_path.into(),
            embedder,
            model: RwLock::new(None),
        };
        if let Err(e) = classifier.reload() {
            info!("Classifier model not loaded: {}", e);
        }
        classifier
    }

    pub fn with_model(
        model_path: impl Into<PathBuf>,
        embedder: Arc<dyn ImageEmbedder>,
        model: CentroidModel,
    ) -> ClassifierResult<Self> {
        model.validate()?;
        Ok(CentroidClassifier {
            model_path: model_path.into(),
            embedder,
            model: RwLock::new(Some(model)),
        })
    }
}

impl ImageClassifier for CentroidClassifier {
    fn predict(&self, image: &[u8]) -> ClassifierResult<Prediction> {
        let guard = self.model.read().map_err(|_| ClassifierError::NoModel)?;
        let model = guard.as_ref().ok_or(ClassifierError::NoModel)?;
        ensure_decodable(image)?;
        let features = self
            .embedder
            .embed(&[image])?
            .into_iter()
            .next()
            .ok_or_else(|| ClassifierError::Embedding("No embedding returned".to_string()))?;
        model.predict_features(&features)
    }

    fn model_info(&self) -> ModelInfo {
        let model_exists = self.model_path.exists();
        let guard = self.model.read().ok();
        match guard.as_ref().and_then(|g| g.as_ref()) {
            Some(model) => ModelInfo {
                model_exists,
                model_loaded: true,
                num_classes: model.class_names.len(),
                class_names: model.class_names.clone(),
                embedding_model: model.embedding_model.clone(),
                feature_length: model.dimension(),
                validation_accuracy: model.validation_accuracy,
                trained_at: Some(model.trained_at),
            },
            None => ModelInfo {
                model_exists,
                model_loaded: false,
                num_classes: 0,
                class_names: Vec::new(),
                embedding_model: self.embedder.model_name().to_string(),
                feature_length: self.embedder.dimension(),
                validation_accuracy: None,
                trained_at: None,
            },
        }
    }

    fn reload(&self) -> ClassifierResult<()> {
        if !self.model_path.exists() {
            return Err(ClassifierError::NoModel);
        }
        let model = CentroidModel::load(&self.model_path)?;
        if model.embedding_model != self.embedder.model_name() {
            return Err(ClassifierError::InvalidModel(format!(
                "trained on {} embeddings, classifier uses {}",
                model.embedding_model,
                self.embedder.model_name()
            )));
        }
        info!(
            "Loaded classifier with {} classes from {}",
            model.class_names.len(),
            self.model_path.display()
        );
        if let Ok(mut slot) = self.model.write() {
            *slot = Some(model);
        }
        Ok(())
    }
}
