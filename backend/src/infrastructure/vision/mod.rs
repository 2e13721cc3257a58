/// Product photo classification over pretrained image embeddings
mod classifier;
mod embedder;

pub use classifier::{
    train_classifier, CentroidClassifier, CentroidModel, ClassScore, ClassifierError,
    ClassifierResult, ImageClassifier, ModelInfo, Prediction, TrainingReport,
};
pub use embedder::{ensure_decodable, FastEmbedImageEmbedder, ImageEmbedder, ImageModelKind};
