/// Application configuration loaded from an optional TOML file
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::infrastructure::vision::ImageModelKind;

/// Default upload limit for image routes
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub vector_db: VectorDbConfig,
    pub ocr: OcrConfig,
    pub classifier: ClassifierConfig,
    pub radio: RadioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            static_dir: PathBuf::from("static"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub dataset_path: PathBuf,
    pub cleaned_dataset_path: PathBuf,
    /// Number of unique products indexed for search
    pub sample_size: usize,
    pub top_k: usize,
    /// Local search keeps only scores strictly above this
    pub min_similarity: f32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            dataset_path: PathBuf::from("data/dataset.csv"),
            cleaned_dataset_path: PathBuf::from("data/cleaned_dataset.csv"),
            sample_size: 1000,
            top_k: 5,
            min_similarity: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Qdrant URL; local search only when unset
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub collection_name: String,
    pub dimension: usize,
    pub batch_size: usize,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        VectorDbConfig {
            url: None,
            api_key: None,
            collection_name: "ecommerce-products".to_string(),
            dimension: 384,
            batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub tesseract_cmd: String,
    /// Words at or below this confidence are discarded
    pub min_word_confidence: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig {
            tesseract_cmd: "tesseract".to_string(),
            min_word_confidence: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub image_dir: PathBuf,
    pub model_path: PathBuf,
    /// Pretrained backbone the centroid head is trained on
    pub embedding_model: ImageModelKind,
    /// Where downloaded model weights are cached; fastembed's default when unset
    pub model_cache_dir: Option<PathBuf>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            image_dir: PathBuf::from("data/scraped_images"),
            model_path: PathBuf::from("data/models/product_classifier.json"),
            embedding_model: ImageModelKind::default(),
            model_cache_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    pub database_path: PathBuf,
}

impl Default for RadioConfig {
    fn default() -> Self {
        RadioConfig {
            database_path: PathBuf::from("data/radio.sqlite3"),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid configuration")
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
