/// OCR backend abstraction
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Unable to decode image bytes")]
    Decode,

    #[error("Image too large to process: {width}x{height}")]
    TooLarge { width: u32, height: u32 },

    #[error("OCR engine failed: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type OcrResult<T> = Result<T, OcrError>;

/// How the image was handled before recognition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMethod {
    EnhancedPreprocessing,
    DirectExtraction,
}

impl ProcessingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMethod::EnhancedPreprocessing => "enhanced_preprocessing",
            ProcessingMethod::DirectExtraction => "direct_extraction",
        }
    }
}

/// Text recognized in an image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrOutput {
    /// Cleaned text, ready to be used as a query
    pub extracted_text: String,
    pub raw_text: String,
    /// Mean confidence (0-100) of the kept words
    pub confidence: f32,
    pub word_count: usize,
    pub processing_method: ProcessingMethod,
}

/// A text-recognition engine
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Recognize text in encoded image bytes
    async fn extract_text(&self, image: &[u8], preprocess: bool) -> OcrResult<OcrOutput>;

    /// Whether the engine can currently be used
    async fn is_available(&self) -> bool;

    fn name(&self) -> &str;
}
