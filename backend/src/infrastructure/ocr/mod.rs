/// Handwritten-text recognition
mod backend;
pub mod preprocess;
mod tesseract;
mod text_cleanup;

pub use backend::{OcrBackend, OcrError, OcrOutput, OcrResult, ProcessingMethod};
pub use tesseract::{build_output, parse_tsv, RecognizedWord, TesseractBackend};
pub use text_cleanup::OcrTextCleaner;
