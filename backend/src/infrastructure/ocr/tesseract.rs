/// Tesseract OCR backend driving the external `tesseract` executable
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::backend::{OcrBackend, OcrError, OcrOutput, OcrResult, ProcessingMethod};
use super::preprocess;
use super::text_cleanup::OcrTextCleaner;
use crate::config::OcrConfig;

/// A word recognized by tesseract with its confidence
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedWord {
    pub text: String,
    pub confidence: f32,
}

pub struct TesseractBackend {
    command: String,
    min_word_confidence: f32,
}

impl TesseractBackend {
    pub fn new(config: &OcrConfig) -> Self {
        TesseractBackend {
            command: config.tesseract_cmd.clone(),
            min_word_confidence: config.min_word_confidence,
        }
    }

    /// Run tesseract on PNG bytes and return its TSV report
    async fn run(&self, png: &[u8]) -> OcrResult<String> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "tsv"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OcrError::Engine(format!("Failed to start {}: {}", self.command, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(png).await?;
            // Close stdin so tesseract starts processing
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Words from a tesseract TSV report whose whole-number confidence exceeds `min_confidence`
pub fn parse_tsv(tsv: &str, min_confidence: f32) -> Vec<RecognizedWord> {
    let mut lines = tsv.lines();
    let Some(header) = lines.next() else {
        return Vec::new();
    };

    let columns: Vec<&str> = header.split('\t').collect();
    let conf_col = columns.iter().position(|c| *c == "conf");
    let text_col = columns.iter().position(|c| *c == "text");
    let (Some(conf_col), Some(text_col)) = (conf_col, text_col) else {
        warn!("Unexpected tesseract TSV header: {}", header);
        return Vec::new();
    };

    lines
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            let confidence = fields.get(conf_col)?.trim().parse::<f32>().ok()?.trunc();
            let text = fields.get(text_col)?.trim();
            if confidence > min_confidence && !text.is_empty() {
                Some(RecognizedWord {
                    text: text.to_string(),
                    confidence,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Assemble the OCR result from recognized words
pub fn build_output(words: &[RecognizedWord], method: ProcessingMethod) -> OcrOutput {
    let raw_text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let confidence = if words.is_empty() {
        0.0
    } else {
        words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32
    };
    let extracted_text = OcrTextCleaner::instance().clean(&raw_text);

    OcrOutput {
        word_count: extracted_text.split_whitespace().count(),
        extracted_text,
        raw_text,
        confidence,
        processing_method: method,
    }
}

#[async_trait]
impl OcrBackend for TesseractBackend {
    async fn extract_text(&self, image: &[u8], preprocess: bool) -> OcrResult<OcrOutput> {
        let bytes = image.to_vec();
        let (png, method) = tokio::task::spawn_blocking(move || preprocess::prepare(&bytes, preprocess))
            .await
            .map_err(|e| OcrError::Engine(format!("Preprocessing task failed: {}", e)))??;

        let tsv = self.run(&png).await?;
        let words = parse_tsv(&tsv, self.min_word_confidence);
        debug!("Tesseract kept {} words", words.len());

        Ok(build_output(&words, method))
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}
