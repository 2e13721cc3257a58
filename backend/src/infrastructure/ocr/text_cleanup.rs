/// Cleanup of OCR output before it is used as a search query
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug)]
pub struct OcrTextCleaner {
    whitespace_regex: Regex,
    noise_regex: Regex,
}

impl OcrTextCleaner {
    pub fn new() -> Self {
        OcrTextCleaner {
            whitespace_regex: Regex::new(r"\s+").unwrap(),
            // Anything that is not a word char, whitespace or light punctuation
            noise_regex: Regex::new(r"[^\w\s\-.,!?]").unwrap(),
        }
    }

    /// Get a singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<OcrTextCleaner> = OnceLock::new();
        INSTANCE.get_or_init(OcrTextCleaner::new)
    }

    /// Normalize recognized text: collapse whitespace, strip noise,
    /// fix digit/letter confusions and drop stray single characters
    pub fn clean(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let text = self.whitespace_regex.replace_all(text, " ");
        let text = self.noise_regex.replace_all(&text, "");
        let text = text.replace('0', "O").replace('1', "I");

        text.split_whitespace()
            .filter(|word| {
                word.chars().count() > 1 || matches!(word.to_lowercase().as_str(), "a" | "i")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for OcrTextCleaner {
    fn default() -> Self {
        Self::new()
    }
}
