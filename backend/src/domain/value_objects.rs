/// Value objects for the domain layer
use super::base::{DomainError, DomainResult, ValueObject};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog identifier of a product (the retailer's stock code)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockCode(String);

impl StockCode {
    pub fn new(code: impl Into<String>) -> DomainResult<Self> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(DomainError::InvalidValue("StockCode cannot be empty".to_string()));
        }
        Ok(StockCode(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for StockCode {}

impl fmt::Display for StockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Price of a single unit, always strictly positive
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct UnitPrice(f64);

impl UnitPrice {
    pub fn new(value: f64) -> DomainResult<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(DomainError::InvalidValue(format!(
                "Unit price must be positive, got {}",
                value
            )));
        }
        Ok(UnitPrice(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl ValueObject for UnitPrice {}

impl fmt::Display for UnitPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

/// Dense feature vector used for TF-IDF documents and image features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> DomainResult<Self> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DomainError::InvalidValue(
                "Feature vector contains non-finite values".to_string(),
            ));
        }
        Ok(FeatureVector { values })
    }

    pub fn zeros(len: usize) -> Self {
        FeatureVector {
            values: vec![0.0; len],
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Scale to unit length; a zero vector stays zero
    pub fn l2_normalized(mut self) -> Self {
        let norm = self.norm();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
        self
    }

    /// Zero-pad (or truncate) to exactly `len` dimensions
    pub fn resized(&self, len: usize) -> Self {
        let mut values = self.values.clone();
        values.resize(len, 0.0);
        FeatureVector { values }
    }

    /// Cosine similarity; 0.0 when either side is a zero vector
    pub fn cosine_similarity(&self, other: &FeatureVector) -> f32 {
        let dot: f32 = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum();
        let denom = self.norm() * other.norm();
        if denom == 0.0 {
            0.0
        } else {
            dot / denom
        }
    }
}

impl ValueObject for FeatureVector {}

/// URL-safe identifier of a blog post
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slug(String);

impl Slug {
    pub fn new(slug: impl Into<String>) -> DomainResult<Self> {
        let slug = slug.into();
        if slug.is_empty() {
            return Err(DomainError::InvalidValue("Slug cannot be empty".to_string()));
        }
        if !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidValue(format!(
                "Slug may only contain lowercase letters, digits, '-' and '_': {}",
                slug
            )));
        }
        Ok(Slug(slug))
    }

    /// Derive a slug from a free-form title
    pub fn from_title(title: &str) -> DomainResult<Self> {
        let mut slug = String::with_capacity(title.len());
        for c in title.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }
        Self::new(slug.trim_end_matches('-'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Slug {}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A syntactically plausible e-mail address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn new(address: impl Into<String>) -> DomainResult<Self> {
        let address = address.into().trim().to_string();
        let valid = match address.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !address.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if !valid {
            return Err(DomainError::InvalidValue(format!(
                "Enter a valid email address: {}",
                address
            )));
        }
        Ok(EmailAddress(address))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for EmailAddress {}

/// Image container formats accepted for uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Jpeg,
    Png,
    Bmp,
    Tiff,
    Gif,
}

impl UploadFormat {
    /// Resolve from a filename's extension (case-insensitive)
    pub fn from_filename(filename: &str) -> DomainResult<Self> {
        let ext = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" => Ok(UploadFormat::Jpeg),
            "png" => Ok(UploadFormat::Png),
            "bmp" => Ok(UploadFormat::Bmp),
            "tif" | "tiff" => Ok(UploadFormat::Tiff),
            "gif" => Ok(UploadFormat::Gif),
            other => Err(DomainError::InvalidValue(format!(
                "Unsupported file type: .{}",
                other
            ))),
        }
    }
}

impl ValueObject for UploadFormat {}
