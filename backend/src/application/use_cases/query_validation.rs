use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_QUERY_CHARS: usize = 500;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryValidationError {
    #[error("Empty query")]
    Empty,

    #[error("Query too short")]
    TooShort,

    #[error("Query too long")]
    TooLong,

    #[error("Invalid query content")]
    Dangerous,

    #[error("Query contains sensitive information")]
    Sensitive,
}

/// Cleans free-text queries and rejects script injection or personal data
pub struct QueryValidator {
    whitespace: Regex,
    dangerous: Vec<Regex>,
    sensitive: Vec<Regex>,
}

impl QueryValidator {
    pub fn new() -> Self {
        let dangerous = [
            r"(?i)<script.*?>.*?</script>",
            r"(?i)javascript:",
            r"(?i)on\w+\s*=",
            r"(?i)eval\s*\(",
            r"(?i)exec\s*\(",
        ];
        let sensitive = [
            // card number
            r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b",
            // SSN
            r"\b\d{3}-\d{2}-\d{4}\b",
            // email; the TLD class also admits `|`
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b",
        ];

        QueryValidator {
            whitespace: Regex::new(r"\s+").unwrap(),
            dangerous: dangerous.iter().map(|p| Regex::new(p).unwrap()).collect(),
            sensitive: sensitive.iter().map(|p| Regex::new(p).unwrap()).collect(),
        }
    }

    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<QueryValidator> = OnceLock::new();
        INSTANCE.get_or_init(QueryValidator::new)
    }

    /// Returns the query with whitespace runs collapsed, or why it was rejected
    pub fn validate(&self, query: &str) -> Result<String, QueryValidationError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(QueryValidationError::Empty);
        }

        let cleaned = self.whitespace.replace_all(trimmed, " ").into_owned();
        let length = cleaned.chars().count();
        if length < MIN_QUERY_CHARS {
            return Err(QueryValidationError::TooShort);
        }
        if length > MAX_QUERY_CHARS {
            return Err(QueryValidationError::TooLong);
        }

        if self.dangerous.iter().any(|p| p.is_match(&cleaned)) {
            return Err(QueryValidationError::Dangerous);
        }
        if self.sensitive.iter().any(|p| p.is_match(&cleaned)) {
            return Err(QueryValidationError::Sensitive);
        }

        Ok(cleaned)
    }
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_query(query: &str) -> Result<String, QueryValidationError> {
    QueryValidator::instance().validate(query)
}
