/// Cleaning pipeline for the retail transactions dataset
use crate::application::dto::{DataQuality, DatasetSummary, DateRange};
use crate::domain::aggregates::Catalog;
use crate::domain::entities::TransactionRecord;
use crate::infrastructure::parsers::{ParseError, RawTransactionRow, RetailCsvParser};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset file error: {0}")]
    Parse(#[from] ParseError),

    #[error("No dataset available")]
    Unavailable,
}

pub type DatasetResult<T> = Result<T, DatasetError>;

/// Placeholder for lines without a description
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Customer id assigned to guest purchases
pub const GUEST_CUSTOMER_ID: i64 = -1;

const DATE_FORMATS: [&str; 4] = [
    "%m/%d/%Y %H:%M",
    "%m/%d/%y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// The cleaned dataset together with how many source rows it came from
#[derive(Debug, Clone, Default)]
pub struct CleanedDataset {
    records: Vec<TransactionRecord>,
    original_rows: Option<usize>,
    guest_records: usize,
}

impl CleanedDataset {
    /// Wrap records that were already cleaned (e.g. loaded from the cleaned file)
    pub fn from_cleaned(records: Vec<TransactionRecord>) -> Self {
        let guest_records = records.iter().filter(|r| r.is_guest()).count();
        CleanedDataset {
            records,
            original_rows: None,
            guest_records,
        }
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records_removed(&self) -> usize {
        self.original_rows
            .map(|n| n.saturating_sub(self.records.len()))
            .unwrap_or(0)
    }

    pub fn unique_products(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.stock_code.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn date_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let start = self.records.iter().map(|r| r.invoice_date).min()?;
        let end = self.records.iter().map(|r| r.invoice_date).max()?;
        Some((start, end))
    }

    /// Searchable products: unique stock codes in dataset order, at most `limit`
    pub fn catalog(&self, limit: usize) -> Catalog {
        Catalog::from_records(&self.records, limit)
    }

    pub fn summary(&self) -> DatasetSummary {
        let unique_customers = self
            .records
            .iter()
            .map(|r| r.customer_id)
            .collect::<HashSet<_>>()
            .len();
        let countries = self
            .records
            .iter()
            .map(|r| r.country.as_str())
            .collect::<HashSet<_>>()
            .len();

        DatasetSummary {
            total_records: self.records.len(),
            unique_products: self.unique_products(),
            unique_customers,
            date_range: self.date_range().map(|(start, end)| DateRange {
                start: start.format("%Y-%m-%d").to_string(),
                end: end.format("%Y-%m-%d").to_string(),
            }),
            countries,
            total_revenue: self.records.iter().map(TransactionRecord::revenue).sum(),
            data_quality: DataQuality {
                missing_descriptions: self
                    .records
                    .iter()
                    .filter(|r| r.description.is_empty())
                    .count(),
                missing_customer_ids: self.guest_records,
                records_removed: self.records_removed(),
            },
        }
    }

    /// Persist the cleaned records
    pub fn save(&self, path: &Path) -> DatasetResult<()> {
        RetailCsvParser::write_cleaned(path, &self.records)?;
        Ok(())
    }
}

/// Normalizes raw dataset rows into [`TransactionRecord`]s
pub struct DatasetCleaner {
    non_word_or_space: Regex,
    non_word: Regex,
    non_numeric: Regex,
    non_id: Regex,
}

impl DatasetCleaner {
    pub fn new() -> Self {
        DatasetCleaner {
            non_word_or_space: Regex::new(r"[^\w\s]").expect("valid regex"),
            non_word: Regex::new(r"[^\w]").expect("valid regex"),
            non_numeric: Regex::new(r"[^\d.-]").expect("valid regex"),
            non_id: Regex::new(r"[^\d.]").expect("valid regex"),
        }
    }

    /// Load the cleaned dataset if it exists, otherwise clean the raw file and save the result
    pub fn load_or_clean(&self, raw_path: &Path, cleaned_path: &Path) -> DatasetResult<CleanedDataset> {
        if cleaned_path.exists() {
            let records = RetailCsvParser::read_cleaned(cleaned_path)?;
            return Ok(CleanedDataset::from_cleaned(records));
        }

        if !raw_path.exists() {
            return Err(DatasetError::Unavailable);
        }

        let dataset = self.clean_file(raw_path)?;
        dataset.save(cleaned_path)?;
        Ok(dataset)
    }

    /// Read and clean a raw dataset file
    pub fn clean_file(&self, path: &Path) -> DatasetResult<CleanedDataset> {
        let rows = RetailCsvParser::read_raw(path)?;
        Ok(self.clean(rows))
    }

    /// Run the cleaning steps over raw rows
    pub fn clean(&self, rows: Vec<RawTransactionRow>) -> CleanedDataset {
        let original_rows = rows.len();
        info!("Original dataset rows: {}", original_rows);

        let mut seen = HashSet::new();
        let mut duplicates = 0usize;
        let mut guest_records = 0usize;
        let mut records = Vec::with_capacity(rows.len());

        for row in rows {
            let country = self.clean_country(row.country.as_deref());
            let stock_code = self.strip_non_word(row.stock_code.as_deref());
            let invoice_no = self.strip_non_word(row.invoice_no.as_deref());
            let description = self.clean_description(row.description.as_deref());

            let quantity = self.parse_numeric(row.quantity.as_deref());
            let unit_price = self.parse_numeric(row.unit_price.as_deref());
            let (quantity, unit_price) = match (quantity, unit_price) {
                (Some(q), Some(p)) if q > 0.0 && p > 0.0 => (q, p),
                _ => continue,
            };

            let customer_id = self.parse_customer_id(row.customer_id.as_deref());

            // Exact duplicates are detected on the cleaned values, before date parsing
            let raw_date = row.invoice_date.unwrap_or_default();
            let key = (
                invoice_no.clone(),
                stock_code.clone(),
                description.clone(),
                quantity.to_bits(),
                raw_date.clone(),
                unit_price.to_bits(),
                customer_id.map(f64::to_bits),
                country.clone(),
            );
            if !seen.insert(key) {
                duplicates += 1;
                continue;
            }

            let Some(invoice_date) = parse_invoice_date(&raw_date) else {
                continue;
            };

            let customer_id = match customer_id {
                Some(id) => id as i64,
                None => {
                    guest_records += 1;
                    GUEST_CUSTOMER_ID
                }
            };

            records.push(TransactionRecord {
                invoice_no,
                stock_code,
                description: description.to_uppercase(),
                quantity,
                invoice_date,
                unit_price,
                customer_id,
                country: title_case(&country),
            });
        }

        info!("Removed {} duplicate records", duplicates);
        info!("Cleaned dataset rows: {}", records.len());

        CleanedDataset {
            records,
            original_rows: Some(original_rows),
            guest_records,
        }
    }

    fn clean_country(&self, value: Option<&str>) -> String {
        let value = value.unwrap_or_default();
        let stripped = self.non_word_or_space.replace_all(value, "");
        stripped.replace("XxY", "").trim().to_string()
    }

    fn strip_non_word(&self, value: Option<&str>) -> String {
        self.non_word
            .replace_all(value.unwrap_or_default(), "")
            .to_string()
    }

    fn clean_description(&self, value: Option<&str>) -> String {
        let value = value.unwrap_or(UNKNOWN_PRODUCT);
        self.non_word_or_space
            .replace_all(value, " ")
            .trim()
            .to_string()
    }

    fn parse_numeric(&self, value: Option<&str>) -> Option<f64> {
        let cleaned = self.non_numeric.replace_all(value?, "");
        cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Parsed as a float so duplicate detection sees the id exactly as written
    fn parse_customer_id(&self, value: Option<&str>) -> Option<f64> {
        let cleaned = self.non_id.replace_all(value?, "");
        cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl Default for DatasetCleaner {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an invoice timestamp in any of the layouts seen in retail exports
pub fn parse_invoice_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Capitalize the first letter of every alphabetic run, lowercase the rest
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_alpha = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        invoice: &str,
        code: &str,
        description: Option<&str>,
        quantity: &str,
        date: &str,
        price: &str,
        customer: Option<&str>,
        country: &str,
    ) -> RawTransactionRow {
        RawTransactionRow {
            invoice_no: Some(invoice.to_string()),
            stock_code: Some(code.to_string()),
            description: description.map(String::from),
            quantity: Some(quantity.to_string()),
            invoice_date: Some(date.to_string()),
            unit_price: Some(price.to_string()),
            customer_id: customer.map(String::from),
            country: Some(country.to_string()),
        }
    }

    #[test]
    fn test_text_columns_are_normalized() {
        let cleaner = DatasetCleaner::new();
        let dataset = cleaner.clean(vec![row(
            "#536365",
            "85123-A",
            Some("white hanging heart t-light holder!"),
            "6",
            "12/1/2010 8:26",
            "2.55",
            Some("17850.0"),
            "united kingdom!XxY",
        )]);

        let record = &dataset.records()[0];
        assert_eq!(record.invoice_no, "536365");
        assert_eq!(record.stock_code, "85123A");
        assert_eq!(record.description, "WHITE HANGING HEART T LIGHT HOLDER");
        assert_eq!(record.country, "United Kingdom");
        assert_eq!(record.customer_id, 17850);
    }

    #[test]
    fn test_non_positive_and_unparseable_numbers_are_dropped() {
        let cleaner = DatasetCleaner::new();
        let dataset = cleaner.clean(vec![
            row("1", "A", Some("MUG"), "-2", "12/1/2010 8:26", "1.0", Some("1"), "France"),
            row("2", "B", Some("MUG"), "2", "12/1/2010 8:26", "0", Some("1"), "France"),
            row("3", "C", Some("MUG"), "abc", "12/1/2010 8:26", "1.0", Some("1"), "France"),
            row("4", "D", Some("MUG"), "3 pcs", "12/1/2010 8:26", "$1.50", Some("1"), "France"),
        ]);

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records()[0].stock_code, "D");
        assert_eq!(dataset.records()[0].quantity, 3.0);
        assert_eq!(dataset.records()[0].unit_price, 1.5);
        assert_eq!(dataset.records_removed(), 3);
    }

    #[test]
    fn test_missing_values_are_filled() {
        let cleaner = DatasetCleaner::new();
        let dataset = cleaner.clean(vec![row(
            "1", "A", None, "1", "2011-01-05 10:00:00", "1.0", None, "Spain",
        )]);

        let record = &dataset.records()[0];
        assert_eq!(record.description, "UNKNOWN PRODUCT");
        assert_eq!(record.customer_id, GUEST_CUSTOMER_ID);
        assert_eq!(dataset.summary().data_quality.missing_customer_ids, 1);
    }

    #[test]
    fn test_duplicates_and_bad_dates_are_removed() {
        let cleaner = DatasetCleaner::new();
        let dataset = cleaner.clean(vec![
            row("1", "A", Some("MUG"), "1", "12/1/2010 8:26", "1.0", Some("5"), "France"),
            row("1", "A", Some("MUG"), "1", "12/1/2010 8:26", "1.0", Some("5"), "France"),
            row("2", "B", Some("CUP"), "1", "not a date", "1.0", Some("5"), "France"),
        ]);

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records_removed(), 2);
    }

    #[test]
    fn test_fractional_customer_ids_are_distinct_for_dedup() {
        let cleaner = DatasetCleaner::new();
        let dataset = cleaner.clean(vec![
            row("1", "A", Some("MUG"), "1", "12/1/2010 8:26", "1.0", Some("5"), "France"),
            row("1", "A", Some("MUG"), "1", "12/1/2010 8:26", "1.0", Some("5.5"), "France"),
            row("1", "A", Some("MUG"), "1", "12/1/2010 8:26", "1.0", Some("5.0"), "France"),
        ]);

        // "5" and "5.0" are the same number; "5.5" is a different customer
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records_removed(), 1);
    }

    #[test]
    fn test_summary() {
        let cleaner = DatasetCleaner::new();
        let dataset = cleaner.clean(vec![
            row("1", "A", Some("MUG"), "2", "12/1/2010 8:26", "1.5", Some("5"), "France"),
            row("2", "B", Some("CUP"), "1", "12/9/2011 12:50", "4.0", Some("6"), "Spain"),
            row("3", "A", Some("MUG"), "1", "6/1/2011 9:00", "1.5", Some("5"), "France"),
        ]);

        let summary = dataset.summary();
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.unique_products, 2);
        assert_eq!(summary.unique_customers, 2);
        assert_eq!(summary.countries, 2);
        assert!((summary.total_revenue - 8.5).abs() < 1e-9);

        let range = summary.date_range.unwrap();
        assert_eq!(range.start, "2010-12-01");
        assert_eq!(range.end, "2011-12-09");
    }

    #[test]
    fn test_title_case_matches_word_boundaries() {
        assert_eq!(title_case("UNITED KINGDOM"), "United Kingdom");
        assert_eq!(title_case("eire"), "Eire");
        assert_eq!(title_case("channel islands2x"), "Channel Islands2X");
    }

    #[test]
    fn test_parse_invoice_date_formats() {
        assert!(parse_invoice_date("12/1/2010 8:26").is_some());
        assert!(parse_invoice_date("12/1/10 8:26").is_some());
        assert!(parse_invoice_date("2010-12-01 08:26:00").is_some());
        assert!(parse_invoice_date("2010-12-01").is_some());
        assert!(parse_invoice_date("").is_none());
    }
}
