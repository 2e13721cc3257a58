/// Retail transactions CSV parser - reads raw dataset rows and reads/writes the cleaned dataset
use crate::domain::entities::TransactionRecord;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Timestamp layout used in the cleaned dataset file
pub const CLEANED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const REQUIRED_COLUMNS: [&str; 8] = [
    "InvoiceNo",
    "StockCode",
    "Description",
    "Quantity",
    "InvoiceDate",
    "UnitPrice",
    "CustomerID",
    "Country",
];

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid row {line}: {reason}")]
    InvalidRow { line: u64, reason: String },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// A dataset line exactly as found in the source file; every cell may be missing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTransactionRow {
    pub invoice_no: Option<String>,
    pub stock_code: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<String>,
    pub invoice_date: Option<String>,
    pub unit_price: Option<String>,
    pub customer_id: Option<String>,
    pub country: Option<String>,
}

/// Serialized shape of a cleaned dataset line
#[derive(Debug, Serialize, Deserialize)]
struct CleanedRow {
    #[serde(rename = "InvoiceNo")]
    invoice_no: String,
    #[serde(rename = "StockCode")]
    stock_code: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Quantity")]
    quantity: f64,
    #[serde(rename = "InvoiceDate")]
    invoice_date: String,
    #[serde(rename = "UnitPrice")]
    unit_price: f64,
    #[serde(rename = "CustomerID")]
    customer_id: i64,
    #[serde(rename = "Country")]
    country: String,
}

/// Parser for the retail transactions dataset
pub struct RetailCsvParser;

impl RetailCsvParser {
    /// Read every row of a raw dataset file
    pub fn read_raw(path: &Path) -> ParseResult<Vec<RawTransactionRow>> {
        info!("Loading dataset from {}", path.display());
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)?;
        let rows = Self::read_raw_from(reader)?;
        info!("Loaded {} raw rows", rows.len());
        Ok(rows)
    }

    /// Read raw rows from any reader (used by tests with in-memory data)
    pub fn read_raw_from<R: std::io::Read>(
        mut reader: csv::Reader<R>,
    ) -> ParseResult<Vec<RawTransactionRow>> {
        // Source files are not always valid UTF-8, so decode lossily per cell
        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let index: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), i))
            .collect();

        let mut columns = [0usize; 8];
        for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS.iter()) {
            *slot = *index
                .get(name)
                .ok_or_else(|| ParseError::MissingColumn(name.to_string()))?;
        }

        let mut rows = Vec::new();
        for record in reader.byte_records() {
            let record = record?;
            let cell = |i: usize| -> Option<String> {
                record
                    .get(columns[i])
                    .map(|b| String::from_utf8_lossy(b).to_string())
                    .filter(|s| !s.is_empty())
            };
            rows.push(RawTransactionRow {
                invoice_no: cell(0),
                stock_code: cell(1),
                description: cell(2),
                quantity: cell(3),
                invoice_date: cell(4),
                unit_price: cell(5),
                customer_id: cell(6),
                country: cell(7),
            });
        }

        debug!("Parsed {} rows with {} columns", rows.len(), headers.len());
        Ok(rows)
    }

    /// Write the cleaned dataset, creating parent directories as needed
    pub fn write_cleaned(path: &Path, records: &[TransactionRecord]) -> ParseResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(path)?;
        for record in records {
            writer.serialize(CleanedRow {
                invoice_no: record.invoice_no.clone(),
                stock_code: record.stock_code.clone(),
                description: record.description.clone(),
                quantity: record.quantity,
                invoice_date: record.invoice_date.format(CLEANED_DATE_FORMAT).to_string(),
                unit_price: record.unit_price,
                customer_id: record.customer_id,
                country: record.country.clone(),
            })?;
        }
        writer.flush()?;

        info!("Cleaned dataset saved to {} ({} rows)", path.display(), records.len());
        Ok(())
    }

    /// Read a dataset previously written by [`RetailCsvParser::write_cleaned`]
    pub fn read_cleaned(path: &Path) -> ParseResult<Vec<TransactionRecord>> {
        info!("Loading existing cleaned dataset from {}", path.display());
        let mut reader = csv::Reader::from_path(path)?;

        let mut records = Vec::new();
        for (line, row) in reader.deserialize::<CleanedRow>().enumerate() {
            let row = row?;
            let invoice_date = NaiveDateTime::parse_from_str(&row.invoice_date, CLEANED_DATE_FORMAT)
                .map_err(|e| ParseError::InvalidRow {
                    // +2: header line and 1-based numbering
                    line: line as u64 + 2,
                    reason: format!("bad InvoiceDate '{}': {}", row.invoice_date, e),
                })?;

            records.push(TransactionRecord {
                invoice_no: row.invoice_no,
                stock_code: row.stock_code,
                description: row.description,
                quantity: row.quantity,
                invoice_date,
                unit_price: row.unit_price,
                customer_id: row.customer_id,
                country: row.country,
            });
        }

        Ok(records)
    }
}
