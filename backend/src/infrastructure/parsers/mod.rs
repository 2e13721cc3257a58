pub mod retail_csv;

pub use retail_csv::{
    ParseError, ParseResult, RawTransactionRow, RetailCsvParser, CLEANED_DATE_FORMAT,
};
