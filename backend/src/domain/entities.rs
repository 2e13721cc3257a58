/// Domain entities
use super::base::Entity;
use super::value_objects::{StockCode, UnitPrice};
use chrono::NaiveDateTime;

/// A Product is a single sellable catalog item
/// Products are identified by their stock code; the other fields describe the listing
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    stock_code: StockCode,
    description: String,
    unit_price: UnitPrice,
    country: String,
}

impl Product {
    pub fn new(
        stock_code: StockCode,
        description: impl Into<String>,
        unit_price: UnitPrice,
        country: impl Into<String>,
    ) -> Self {
        Product {
            stock_code,
            description: description.into(),
            unit_price,
            country: country.into(),
        }
    }

    pub fn stock_code(&self) -> &StockCode {
        &self.stock_code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn unit_price(&self) -> UnitPrice {
        self.unit_price
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// Text used to vectorize this product in the search index
    pub fn search_document(&self) -> String {
        format!(
            "{} {} {}",
            self.description,
            self.stock_code.as_str(),
            self.country
        )
        .to_lowercase()
    }
}

impl Entity for Product {
    type Id = StockCode;

    fn id(&self) -> &Self::Id {
        &self.stock_code
    }
}

/// One cleaned line of the retail transactions dataset
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub invoice_no: String,
    pub stock_code: String,
    pub description: String,
    pub quantity: f64,
    pub invoice_date: NaiveDateTime,
    pub unit_price: f64,
    /// -1 marks a guest purchase without a customer account
    pub customer_id: i64,
    pub country: String,
}

impl TransactionRecord {
    pub fn revenue(&self) -> f64 {
        self.quantity * self.unit_price
    }

    pub fn is_guest(&self) -> bool {
        self.customer_id < 0
    }

    /// Build the catalog product this line refers to, if its code and price are usable
    pub fn to_product(&self) -> Option<Product> {
        let stock_code = StockCode::new(self.stock_code.clone()).ok()?;
        let unit_price = UnitPrice::new(self.unit_price).ok()?;
        Some(Product::new(
            stock_code,
            self.description.clone(),
            unit_price,
            self.country.clone(),
        ))
    }
}
