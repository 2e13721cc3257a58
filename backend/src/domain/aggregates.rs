/// Domain aggregates
use super::base::{DomainError, DomainResult, Entity};
use super::entities::{Product, TransactionRecord};
use super::value_objects::StockCode;
use std::collections::HashMap;

/// The Catalog is the aggregate root for searchable products
/// It keeps products unique by stock code and remembers insertion order,
/// which is also the order the search index is built in
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    positions: HashMap<StockCode, usize>,
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from dataset lines: first line per stock code wins,
    /// and at most `limit` products are kept
    pub fn from_records(records: &[TransactionRecord], limit: usize) -> Self {
        let mut catalog = Catalog::new();
        for record in records {
            if catalog.len() >= limit {
                break;
            }
            if let Some(product) = record.to_product() {
                if !catalog.contains(product.stock_code()) {
                    // Cannot fail: uniqueness checked above
                    let _ = catalog.add_product(product);
                }
            }
        }
        catalog
    }

    /// Add a product; stock codes must be unique
    pub fn add_product(&mut self, product: Product) -> DomainResult<()> {
        let code = product.id().clone();
        if self.positions.contains_key(&code) {
            return Err(DomainError::BusinessRuleViolation(format!(
                "Product {} is already in the catalog",
                code
            )));
        }
        self.positions.insert(code, self.products.len());
        self.products.push(product);
        Ok(())
    }

    pub fn contains(&self, code: &StockCode) -> bool {
        self.positions.contains_key(code)
    }

    pub fn get(&self, code: &StockCode) -> Option<&Product> {
        self.positions.get(code).map(|&idx| &self.products[idx])
    }

    /// Product at a given index position
    pub fn at(&self, index: usize) -> Option<&Product> {
        self.products.get(index)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Search documents in catalog order
    pub fn documents(&self) -> Vec<String> {
        self.products.iter().map(Product::search_document).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::UnitPrice;
    use chrono::NaiveDate;

    fn record(code: &str, description: &str, price: f64) -> TransactionRecord {
        TransactionRecord {
            invoice_no: "1".to_string(),
            stock_code: code.to_string(),
            description: description.to_string(),
            quantity: 1.0,
            invoice_date: NaiveDate::from_ymd_opt(2011, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            unit_price: price,
            customer_id: 1,
            country: "France".to_string(),
        }
    }

    #[test]
    fn test_from_records_keeps_first_occurrence() {
        let records = vec![
            record("A1", "RED MUG", 1.0),
            record("B2", "BLUE MUG", 2.0),
            record("A1", "RED MUG LARGE", 3.0),
        ];

        let catalog = Catalog::from_records(&records, 100);
        assert_eq!(catalog.len(), 2);

        let mug = catalog.get(&StockCode::new("A1").unwrap()).unwrap();
        assert_eq!(mug.description(), "RED MUG");
        assert_eq!(catalog.at(1).unwrap().stock_code().as_str(), "B2");
    }

    #[test]
    fn test_from_records_respects_limit() {
        let records: Vec<_> = (0..10)
            .map(|i| record(&format!("C{}", i), "CANDLE", 1.0))
            .collect();
        let catalog = Catalog::from_records(&records, 3);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_rows_without_stock_code_are_not_products() {
        let records = vec![
            record("", "POSTAGE", 18.0),
            record("A1", "RED MUG", 1.0),
            record("", "MANUAL", 2.5),
        ];

        let catalog = Catalog::from_records(&records, 100);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.at(0).unwrap().stock_code().as_str(), "A1");
    }

    #[test]
    fn test_add_duplicate_product_is_rejected() {
        let mut catalog = Catalog::new();
        let product = Product::new(
            StockCode::new("X").unwrap(),
            "LAMP",
            UnitPrice::new(4.0).unwrap(),
            "Spain",
        );
        catalog.add_product(product.clone()).unwrap();

        let result = catalog.add_product(product);
        assert!(matches!(result, Err(DomainError::BusinessRuleViolation(_))));
    }

    #[test]
    fn test_documents_follow_catalog_order() {
        let records = vec![record("A1", "RED MUG", 1.0), record("B2", "BLUE MUG", 2.0)];
        let catalog = Catalog::from_records(&records, 10);
        assert_eq!(
            catalog.documents(),
            vec!["red mug a1 france".to_string(), "blue mug b2 france".to_string()]
        );
    }
}
