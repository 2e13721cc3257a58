use serde::Serialize;

/// First and last invoice day in the dataset (`%Y-%m-%d`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQuality {
    pub missing_descriptions: usize,
    /// Lines whose customer id was absent in the source (kept as guest purchases)
    pub missing_customer_ids: usize,
    pub records_removed: usize,
}

/// Summary statistics of the cleaned dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total_records: usize,
    pub unique_products: usize,
    pub unique_customers: usize,
    pub date_range: Option<DateRange>,
    pub countries: usize,
    pub total_revenue: f64,
    pub data_quality: DataQuality,
}

/// Short description of the loaded dataset, reported by the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetInfo {
    pub total_records: usize,
    pub unique_products: usize,
    /// First and last invoice timestamps (`%Y-%m-%d %H:%M:%S`)
    pub date_range: Option<DateRange>,
}
