pub mod dataset_cleaner;
pub mod radio_service;
pub mod recommendation_service;

pub use dataset_cleaner::{
    parse_invoice_date, title_case, CleanedDataset, DatasetCleaner, DatasetError, DatasetResult,
    GUEST_CUSTOMER_ID, UNKNOWN_PRODUCT,
};
pub use radio_service::{FieldErrors, RadioError, RadioResult, RadioService};
pub use recommendation_service::{
    similarity_metrics, RecommendationError, RecommendationResult, RecommendationService,
    ServiceStatus,
};
