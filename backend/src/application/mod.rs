pub mod dto;
pub mod repositories;
pub mod services;
pub mod use_cases;

// Re-export key types to avoid naming conflicts
pub use dto::{
    ImageSearchResponse, OcrQueryResponse, ProductMatch, RadioFixtures, TextQueryResponse,
};
pub use repositories::RadioRepository;
pub use services::{
    CleanedDataset, DatasetCleaner, DatasetError, RadioError, RadioService, RecommendationError,
    RecommendationService, ServiceStatus,
};
pub use use_cases::{validate_query, QueryValidationError, RecommendProducts};
