//! HTTP API for the product finder and the radio content routes
pub mod catalog;
pub mod error;
pub mod radio;
pub mod server;

pub use error::{ApiError, ApiResult, CatalogRoute};
pub use server::{build_router, serve, AppState};
