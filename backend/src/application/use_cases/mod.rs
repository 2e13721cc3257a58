pub mod query_validation;
pub mod recommend;

pub use query_validation::{validate_query, QueryValidationError, QueryValidator};
pub use recommend::{image_reply, text_reply, RecommendProducts};
