pub mod catalog;
pub mod radio;
pub mod search;

pub use catalog::{DataQuality, DatasetInfo, DatasetSummary, DateRange};
pub use radio::{
    BlogPostFixture, CategoryFixture, EventFixture, EventQuery, FavoriteToggle,
    FixtureImportSummary, FromQueryParams, ListQuery, ListenerCount, NewContact, NewListening,
    ParamErrors, ProfileUpdate, QueryParams, RadioFixtures, StationFixture, StationQuery,
};
pub use search::{
    IndexStats, ImageSearchResponse, OcrQueryResponse, ProductMatch, SimilarityMetrics,
    TextQueryResponse,
};
