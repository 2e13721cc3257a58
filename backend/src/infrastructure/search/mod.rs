/// Product search infrastructure
mod local_index;
mod product_index;
mod qdrant_store;
mod tfidf;

pub use local_index::{LocalIndex, ScoredIndex};
pub use product_index::{IndexBackend, ProductIndex, ScoredProduct};
pub use qdrant_store::{CollectionInfo, ProductHit, QdrantProductStore};
pub use tfidf::{tokenize, TfidfVectorizer, DEFAULT_MAX_FEATURES};
