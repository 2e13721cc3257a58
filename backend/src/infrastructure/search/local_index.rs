/// In-process product index: a dense matrix of product vectors searched by cosine similarity
use crate::domain::value_objects::FeatureVector;

/// A search hit: row position in the index and its similarity to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredIndex {
    pub position: usize,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct LocalIndex {
    vectors: Vec<FeatureVector>,
}

impl LocalIndex {
    pub fn new(vectors: Vec<FeatureVector>) -> Self {
        LocalIndex { vectors }
    }

    pub fn vectors(&self) -> &[FeatureVector] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.vectors.first().map(FeatureVector::len).unwrap_or(0)
    }

    /// The `top_k` most similar rows, keeping only scores strictly above `min_similarity`
    pub fn search(&self, query: &FeatureVector, top_k: usize, min_similarity: f32) -> Vec<ScoredIndex> {
        let mut scored: Vec<ScoredIndex> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, v)| ScoredIndex {
                position,
                score: query.cosine_similarity(v),
            })
            .collect();

        // Stable sort keeps index order among equal scores
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        scored.retain(|hit| hit.score > min_similarity);
        scored
    }
}
