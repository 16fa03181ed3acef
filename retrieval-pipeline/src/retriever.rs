use std::sync::Arc;

use common::{error::AppError, types::text_chunk::TextChunk, utils::embedding::EmbeddingProvider};
use tracing::debug;

use crate::index::VectorIndex;

/// A supporting chunk plus its similarity score, kept for callers that want
/// a relevance threshold; prompt assembly reads only the content.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: TextChunk,
    pub score: f32,
}

/// Query-time binding of one index to an embedding provider and a fixed
/// result count. `k` is set at construction, not per call.
pub struct Retriever {
    index: Arc<VectorIndex>,
    provider: Arc<EmbeddingProvider>,
    k: usize,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, provider: Arc<EmbeddingProvider>, k: usize) -> Self {
        Self { index, provider, k }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub async fn retrieve(&self, query_text: &str) -> Result<Vec<RetrievedChunk>, AppError> {
        let query_vector = self.provider.embed(query_text).await?;
        let results = self.index.search(&query_vector, self.k)?;

        debug!(
            results = results.len(),
            k = self.k,
            "retrieved chunks for query"
        );

        Ok(results
            .into_iter()
            .map(|(chunk, score)| RetrievedChunk { chunk, score })
            .collect())
    }
}
