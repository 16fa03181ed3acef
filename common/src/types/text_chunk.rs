use serde::{Deserialize, Serialize};

/// The unit of embedding and retrieval. `chunk_index` is monotonically
/// increasing within a single source page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_id: String,
    pub page_index: usize,
    pub chunk_index: usize,
}

impl TextChunk {
    pub fn new(
        content: String,
        source_id: impl Into<String>,
        page_index: usize,
        chunk_index: usize,
    ) -> Self {
        Self {
            content,
            metadata: ChunkMetadata {
                source_id: source_id.into(),
                page_index,
                chunk_index,
            },
        }
    }

    /// Human-readable pointer back to the source location.
    pub fn citation(&self) -> String {
        format!(
            "{}, page {}, chunk {}",
            self.metadata.source_id, self.metadata.page_index, self.metadata.chunk_index
        )
    }
}
