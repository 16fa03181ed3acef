use serde::{Deserialize, Serialize};

/// One logical page of a source file, in the order the loader produced it.
///
/// Documents exist only between loading and chunking; the chunker consumes
/// them and carries their positional metadata forward onto every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source_id: String,
    pub page_index: usize,
}

impl SourceDocument {
    pub fn new(content: String, source_id: impl Into<String>, page_index: usize) -> Self {
        Self {
            content,
            metadata: DocumentMetadata {
                source_id: source_id.into(),
                page_index,
            },
        }
    }
}
