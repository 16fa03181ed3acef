use common::{
    error::AppError,
    types::{source_document::SourceDocument, text_chunk::TextChunk},
};
use tracing::debug;

/// Character-count policy for splitting pages into chunks.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPolicy {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkPolicy {
    /// `chunk_overlap` must be strictly smaller than `chunk_size`; anything
    /// else is a configuration error.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, AppError> {
        if chunk_size == 0 {
            return Err(AppError::Validation(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Validation(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Splits pages into overlapping chunks.
///
/// Each page is cut along the coarsest separator that yields pieces within
/// the size limit (paragraph break, line break, sentence-terminal
/// punctuation, then single spaces); oversized pieces are re-cut at the next
/// finer level. Pieces are then merged back up to the limit, and every chunk
/// after the first begins with the trailing overlap characters of its
/// predecessor, so a fact spanning a boundary stays retrievable. Nothing is
/// trimmed or dropped: concatenating the chunks minus their overlap prefixes
/// reconstructs the page exactly.
pub fn split_documents(documents: &[SourceDocument], policy: &ChunkPolicy) -> Vec<TextChunk> {
    let mut chunks = Vec::new();

    for document in documents {
        let mut pieces = Vec::new();
        collect_pieces(&document.content, 0, policy.chunk_size(), &mut pieces);

        for (chunk_index, content) in merge_pieces(&pieces, policy).into_iter().enumerate() {
            chunks.push(TextChunk::new(
                content,
                document.metadata.source_id.clone(),
                document.metadata.page_index,
                chunk_index,
            ));
        }
    }

    debug!(
        documents = documents.len(),
        chunks = chunks.len(),
        "split documents into chunks"
    );

    chunks
}

const SEPARATOR_LEVELS: usize = 4;

/// Contiguous cover of `text` at one separator granularity. Separators stay
/// attached to the piece they terminate, so no character is lost.
fn split_at_level(text: &str, level: usize) -> Vec<&str> {
    match level {
        0 => text.split_inclusive("\n\n").collect(),
        1 => text.split_inclusive('\n').collect(),
        2 => text.split_inclusive(['.', '!', '?']).collect(),
        _ => text.split_inclusive(' ').collect(),
    }
}

fn collect_pieces<'a>(text: &'a str, level: usize, chunk_size: usize, out: &mut Vec<&'a str>) {
    if text.chars().count() <= chunk_size {
        out.push(text);
        return;
    }
    if level == SEPARATOR_LEVELS {
        // A whitespace-free run longer than the limit is an unsplittable
        // atomic token; it is kept whole rather than truncated.
        out.push(text);
        return;
    }
    for piece in split_at_level(text, level) {
        collect_pieces(piece, level + 1, chunk_size, out);
    }
}

fn merge_pieces(pieces: &[&str], policy: &ChunkPolicy) -> Vec<String> {
    let mut merged = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for piece in pieces {
        let piece_chars = piece.chars().count();

        if current.is_empty() {
            current.push_str(piece);
            current_chars = piece_chars;
            continue;
        }

        if current_chars + piece_chars <= policy.chunk_size() {
            current.push_str(piece);
            current_chars += piece_chars;
            continue;
        }

        let (tail, tail_chars) = overlap_tail(&current, current_chars, policy, piece_chars);
        merged.push(std::mem::take(&mut current));
        current = tail;
        current.push_str(piece);
        current_chars = tail_chars + piece_chars;
    }

    if !current.is_empty() {
        merged.push(current);
    }

    merged
}

/// Trailing characters of the previous chunk repeated at the start of the
/// next one. Clamped so the overlap never pushes the new chunk past the
/// size limit.
fn overlap_tail(
    previous: &str,
    previous_chars: usize,
    policy: &ChunkPolicy,
    incoming_chars: usize,
) -> (String, usize) {
    let budget = policy.chunk_size().saturating_sub(incoming_chars);
    let take = policy.chunk_overlap().min(budget).min(previous_chars);
    if take == 0 {
        return (String::new(), 0);
    }
    let start = previous
        .char_indices()
        .rev()
        .nth(take - 1)
        .map_or(0, |(index, _)| index);
    (previous[start..].to_string(), take)
}
