use std::{cmp::Ordering, path::Path};

use common::{error::AppError, types::text_chunk::TextChunk};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const MANIFEST_FILE: &str = "manifest.json";
const CHUNKS_FILE: &str = "chunks.json";
const VECTORS_FILE: &str = "embeddings.bin";
const FORMAT_VERSION: u32 = 1;

/// Persisted alongside the vectors so `load` can verify it is reading the
/// same vector space the index was built in.
#[derive(Debug, Serialize, Deserialize)]
struct IndexManifest {
    version: u32,
    dimension: usize,
    chunk_count: usize,
    model_code: Option<String>,
}

/// In-memory similarity index over embedded chunks.
///
/// Built once per corpus and never mutated afterwards; it is either kept in
/// memory or round-tripped through `save`/`load`. `search` is a pure
/// function of the index, the query vector, and `k`, so its ranking
/// behavior is testable without any model or network access.
#[derive(Debug)]
pub struct VectorIndex {
    chunks: Vec<TextChunk>,
    vectors: Vec<Vec<f32>>,
    dimension: usize,
    model_code: Option<String>,
}

impl VectorIndex {
    /// Pairs chunks with their embedding vectors. Both sequences must be
    /// non-empty, equal in length, and uniform in dimensionality.
    pub fn build(
        chunks: Vec<TextChunk>,
        vectors: Vec<Vec<f32>>,
        model_code: Option<String>,
    ) -> Result<Self, AppError> {
        if chunks.is_empty() || vectors.is_empty() {
            return Err(AppError::EmptyCorpus);
        }
        if chunks.len() != vectors.len() {
            return Err(AppError::Validation(format!(
                "chunk count ({}) does not match vector count ({})",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimension = vectors.first().map_or(0, Vec::len);
        if dimension == 0 {
            return Err(AppError::Validation(
                "embedding vectors must not be zero-dimensional".into(),
            ));
        }
        for vector in &vectors {
            if vector.len() != dimension {
                return Err(AppError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
        }

        Ok(Self {
            chunks,
            vectors,
            dimension,
            model_code,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model_code(&self) -> Option<&str> {
        self.model_code.as_deref()
    }

    pub fn chunks(&self) -> &[TextChunk] {
        &self.chunks
    }

    /// Persists the index into `dir`, creating the directory if needed.
    ///
    /// The manifest is written last: a directory without a readable manifest
    /// reads as absent, so an interrupted save degrades to a rebuild instead
    /// of a corrupt load.
    pub async fn save(&self, dir: &Path) -> Result<(), AppError> {
        tokio::fs::create_dir_all(dir).await?;

        let chunks_json = serde_json::to_vec(&self.chunks)?;
        tokio::fs::write(dir.join(CHUNKS_FILE), chunks_json).await?;

        let mut blob = Vec::with_capacity(self.chunks.len() * self.dimension * 4);
        for vector in &self.vectors {
            for value in vector {
                blob.extend_from_slice(&value.to_le_bytes());
            }
        }
        tokio::fs::write(dir.join(VECTORS_FILE), blob).await?;

        let manifest = IndexManifest {
            version: FORMAT_VERSION,
            dimension: self.dimension,
            chunk_count: self.chunks.len(),
            model_code: self.model_code.clone(),
        };
        tokio::fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec(&manifest)?).await?;

        info!(
            path = %dir.display(),
            chunks = self.chunks.len(),
            dimension = self.dimension,
            "persisted vector index"
        );

        Ok(())
    }

    /// Reconstructs exactly what `save` was given.
    pub async fn load(dir: &Path) -> Result<Self, AppError> {
        let manifest_bytes = match tokio::fs::read(dir.join(MANIFEST_FILE)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::IndexNotFound(dir.display().to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        let manifest: IndexManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|err| AppError::IndexCorrupt(format!("unreadable manifest: {err}")))?;

        if manifest.version != FORMAT_VERSION {
            return Err(AppError::IndexCorrupt(format!(
                "unsupported index format version {}",
                manifest.version
            )));
        }
        if manifest.dimension == 0 {
            return Err(AppError::IndexCorrupt(
                "manifest is missing the embedding dimensionality".into(),
            ));
        }

        let chunk_bytes = tokio::fs::read(dir.join(CHUNKS_FILE))
            .await
            .map_err(|err| AppError::IndexCorrupt(format!("unreadable chunk file: {err}")))?;
        let chunks: Vec<TextChunk> = serde_json::from_slice(&chunk_bytes)
            .map_err(|err| AppError::IndexCorrupt(format!("malformed chunk file: {err}")))?;
        if chunks.len() != manifest.chunk_count {
            return Err(AppError::IndexCorrupt(format!(
                "manifest records {} chunks but the chunk file holds {}",
                manifest.chunk_count,
                chunks.len()
            )));
        }

        let blob = tokio::fs::read(dir.join(VECTORS_FILE))
            .await
            .map_err(|err| AppError::IndexCorrupt(format!("unreadable vector file: {err}")))?;
        let expected_bytes = manifest.chunk_count * manifest.dimension * 4;
        if blob.len() != expected_bytes {
            return Err(AppError::IndexCorrupt(format!(
                "vector file holds {} bytes, expected {expected_bytes}",
                blob.len()
            )));
        }

        let values: Vec<f32> = blob
            .chunks_exact(4)
            .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .collect();
        let vectors: Vec<Vec<f32>> = values
            .chunks(manifest.dimension)
            .map(<[f32]>::to_vec)
            .collect();

        debug!(
            path = %dir.display(),
            chunks = chunks.len(),
            dimension = manifest.dimension,
            "loaded vector index"
        );

        Ok(Self {
            chunks,
            vectors,
            dimension: manifest.dimension,
            model_code: manifest.model_code,
        })
    }

    /// Top-`k` chunks by inner product with `query` (cosine similarity on
    /// unit vectors), highest first; ties resolve to insertion order. A `k`
    /// beyond the index size returns everything. Comparing vectors from two
    /// different embedding models is never meaningful, so a query of the
    /// wrong length is refused outright.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(TextChunk, f32)>, AppError> {
        if query.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(f32, usize, &TextChunk)> = self
            .vectors
            .iter()
            .zip(self.chunks.iter())
            .enumerate()
            .map(|(position, (vector, chunk))| (dot_product(query, vector), position, chunk))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, _, chunk)| (chunk.clone(), score))
            .collect())
    }
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(label: &str, chunk_index: usize) -> TextChunk {
        TextChunk::new(label.to_string(), "fixture.txt", 0, chunk_index)
    }

    fn three_vector_index() -> VectorIndex {
        // Unit vectors with known pairwise similarities to the query below.
        VectorIndex::build(
            vec![chunk("east", 0), chunk("north", 1), chunk("diagonal", 2)],
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.6, 0.8, 0.0],
            ],
            None,
        )
        .expect("index")
    }

    #[test]
    fn build_rejects_an_empty_corpus() {
        assert!(matches!(
            VectorIndex::build(Vec::new(), Vec::new(), None),
            Err(AppError::EmptyCorpus)
        ));
    }

    #[test]
    fn build_rejects_mismatched_lengths() {
        let result = VectorIndex::build(
            vec![chunk("a", 0), chunk("b", 1)],
            vec![vec![1.0, 0.0]],
            None,
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn build_rejects_ragged_vectors() {
        let result = VectorIndex::build(
            vec![chunk("a", 0), chunk("b", 1)],
            vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]],
            None,
        );
        assert!(matches!(
            result,
            Err(AppError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn search_matches_brute_force_ranking() {
        let index = three_vector_index();
        let query = vec![0.8, 0.6, 0.0];

        let results = index.search(&query, 2).expect("search");

        // Brute force: east = 0.8, north = 0.6, diagonal = 0.96.
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.content, "diagonal");
        assert!((results[0].1 - 0.96).abs() < 1e-6);
        assert_eq!(results[1].0.content, "east");
        assert!((results[1].1 - 0.8).abs() < 1e-6);
        assert!(results[0].1 >= results[1].1);
    }

    #[test]
    fn search_breaks_ties_by_insertion_order() {
        let index = VectorIndex::build(
            vec![chunk("first", 0), chunk("second", 1)],
            vec![vec![1.0, 0.0], vec![1.0, 0.0]],
            None,
        )
        .expect("index");

        let results = index.search(&[1.0, 0.0], 2).expect("search");
        assert_eq!(results[0].0.content, "first");
        assert_eq!(results[1].0.content, "second");
    }

    #[test]
    fn oversized_k_returns_every_entry() {
        let index = three_vector_index();
        let results = index.search(&[1.0, 0.0, 0.0], 50).expect("search");
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn wrong_query_dimension_is_refused() {
        let index = three_vector_index();
        let result = index.search(&[1.0, 0.0], 2);
        assert!(matches!(
            result,
            Err(AppError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[tokio::test]
    async fn save_then_load_is_a_faithful_inverse() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vectorstore");

        let original = VectorIndex::build(
            vec![chunk("alpha", 0), chunk("beta", 1)],
            vec![vec![0.6, 0.8], vec![1.0, 0.0]],
            Some("hashed-test".to_string()),
        )
        .expect("index");

        original.save(&path).await.expect("save");
        let loaded = VectorIndex::load(&path).await.expect("load");

        assert_eq!(loaded.dimension(), original.dimension());
        assert_eq!(loaded.model_code(), Some("hashed-test"));
        assert_eq!(loaded.chunks(), original.chunks());
        assert_eq!(loaded.vectors, original.vectors);
    }

    #[tokio::test]
    async fn loading_a_missing_directory_is_index_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = VectorIndex::load(&dir.path().join("absent")).await;
        assert!(matches!(result, Err(AppError::IndexNotFound(_))));
    }

    #[tokio::test]
    async fn malformed_manifest_is_index_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vectorstore");
        tokio::fs::create_dir_all(&path).await.expect("mkdir");
        tokio::fs::write(path.join(MANIFEST_FILE), b"not json")
            .await
            .expect("write");

        let result = VectorIndex::load(&path).await;
        assert!(matches!(result, Err(AppError::IndexCorrupt(_))));
    }

    #[tokio::test]
    async fn truncated_vector_file_is_index_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vectorstore");

        let index = VectorIndex::build(
            vec![chunk("alpha", 0)],
            vec![vec![0.0, 1.0]],
            None,
        )
        .expect("index");
        index.save(&path).await.expect("save");

        tokio::fs::write(path.join(VECTORS_FILE), [0u8; 3])
            .await
            .expect("truncate");

        let result = VectorIndex::load(&path).await;
        assert!(matches!(result, Err(AppError::IndexCorrupt(_))));
    }
}
