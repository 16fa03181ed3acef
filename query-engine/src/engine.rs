use std::{path::PathBuf, sync::Arc};

use common::{
    error::AppError,
    types::text_chunk::TextChunk,
    utils::{config::AppConfig, embedding::EmbeddingProvider},
};
use ingestion_pipeline::{chunker, loader, ChunkPolicy};
use retrieval_pipeline::{index::VectorIndex, retriever::Retriever, RetrievedChunk};
use tracing::{debug, info, warn};

use crate::{generator::AnswerGenerator, prompt::PromptTemplate};

/// Identity and wiring for one corpus: where its source lives, where its
/// index persists, and how its prompt is worded. Everything else is shared.
#[derive(Debug, Clone)]
pub struct CorpusProfile {
    pub name: &'static str,
    pub source_path: PathBuf,
    pub index_path: PathBuf,
    pub prompt: PromptTemplate,
}

/// Lifecycle of one corpus engine within the process. `Ready` is terminal;
/// there is no teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Building,
    Loading,
    Ready,
}

/// Orchestrates one corpus: ensures an index exists (build-or-load), then
/// answers questions by retrieving context and invoking the generator.
pub struct RagEngine {
    profile: CorpusProfile,
    config: AppConfig,
    provider: Arc<EmbeddingProvider>,
    generator: Option<Arc<dyn AnswerGenerator>>,
    state: EngineState,
    retriever: Option<Retriever>,
}

impl RagEngine {
    /// A missing generator credential is detected here; it never blocks
    /// initialization, only downgrades `query` to an explanatory answer.
    pub fn new(
        profile: CorpusProfile,
        config: AppConfig,
        provider: Arc<EmbeddingProvider>,
        generator: Option<Arc<dyn AnswerGenerator>>,
    ) -> Self {
        if generator.is_none() {
            warn!(
                corpus = profile.name,
                "no generator credential configured; queries will return an explanatory message"
            );
        }

        Self {
            profile,
            config,
            provider,
            generator,
            state: EngineState::Uninitialized,
            retriever: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == EngineState::Ready
    }

    /// Build-or-load, decided by whether the persisted index directory
    /// exists. Idempotent: once the engine is ready, repeat calls return
    /// immediately. Building embeds the whole corpus and happens at most
    /// once per corpus per machine; loading is the cheap steady-state path.
    pub async fn initialize(&mut self) -> Result<(), AppError> {
        if self.state == EngineState::Ready {
            return Ok(());
        }

        let index = if tokio::fs::try_exists(&self.profile.index_path)
            .await
            .unwrap_or(false)
        {
            self.state = EngineState::Loading;
            info!(
                corpus = self.profile.name,
                path = %self.profile.index_path.display(),
                "loading persisted vector index"
            );
            VectorIndex::load(&self.profile.index_path).await?
        } else {
            self.state = EngineState::Building;
            self.build_and_persist().await?
        };

        self.bind(index);
        Ok(())
    }

    /// Rebuilds from source even when a persisted index exists, overwriting
    /// it. Used by the offline provisioning step.
    pub async fn force_reinitialize(&mut self) -> Result<(), AppError> {
        self.state = EngineState::Building;
        self.retriever = None;

        let index = self.build_and_persist().await?;
        self.bind(index);
        Ok(())
    }

    /// Full build path: load pages, chunk, embed, index, persist. The save
    /// runs only after a fully successful build, so no partial index ever
    /// reaches disk.
    async fn build_and_persist(&self) -> Result<VectorIndex, AppError> {
        info!(
            corpus = self.profile.name,
            source = %self.profile.source_path.display(),
            "building vector index from source"
        );

        let documents = loader::load_source(&self.profile.source_path).await?;
        let policy = ChunkPolicy::new(self.config.chunk_size, self.config.chunk_overlap)?;

        // Whitespace-only chunks carry nothing retrievable and have no
        // embeddable direction.
        let chunks: Vec<TextChunk> = chunker::split_documents(&documents, &policy)
            .into_iter()
            .filter(|chunk| !chunk.content.trim().is_empty())
            .collect();

        debug!(
            corpus = self.profile.name,
            documents = documents.len(),
            chunks = chunks.len(),
            "chunked source document"
        );

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
        let vectors = self.provider.embed_batch(texts).await?;

        let index = VectorIndex::build(chunks, vectors, self.provider.model_code())?;
        index.save(&self.profile.index_path).await?;

        Ok(index)
    }

    fn bind(&mut self, index: VectorIndex) {
        if let (Some(expected), Some(actual)) = (self.provider.model_code(), index.model_code()) {
            if expected.as_str() != actual {
                warn!(
                    corpus = self.profile.name,
                    expected = %expected,
                    actual = %actual,
                    "persisted index was built with a different embedding model"
                );
            }
        }

        self.retriever = Some(Retriever::new(
            Arc::new(index),
            Arc::clone(&self.provider),
            self.config.retrieval_k,
        ));
        self.state = EngineState::Ready;
        info!(corpus = self.profile.name, "engine ready");
    }

    /// Top-k chunks for a question, with scores. Exposed so retrieval
    /// quality can be inspected without a generator credential.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedChunk>, AppError> {
        let Some(retriever) = &self.retriever else {
            return Err(AppError::EngineNotInitialized);
        };
        retriever.retrieve(question).await
    }

    /// Answers a question against this corpus. Retrieval failures are real
    /// errors; generator-side failures come back as a readable answer
    /// string, because the caller is an interactive session that expects a
    /// string either way.
    pub async fn query(&self, question: &str) -> Result<String, AppError> {
        let retrieved = self.retrieve(question).await?;

        let context = retrieved
            .iter()
            .map(|entry| entry.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = self.profile.prompt.render(&context, question);

        let Some(generator) = &self.generator else {
            return Ok(
                "Error: no OPENAI_API_KEY is configured. Set it in the environment or a \
                 config file to enable generated answers; retrieval keeps working without it."
                    .to_string(),
            );
        };

        match generator.complete(&prompt).await {
            Ok(answer) => Ok(answer),
            Err(err) => {
                warn!(
                    corpus = self.profile.name,
                    error = %err,
                    "generator call failed"
                );
                Ok(format!("Error querying the language model: {err}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::RenderedPrompt;
    use crate::prompt::BIBLE_SYSTEM_PROMPT;
    use async_trait::async_trait;
    use common::utils::embedding::EmbeddingBackend;
    use std::sync::Mutex;

    fn test_config(data_dir: &std::path::Path) -> AppConfig {
        AppConfig {
            openai_api_key: None,
            openai_base_url: "https://example.com".into(),
            data_dir: data_dir.to_string_lossy().into_owned(),
            bible_source_path: "unused".into(),
            quran_source_path: "unused".into(),
            embedding_backend: EmbeddingBackend::Hashed,
            embedding_model: None,
            embedding_dimensions: 64,
            chunk_size: 50,
            chunk_overlap: 10,
            retrieval_k: 5,
            query_model: "gpt-4o-mini".into(),
            query_max_tokens: 1000,
            query_temperature: 0.5,
        }
    }

    fn test_profile(dir: &std::path::Path) -> CorpusProfile {
        CorpusProfile {
            name: "test",
            source_path: dir.join("source.txt"),
            index_path: dir.join("test_vectorstore"),
            prompt: PromptTemplate {
                system: BIBLE_SYSTEM_PROMPT,
            },
        }
    }

    async fn write_two_page_source(dir: &std::path::Path) {
        let content = format!(
            "Page A text about shepherds watching flocks by night. \
             More page A lines about the fields.{}Page B text about \
             sowing seeds on good soil. More page B lines about harvest.",
            '\u{0c}'
        );
        tokio::fs::write(dir.join("source.txt"), content)
            .await
            .expect("write source");
    }

    fn hashed_provider() -> Arc<EmbeddingProvider> {
        Arc::new(EmbeddingProvider::new_hashed(64).expect("provider"))
    }

    struct RecordingGenerator {
        answer: &'static str,
        seen: Mutex<Option<RenderedPrompt>>,
    }

    #[async_trait]
    impl AnswerGenerator for RecordingGenerator {
        async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, AppError> {
            *self.seen.lock().expect("lock") = Some(prompt.clone());
            Ok(self.answer.to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl AnswerGenerator for FailingGenerator {
        async fn complete(&self, _prompt: &RenderedPrompt) -> Result<String, AppError> {
            Err(AppError::Generator("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn query_before_initialize_is_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = RagEngine::new(
            test_profile(dir.path()),
            test_config(dir.path()),
            hashed_provider(),
            None,
        );

        assert_eq!(engine.state(), EngineState::Uninitialized);
        let result = engine.query("anything").await;
        assert!(matches!(result, Err(AppError::EngineNotInitialized)));
    }

    #[tokio::test]
    async fn initialize_builds_and_persists_when_no_index_exists() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_two_page_source(dir.path()).await;

        let mut engine = RagEngine::new(
            test_profile(dir.path()),
            test_config(dir.path()),
            hashed_provider(),
            None,
        );
        engine.initialize().await.expect("initialize");

        assert!(engine.is_ready());
        assert!(dir.path().join("test_vectorstore/manifest.json").exists());

        let retrieved = engine.retrieve("sowing seeds").await.expect("retrieve");
        assert!(!retrieved.is_empty());
    }

    #[tokio::test]
    async fn second_engine_loads_without_touching_the_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_two_page_source(dir.path()).await;

        let mut first = RagEngine::new(
            test_profile(dir.path()),
            test_config(dir.path()),
            hashed_provider(),
            None,
        );
        first.initialize().await.expect("first initialize");
        let first_results = first.retrieve("seeds on good soil").await.expect("retrieve");

        // If the second engine loads rather than rebuilds, the source file
        // is never needed again.
        tokio::fs::remove_file(dir.path().join("source.txt"))
            .await
            .expect("remove source");

        let mut second = RagEngine::new(
            test_profile(dir.path()),
            test_config(dir.path()),
            hashed_provider(),
            None,
        );
        second.initialize().await.expect("second initialize");
        let second_results = second
            .retrieve("seeds on good soil")
            .await
            .expect("retrieve");

        let first_contents: Vec<&str> = first_results
            .iter()
            .map(|entry| entry.chunk.content.as_str())
            .collect();
        let second_contents: Vec<&str> = second_results
            .iter()
            .map(|entry| entry.chunk.content.as_str())
            .collect();
        assert_eq!(first_contents, second_contents);
    }

    #[tokio::test]
    async fn initialize_is_idempotent_once_ready() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_two_page_source(dir.path()).await;

        let mut engine = RagEngine::new(
            test_profile(dir.path()),
            test_config(dir.path()),
            hashed_provider(),
            None,
        );
        engine.initialize().await.expect("initialize");

        // The source is gone, so a second build attempt would fail loudly.
        tokio::fs::remove_file(dir.path().join("source.txt"))
            .await
            .expect("remove source");
        tokio::fs::remove_dir_all(dir.path().join("test_vectorstore"))
            .await
            .expect("remove index");

        engine.initialize().await.expect("repeat initialize");
        assert!(engine.is_ready());
    }

    #[tokio::test]
    async fn force_reinitialize_rebuilds_over_an_existing_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_two_page_source(dir.path()).await;

        let mut engine = RagEngine::new(
            test_profile(dir.path()),
            test_config(dir.path()),
            hashed_provider(),
            None,
        );
        engine.initialize().await.expect("initialize");
        engine
            .force_reinitialize()
            .await
            .expect("force reinitialize");

        assert!(engine.is_ready());
        assert!(dir.path().join("test_vectorstore/manifest.json").exists());
    }

    #[tokio::test]
    async fn missing_source_aborts_initialization() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut engine = RagEngine::new(
            test_profile(dir.path()),
            test_config(dir.path()),
            hashed_provider(),
            None,
        );

        let result = engine.initialize().await;
        assert!(matches!(result, Err(AppError::SourceNotFound(_))));
        assert!(!engine.is_ready());
        // Nothing half-built may reach disk.
        assert!(!dir.path().join("test_vectorstore").exists());
    }

    #[tokio::test]
    async fn missing_credential_degrades_to_an_explanatory_answer() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_two_page_source(dir.path()).await;

        let mut engine = RagEngine::new(
            test_profile(dir.path()),
            test_config(dir.path()),
            hashed_provider(),
            None,
        );
        engine.initialize().await.expect("initialize");

        let answer = engine.query("anything").await.expect("query");
        assert!(answer.contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn generator_failure_degrades_to_an_error_answer() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_two_page_source(dir.path()).await;

        let mut engine = RagEngine::new(
            test_profile(dir.path()),
            test_config(dir.path()),
            hashed_provider(),
            Some(Arc::new(FailingGenerator)),
        );
        engine.initialize().await.expect("initialize");

        let answer = engine.query("anything").await.expect("query");
        assert!(answer.contains("Error querying the language model"));
        assert!(answer.contains("connection refused"));
    }

    #[tokio::test]
    async fn query_feeds_retrieved_context_into_the_prompt() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_two_page_source(dir.path()).await;

        let generator = Arc::new(RecordingGenerator {
            answer: "A generated answer.",
            seen: Mutex::new(None),
        });

        let mut engine = RagEngine::new(
            test_profile(dir.path()),
            test_config(dir.path()),
            hashed_provider(),
            Some(Arc::clone(&generator) as Arc<dyn AnswerGenerator>),
        );
        engine.initialize().await.expect("initialize");

        let answer = engine
            .query("who was watching the flocks?")
            .await
            .expect("query");
        assert_eq!(answer, "A generated answer.");

        let seen = generator.seen.lock().expect("lock");
        let prompt = seen.as_ref().expect("prompt captured");
        assert!(prompt.user.contains("who was watching the flocks?"));
        assert!(prompt.user.contains("flocks"));
        assert!(prompt.system.contains("Bible scholar"));
    }
}
