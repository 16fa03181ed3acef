use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Source not found: {0}")]
    SourceNotFound(String),
    #[error("Source parse error: {0}")]
    SourceParse(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Embedding error: {0}")]
    Embedding(String),
    #[error("Cannot build an index from an empty corpus")]
    EmptyCorpus,
    #[error("No persisted index at: {0}")]
    IndexNotFound(String),
    #[error("Persisted index is corrupt: {0}")]
    IndexCorrupt(String),
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Engine is not initialized")]
    EngineNotInitialized,
    #[error("Generator unavailable: {0}")]
    GeneratorUnavailable(String),
    #[error("Generator error: {0}")]
    Generator(String),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}
