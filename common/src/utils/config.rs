use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::utils::embedding::EmbeddingBackend;

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_bible_source_path")]
    pub bible_source_path: String,
    #[serde(default = "default_quran_source_path")]
    pub quran_source_path: String,
    #[serde(default)]
    pub embedding_backend: EmbeddingBackend,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
    #[serde(default = "default_query_model")]
    pub query_model: String,
    #[serde(default = "default_query_max_tokens")]
    pub query_max_tokens: u32,
    #[serde(default = "default_query_temperature")]
    pub query_temperature: f32,
}

impl AppConfig {
    /// Directory holding the persisted Bible index. Its existence decides
    /// the engine's build-vs-load branch.
    pub fn bible_index_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("bible_vectorstore")
    }

    /// Directory holding the persisted Quran index.
    pub fn quran_index_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("quran_vectorstore")
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_bible_source_path() -> String {
    "./scripts/Bible.pdf".to_string()
}

fn default_quran_source_path() -> String {
    "./scripts/Quran.pdf".to_string()
}

fn default_embedding_dimensions() -> u32 {
    384
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_retrieval_k() -> usize {
    5
}

fn default_query_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_query_max_tokens() -> u32 {
    1000
}

fn default_query_temperature() -> f32 {
    0.5
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
