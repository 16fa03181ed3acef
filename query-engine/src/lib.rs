#![allow(clippy::missing_docs_in_private_items)]

pub mod corpus;
pub mod engine;
pub mod generator;
pub mod prompt;

pub use corpus::{bible_profile, quran_profile};
pub use engine::{CorpusProfile, EngineState, RagEngine};
pub use generator::{AnswerGenerator, OpenAiGenerator, RenderedPrompt};
