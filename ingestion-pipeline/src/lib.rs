#![allow(clippy::missing_docs_in_private_items)]

pub mod chunker;
pub mod loader;

pub use chunker::{split_documents, ChunkPolicy};
pub use loader::load_source;
