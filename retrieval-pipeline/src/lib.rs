#![allow(clippy::missing_docs_in_private_items)]

pub mod index;
pub mod retriever;

pub use index::VectorIndex;
pub use retriever::{RetrievedChunk, Retriever};
