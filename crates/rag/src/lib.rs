//! Retrieval-augmented search over the scraped knowledge corpus
//!
//! The corpus file is a sequence of sections (one per scraped page) separated
//! by a delimiter line. Indexing chunks each section with overlap, embeds the
//! chunks in batches and persists the result to a directory owned by the
//! service. Queries run nearest-neighbor search over the persisted store and
//! fall back to keyword scoring over whole sections when the store or the
//! embedding service is unavailable.

pub mod chunker;
pub mod corpus;
pub mod embeddings;
pub mod keyword;
pub mod retriever;
pub mod store;

pub use chunker::chunk_text;
pub use corpus::{load_corpus, parse_corpus, Section, SECTION_DELIMITER};
pub use embeddings::{Embedder, HttpEmbedder, SimpleEmbedder};
pub use keyword::keyword_search;
pub use retriever::{Retriever, NO_RESULTS_MESSAGE};
pub use store::{ChunkMetadata, ChunkRecord, VectorStore};

use thiserror::Error;

/// Retrieval errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("corpus error: {0}")]
    Corpus(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("vector store error: {0}")]
    Store(String),
}
