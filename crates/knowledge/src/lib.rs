//! Knowledge retrieval for conversation agents.
//!
//! Sources (files, directories, URLs) are loaded, fingerprinted, chunked and
//! indexed behind a pluggable retrieval strategy. A load pass only re-indexes
//! sources whose content hash changed; everything else is skipped. Queries
//! return a ranked, formatted text block ready for prompt injection.
//!
//! Two retrieval strategies exist: keyword overlap (always available) and
//! vector similarity over an external embedding service. The strategy is
//! picked once when the [`manager::KnowledgeManager`] is built, never per
//! query.

pub mod change;
pub mod chunker;
pub mod loader;
pub mod manager;
pub mod retriever;

pub use change::{content_digest, HashRegistry};
pub use chunker::{Chunk, Chunker, ChunkerError};
pub use loader::{ContentLoader, LoadedSource, SourceKind, SourceLoadError};
pub use manager::{KnowledgeManager, LoadStats, NO_KNOWLEDGE_FOUND};
pub use retriever::{
    ContentRecord, EmbeddingClient, EmbeddingRetriever, HttpEmbeddingClient, InMemoryVectorStore,
    KeywordRetriever, RetrievalError, RetrievalStrategy, Retriever, RetrieverInitError,
    RetrievedChunk, ScoredRecord, VectorStore,
};
