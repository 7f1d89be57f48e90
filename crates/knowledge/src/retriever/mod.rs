use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use concierge_core::CollaboratorError;

pub mod embedding;
pub mod keyword;

pub use embedding::{
    EmbeddingClient, EmbeddingRetriever, HttpEmbeddingClient, InMemoryVectorStore, ScoredRecord,
    VectorStore,
};
pub use keyword::KeywordRetriever;

/// One indexed chunk of a loaded source. Records for a source are superseded
/// wholesale when its content hash changes; they are never edited in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub source: String,
    pub content: String,
    pub content_hash: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub loaded_at: DateTime<Utc>,
}

impl ContentRecord {
    /// Deterministic identity used for vector-store upserts, so re-indexing
    /// a changed source overwrites its previous vectors.
    pub fn record_id(&self) -> String {
        format!("{}#{}", self.source, self.chunk_index)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RetrievedChunk {
    pub source: String,
    pub content: String,
    pub score: f64,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetrievalStrategy {
    Keyword,
    Embedding,
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error("vector store failure: {0}")]
    Store(String),
}

/// Construction-time failure of the embedding strategy. Detected once when
/// the manager is built; the keyword strategy takes over.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RetrieverInitError {
    #[error("embedding service endpoint is not configured")]
    MissingEndpoint,
    #[error("embedding http client could not be constructed: {0}")]
    ClientBuild(String),
}

#[async_trait]
pub trait Retriever: Send + Sync {
    fn strategy(&self) -> RetrievalStrategy;

    async fn index(&mut self, records: Vec<ContentRecord>) -> Result<(), RetrievalError>;

    async fn remove_source(&mut self, source: &str) -> Result<(), RetrievalError>;

    /// Ranked lookup, best match first. Ties keep insertion order.
    async fn query(
        &self,
        text: &str,
        max_results: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError>;
}
